//! Synthetic ticket generation for seeding a corpus.
//!
//! Each ticket picks a (subject, category) template, wraps the subject in a
//! random phrasing, and derives the description from both.

use std::path::Path;

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;

use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::types::Ticket;

use crate::store::write_tickets;

/// Subject templates with the category they belong to.
const TEMPLATES: &[(&str, &str)] = &[
    ("Cannot login to my account", "Authentication"),
    ("Password reset link not working", "Authentication"),
    ("Two-factor code never arrives", "Authentication"),
    ("Session expires too quickly", "Authentication"),
    ("Connection timeout when uploading files", "Network Issues"),
    ("API requests are timing out", "Network Issues"),
    ("Cannot connect to VPN", "Network Issues"),
    ("WebSocket connection keeps dropping", "Network Issues"),
    ("Dashboard is very slow to render", "Performance"),
    ("Page takes too long to load", "Performance"),
    ("High memory usage causing freezes", "Performance"),
    ("Database queries are very slow", "Database"),
    ("Database connection error", "Database"),
    ("Records are not saving to the database", "Database"),
    ("Charged twice for the subscription", "Billing"),
    ("Invoice not received", "Billing"),
    ("Payment method update failed", "Billing"),
    ("Refund request for last month", "Billing"),
    ("Change my username", "Account Management"),
    ("Delete my account", "Account Management"),
    ("Upgrade to the premium plan", "Account Management"),
    ("Add dark mode support", "Feature Request"),
    ("Export data to CSV", "Feature Request"),
    ("Add multi-language support", "Feature Request"),
    ("Slack integration failing", "Integration"),
    ("Google Calendar sync not working", "Integration"),
    ("Webhook deliveries are rejected", "Integration"),
    ("Suspicious login attempt detected", "Security"),
    ("Account was compromised", "Security"),
    ("Enable encryption for stored data", "Security"),
    ("Button is not clickable", "UI/UX"),
    ("Layout broken on mobile", "UI/UX"),
    ("Text is too small to read", "UI/UX"),
    ("App crashes when clicking submit", "Software Bug"),
    ("Error message when saving data", "Software Bug"),
    ("Search returns wrong results", "Software Bug"),
    ("Lost all my files after update", "Data Loss"),
    ("Data disappeared from dashboard", "Data Loss"),
    ("Printer not connecting", "Hardware"),
    ("Microphone not detected", "Hardware"),
    ("Preferences are not saving", "Configuration"),
    ("Timezone settings incorrect", "Configuration"),
    ("Email notifications not working", "Configuration"),
];

fn vary_subject<R: Rng + ?Sized>(subject: &str, rng: &mut R) -> String {
    match rng.random_range(0..4) {
        0 => subject.to_string(),
        1 => format!("Issue: {}", subject),
        2 => format!("Help with {}", subject.to_lowercase()),
        _ => format!("Urgent: {}", subject),
    }
}

/// Generate `count` tickets with ids `1..=count`.
pub fn generate_tickets<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Ticket> {
    (1..=count as u64)
        .filter_map(|id| {
            let (template, category) = TEMPLATES.choose(rng)?;
            let subject = vary_subject(template, rng);
            let description = format!(
                "User is reporting: {}. Category seems to be related to {}.",
                subject, category
            );
            Some(Ticket {
                id,
                subject,
                description,
                category: category.to_string(),
            })
        })
        .collect()
}

/// Generate `count` tickets and write them to `path`.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn write_generated(path: &Path, count: usize, force: bool) -> Result<Vec<Ticket>> {
    if path.exists() && !force {
        return Err(HelpdeskError::Storage(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let tickets = generate_tickets(count, &mut rand::rng());
    write_tickets(path, &tickets)?;
    info!(path = %path.display(), count = tickets.len(), "Generated synthetic tickets");
    Ok(tickets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::types::{Taxonomy, TaxonomyPreset};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generates_sequential_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let tickets = generate_tickets(50, &mut rng);
        assert_eq!(tickets.len(), 50);
        for (i, ticket) in tickets.iter().enumerate() {
            assert_eq!(ticket.id, i as u64 + 1);
        }
    }

    #[test]
    fn test_generated_categories_are_in_extended_taxonomy() {
        let taxonomy = Taxonomy::from_preset(TaxonomyPreset::Extended);
        let mut rng = StdRng::seed_from_u64(11);
        for ticket in generate_tickets(200, &mut rng) {
            assert!(taxonomy.contains(&ticket.category), "{}", ticket.category);
        }
    }

    #[test]
    fn test_description_mentions_subject_and_category() {
        let mut rng = StdRng::seed_from_u64(3);
        let ticket = &generate_tickets(1, &mut rng)[0];
        assert!(ticket.description.contains(&ticket.subject));
        assert!(ticket.description.ends_with(&format!("{}.", ticket.category)));
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = generate_tickets(20, &mut StdRng::seed_from_u64(42));
        let b = generate_tickets(20, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_write_generated_respects_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");

        assert_eq!(write_generated(&path, 5, false).unwrap().len(), 5);
        assert!(write_generated(&path, 5, false).is_err());
        assert_eq!(write_generated(&path, 8, true).unwrap().len(), 8);

        let stored = crate::store::read_tickets(&path).unwrap();
        assert_eq!(stored.len(), 8);
    }
}
