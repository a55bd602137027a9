use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{HelpdeskError, Result};

// =============================================================================
// Tickets
// =============================================================================

/// A support ticket stored in the corpus.
///
/// Tickets are immutable once created. The `id` is assigned by the corpus
/// store as `max(existing ids) + 1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub subject: String,
    pub description: String,
    pub category: String,
}

impl Ticket {
    /// Text used to embed this ticket: subject and description joined by a space.
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.subject, &self.description)
    }
}

/// Join a subject and description the way tickets are embedded.
pub fn embedding_text(subject: &str, description: &str) -> String {
    format!("{} {}", subject, description)
}

/// A validated request to create a ticket. The id is assigned on insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTicket {
    subject: String,
    description: String,
    category: String,
}

impl NewTicket {
    /// Build a new ticket, rejecting blank fields.
    ///
    /// The category is not checked against the taxonomy; any label is accepted.
    pub fn new(
        subject: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self> {
        let subject = subject.into();
        let description = description.into();
        let category = category.into();

        if subject.trim().is_empty() {
            return Err(HelpdeskError::InvalidTicket { field: "subject" });
        }
        if description.trim().is_empty() {
            return Err(HelpdeskError::InvalidTicket {
                field: "description",
            });
        }
        if category.trim().is_empty() {
            return Err(HelpdeskError::InvalidTicket { field: "category" });
        }

        Ok(Self {
            subject,
            description,
            category,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Attach an id, producing the stored record.
    pub fn into_ticket(self, id: u64) -> Ticket {
        Ticket {
            id,
            subject: self.subject,
            description: self.description,
            category: self.category,
        }
    }
}

// =============================================================================
// Taxonomy
// =============================================================================

/// Built-in category sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyPreset {
    /// Fourteen fine-grained support categories.
    #[default]
    Extended,
    /// Four coarse categories.
    Minimal,
}

impl TaxonomyPreset {
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            TaxonomyPreset::Extended => &[
                "Network Issues",
                "Security",
                "Performance",
                "Database",
                "Integration",
                "UI/UX",
                "Hardware",
                "Software Bug",
                "Data Loss",
                "Authentication",
                "Billing",
                "Account Management",
                "Feature Request",
                "Configuration",
            ],
            TaxonomyPreset::Minimal => &["Technical", "Billing", "Account", "Feature Request"],
        }
    }
}

/// Ordered, fixed list of category labels used for classification.
///
/// The order defines stable row indices into the category embedding matrix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Taxonomy {
    labels: Vec<String>,
}

impl Taxonomy {
    /// Build a taxonomy from explicit labels.
    ///
    /// Rejects an empty list, blank labels, and duplicates.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(HelpdeskError::Config(
                "taxonomy must contain at least one category".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if label.trim().is_empty() {
                return Err(HelpdeskError::Config(
                    "taxonomy categories must not be blank".to_string(),
                ));
            }
            if !seen.insert(label.as_str()) {
                return Err(HelpdeskError::Config(format!(
                    "duplicate taxonomy category '{}'",
                    label
                )));
            }
        }

        Ok(Self { labels })
    }

    pub fn from_preset(preset: TaxonomyPreset) -> Self {
        Self {
            labels: preset.labels().iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label at a matrix row index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::from_preset(TaxonomyPreset::default())
    }
}

// =============================================================================
// Results
// =============================================================================

/// A search hit: the ticket fields plus its cosine similarity to the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredTicket {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub score: f64,
}

/// One ranked category candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category: String,
    pub confidence: f64,
}

/// Result of classifying a ticket against the taxonomy.
///
/// `suggestions` is sorted by descending confidence and always starts with
/// the best category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub confidence: f64,
    pub suggestions: Vec<CategorySuggestion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_joins_with_space() {
        let ticket = Ticket {
            id: 1,
            subject: "Invoice not received".to_string(),
            description: "Nothing arrived this month".to_string(),
            category: "Billing".to_string(),
        };
        assert_eq!(
            ticket.embedding_text(),
            "Invoice not received Nothing arrived this month"
        );
        assert_eq!(embedding_text("", ""), " ");
    }

    #[test]
    fn test_new_ticket_rejects_blank_fields() {
        assert!(matches!(
            NewTicket::new("", "desc", "Billing"),
            Err(HelpdeskError::InvalidTicket { field: "subject" })
        ));
        assert!(matches!(
            NewTicket::new("subj", "   ", "Billing"),
            Err(HelpdeskError::InvalidTicket {
                field: "description"
            })
        ));
        assert!(matches!(
            NewTicket::new("subj", "desc", ""),
            Err(HelpdeskError::InvalidTicket { field: "category" })
        ));
    }

    #[test]
    fn test_new_ticket_accepts_unknown_category() {
        let ticket = NewTicket::new("subj", "desc", "Not In Taxonomy")
            .unwrap()
            .into_ticket(7);
        assert_eq!(ticket.id, 7);
        assert_eq!(ticket.category, "Not In Taxonomy");
    }

    #[test]
    fn test_ticket_requires_all_fields_when_deserialized() {
        let missing = r#"{"id": 1, "subject": "s", "description": "d"}"#;
        assert!(serde_json::from_str::<Ticket>(missing).is_err());

        let complete = r#"{"id": 1, "subject": "s", "description": "d", "category": "c"}"#;
        let ticket: Ticket = serde_json::from_str(complete).unwrap();
        assert_eq!(ticket.category, "c");
    }

    #[test]
    fn test_presets() {
        assert_eq!(Taxonomy::from_preset(TaxonomyPreset::Extended).len(), 14);
        let minimal = Taxonomy::from_preset(TaxonomyPreset::Minimal);
        assert_eq!(minimal.len(), 4);
        assert_eq!(minimal.get(0), Some("Technical"));
        assert_eq!(minimal.get(4), None);
        assert!(minimal.contains("Feature Request"));
    }

    #[test]
    fn test_taxonomy_validation() {
        assert!(Taxonomy::new(Vec::<String>::new()).is_err());
        assert!(Taxonomy::new(["A", " "]).is_err());
        assert!(Taxonomy::new(["A", "B", "A"]).is_err());
        assert_eq!(Taxonomy::new(["A", "B"]).unwrap().labels(), ["A", "B"]);
    }

    #[test]
    fn test_scored_ticket_serializes_flat() {
        let hit = ScoredTicket {
            ticket: Ticket {
                id: 3,
                subject: "s".to_string(),
                description: "d".to_string(),
                category: "c".to_string(),
            },
            score: 0.5,
        };
        let value = serde_json::to_value(&hit).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["category"], "c");
        assert_eq!(value["score"], 0.5);
    }
}
