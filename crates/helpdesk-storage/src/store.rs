//! JSON-backed ticket corpus.
//!
//! `CorpusStore` owns the in-memory ticket list and its backing file. The
//! file is replaced atomically (write to a sibling temp file, then rename)
//! so a concurrent reader sees either the old or the new array.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::types::{NewTicket, Ticket};

/// Read the full ticket array from `path`.
///
/// Returns `MissingCorpusFile` when the file does not exist; an empty or
/// whitespace-only file is an empty corpus.
pub fn read_tickets(path: &Path) -> Result<Vec<Ticket>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HelpdeskError::MissingCorpusFile(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let tickets: Vec<Ticket> = serde_json::from_str(&content).map_err(|e| {
        HelpdeskError::Storage(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    Ok(tickets)
}

/// Replace the file at `path` with `tickets` as a 2-space indented JSON array.
pub fn write_tickets(path: &Path, tickets: &[Ticket]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(tickets)?;

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, json.as_bytes())?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        // Leave no stray temp file behind on a failed swap.
        let _ = std::fs::remove_file(&temp_path);
        HelpdeskError::Storage(format!(
            "Failed to replace {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(())
}

/// In-memory ticket corpus mirrored to a JSON file.
///
/// Not safe for concurrent writers: two processes adding at once can assign
/// the same id. Within one process the owner serializes access.
#[derive(Debug)]
pub struct CorpusStore {
    path: PathBuf,
    tickets: Vec<Ticket>,
    loaded: bool,
}

impl CorpusStore {
    /// Create a store bound to `path`. Nothing is read until [`load`](Self::load)
    /// or the first [`add`](Self::add).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tickets: Vec::new(),
            loaded: false,
        }
    }

    /// Replace the in-memory corpus with the file contents.
    ///
    /// A missing file yields an empty corpus. Returns the ticket count.
    pub fn load(&mut self) -> Result<usize> {
        self.tickets = match read_tickets(&self.path) {
            Ok(tickets) => tickets,
            Err(HelpdeskError::MissingCorpusFile(path)) => {
                warn!(
                    path = %path.display(),
                    "Corpus file not found, starting with an empty corpus"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut ids: Vec<u64> = self.tickets.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.tickets.len() {
            warn!(
                path = %self.path.display(),
                duplicates = self.tickets.len() - ids.len(),
                "Corpus contains duplicate ticket ids"
            );
        }

        self.loaded = true;
        info!(path = %self.path.display(), count = self.tickets.len(), "Loaded tickets");
        Ok(self.tickets.len())
    }

    /// Load the file unless it has already been read. Returns true if it
    /// loaded now.
    pub fn ensure_loaded(&mut self) -> Result<bool> {
        if self.loaded {
            return Ok(false);
        }
        self.load()?;
        Ok(true)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Append a ticket with the next id and rewrite the backing file.
    ///
    /// An unread file is loaded first so ids continue from it and its
    /// tickets are kept. If the write fails the in-memory corpus is left
    /// unchanged.
    pub fn add(&mut self, ticket: NewTicket) -> Result<Ticket> {
        self.ensure_loaded()?;
        let ticket = ticket.into_ticket(self.next_id());
        self.tickets.push(ticket.clone());

        if let Err(e) = write_tickets(&self.path, &self.tickets) {
            self.tickets.pop();
            return Err(e);
        }

        debug!(id = ticket.id, path = %self.path.display(), "Corpus file rewritten");
        Ok(ticket)
    }

    /// `max(existing ids) + 1`, or 1 for an empty corpus.
    pub fn next_id(&self) -> u64 {
        self.tickets.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn get(&self, id: u64) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
