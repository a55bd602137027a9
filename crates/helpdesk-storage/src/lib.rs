//! Helpdesk Storage crate - flat-file ticket corpus and synthetic data generation.
//!
//! The corpus is one pretty-printed JSON array, read in full on load and
//! rewritten in full (temp file + rename) on every insertion.

pub mod generator;
pub mod store;

pub use generator::{generate_tickets, write_generated};
pub use store::{read_tickets, write_tickets, CorpusStore};
