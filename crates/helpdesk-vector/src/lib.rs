//! Helpdesk Vector crate - embedding providers, similarity, embedding index,
//! and the ticket search/classification engine.
//!
//! Provides an embedding service trait with ONNX and mock implementations,
//! cosine scoring with top-k selection, lazily rebuilt embedding matrices,
//! and `TicketSearchEngine`, which ties them to the ticket corpus.

pub mod embedding;
pub mod engine;
pub mod index;
pub mod similarity;

pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OnnxEmbeddingService};
pub use engine::{TicketSearchEngine, SUGGESTION_COUNT};
pub use index::{EmbeddingIndex, EmbeddingMatrix, IndexState};
pub use similarity::{cosine_similarity, top_k};
