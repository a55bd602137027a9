//! Ticket semantic search and classification engine.
//!
//! `TicketSearchEngine` owns the corpus store, the taxonomy, the embedding
//! provider, and the embedding index. Corpus changes invalidate the ticket
//! matrix; the next search rebuilds it before answering. Classification only
//! needs the category matrix, so it works on an empty corpus.
//!
//! Methods take `&mut self`: callers sharing an engine wrap it in a single
//! mutex, which serializes inserts and index rebuilds.

use std::sync::Arc;

use tracing::{debug, error, info};

use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::types::{
    embedding_text, CategorySuggestion, Classification, NewTicket, ScoredTicket, Taxonomy, Ticket,
};
use helpdesk_storage::CorpusStore;

use crate::embedding::{DynEmbeddingService, EmbeddingService};
use crate::index::{EmbeddingIndex, EmbeddingMatrix, IndexState};
use crate::similarity::top_k;

/// Number of ranked categories returned by [`TicketSearchEngine::classify`].
pub const SUGGESTION_COUNT: usize = 3;

pub struct TicketSearchEngine {
    store: CorpusStore,
    taxonomy: Taxonomy,
    embedder: Box<dyn DynEmbeddingService>,
    index: EmbeddingIndex,
}

impl TicketSearchEngine {
    /// Create an engine over `store`. The corpus is not read until [`load`](Self::load).
    pub fn new(
        store: CorpusStore,
        taxonomy: Taxonomy,
        embedder: impl EmbeddingService + 'static,
    ) -> Self {
        Self::new_dyn(store, taxonomy, Box::new(embedder))
    }

    /// Create an engine from a pre-boxed embedding service.
    pub fn new_dyn(
        store: CorpusStore,
        taxonomy: Taxonomy,
        embedder: Box<dyn DynEmbeddingService>,
    ) -> Self {
        Self {
            store,
            taxonomy,
            embedder,
            index: EmbeddingIndex::new(),
        }
    }

    /// Read the corpus file (missing file = empty corpus) and mark the
    /// ticket embeddings stale.
    pub fn load(&mut self) -> Result<usize> {
        let count = self.store.load()?;
        self.index.invalidate_tickets();
        Ok(count)
    }

    /// Build both embedding matrices now instead of on first use.
    pub async fn warm_up(&mut self) -> Result<()> {
        self.ensure_category_embeddings().await?;
        self.ensure_ticket_embeddings().await?;
        Ok(())
    }

    /// Ticket matrix aligned with the corpus, rebuilt if stale. Reads the
    /// corpus file first if it has not been loaded.
    pub async fn ensure_ticket_embeddings(&mut self) -> Result<Arc<EmbeddingMatrix>> {
        if self.store.ensure_loaded()? {
            self.index.invalidate_tickets();
        }
        self.index
            .ensure_tickets(self.embedder.as_ref(), self.store.tickets())
            .await
    }

    /// Category matrix aligned with the taxonomy, built on first call.
    pub async fn ensure_category_embeddings(&mut self) -> Result<Arc<EmbeddingMatrix>> {
        self.index
            .ensure_categories(self.embedder.as_ref(), &self.taxonomy)
            .await
    }

    /// The `top_k` tickets most similar to `query`, highest score first.
    ///
    /// `top_k` is clamped to the corpus size; an empty corpus yields no
    /// results. Equal scores keep corpus order.
    pub async fn search(&mut self, query: &str, top_k_count: usize) -> Result<Vec<ScoredTicket>> {
        if query.trim().is_empty() {
            return Err(HelpdeskError::EmptyQuery);
        }

        let matrix = self.ensure_ticket_embeddings().await?;
        if matrix.is_empty() || top_k_count == 0 {
            return Ok(Vec::new());
        }
        if matrix.len() != self.store.len() {
            return Err(HelpdeskError::Search(format!(
                "ticket index has {} rows for {} tickets",
                matrix.len(),
                self.store.len()
            )));
        }

        let query_vec = self.embedder.embed_boxed(query).await?;
        let scores = matrix.similarities(&query_vec)?;
        let tickets = self.store.tickets();

        let results: Vec<ScoredTicket> = top_k(&scores, top_k_count)
            .into_iter()
            .map(|i| ScoredTicket {
                ticket: tickets[i].clone(),
                score: scores[i],
            })
            .collect();

        debug!(
            query_len = query.len(),
            requested = top_k_count,
            returned = results.len(),
            "Search complete"
        );
        Ok(results)
    }

    /// Rank taxonomy categories against `"{subject} {description}"`.
    ///
    /// Returns the best category and the top `min(3, taxonomy size)`
    /// suggestions, best first. Blank input is not rejected here.
    pub async fn classify(&mut self, subject: &str, description: &str) -> Result<Classification> {
        let matrix = self.ensure_category_embeddings().await?;
        let vector = self
            .embedder
            .embed_boxed(&embedding_text(subject, description))
            .await?;
        let scores = matrix.similarities(&vector)?;

        let k = SUGGESTION_COUNT.min(self.taxonomy.len());
        let suggestions = top_k(&scores, k)
            .into_iter()
            .map(|i| {
                let category = self.taxonomy.get(i).ok_or(HelpdeskError::CategoryNotFound(i))?;
                Ok(CategorySuggestion {
                    category: category.to_string(),
                    confidence: scores[i],
                })
            })
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| error!(error = %e, "Category matrix out of step with taxonomy"))?;

        let best = suggestions
            .first()
            .cloned()
            .ok_or(HelpdeskError::CategoryNotFound(0))?;

        debug!(
            category = %best.category,
            confidence = best.confidence,
            "Ticket classified"
        );

        Ok(Classification {
            category: best.category,
            confidence: best.confidence,
            suggestions,
        })
    }

    /// Validate and append a ticket, persist the corpus, and mark the ticket
    /// embeddings stale. Embeddings are rebuilt by the next search.
    pub fn add(&mut self, subject: &str, description: &str, category: &str) -> Result<Ticket> {
        self.add_ticket(NewTicket::new(subject, description, category)?)
    }

    pub fn add_ticket(&mut self, ticket: NewTicket) -> Result<Ticket> {
        let ticket = self.store.add(ticket)?;
        self.index.invalidate_tickets();
        info!(id = ticket.id, category = %ticket.category, "Ticket added");
        Ok(ticket)
    }

    pub fn tickets(&self) -> &[Ticket] {
        self.store.tickets()
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn ticket_index_state(&self) -> IndexState {
        self.index.ticket_state()
    }

    pub fn category_index_state(&self) -> IndexState {
        self.index.category_state()
    }

    pub fn embedding_dimensions(&self) -> usize {
        self.embedder.dimensions()
    }
}

impl std::fmt::Debug for TicketSearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketSearchEngine")
            .field("store", &self.store)
            .field("taxonomy", &self.taxonomy)
            .field("index", &self.index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbedding;

    fn make_engine(dir: &tempfile::TempDir) -> TicketSearchEngine {
        let store = CorpusStore::new(dir.path().join("tickets.json"));
        let mut engine = TicketSearchEngine::new(store, Taxonomy::default(), MockEmbedding::new());
        engine.load().unwrap();
        engine
    }

    #[tokio::test]
    async fn test_search_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = make_engine(&dir);
        assert!(engine.search("anything", 5).await.unwrap().is_empty());
        assert_eq!(engine.ticket_index_state(), IndexState::Ready);
    }

    #[tokio::test]
    async fn test_search_rejects_blank_query() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = make_engine(&dir);
        assert!(matches!(
            engine.search("   ", 5).await,
            Err(HelpdeskError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_add_marks_index_stale_until_search() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = make_engine(&dir);
        engine.search("warm", 1).await.unwrap();
        assert_eq!(engine.ticket_index_state(), IndexState::Ready);

        engine
            .add("Invoice not received", "No invoice this month", "Billing")
            .unwrap();
        assert_eq!(engine.ticket_index_state(), IndexState::Stale);

        let hits = engine.search("invoice", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(engine.ticket_index_state(), IndexState::Ready);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = make_engine(&dir);
        assert!(matches!(
            engine.add("subject", "", "Billing"),
            Err(HelpdeskError::InvalidTicket {
                field: "description"
            })
        ));
        assert!(engine.tickets().is_empty());
    }

    #[tokio::test]
    async fn test_classify_single_category_taxonomy() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("tickets.json"));
        let taxonomy = Taxonomy::new(["Only"]).unwrap();
        let mut engine = TicketSearchEngine::new(store, taxonomy, MockEmbedding::new());

        let result = engine.classify("anything", "at all").await.unwrap();
        assert_eq!(result.category, "Only");
        assert_eq!(result.suggestions.len(), 1);
    }

    #[tokio::test]
    async fn test_classify_blank_input_still_answers() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = make_engine(&dir);
        let result = engine.classify("", "").await.unwrap();
        assert_eq!(result.suggestions.len(), 3);
        assert_eq!(result.suggestions[0].category, result.category);
    }
}
