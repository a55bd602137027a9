//! Embedding matrices for the ticket corpus and the category taxonomy.
//!
//! Each matrix lives in a slot with an explicit lifecycle:
//!
//! ```text
//! Stale --ensure--> Building --ok--> Ready --invalidate--> Stale
//!                      |
//!                      +--error--> Stale
//! ```
//!
//! A slot found in `Building` on entry belongs to a build whose caller was
//! cancelled mid-flight; it is rebuilt from scratch. The owner serializes
//! access (`&mut self`), so no reader can observe a half-built matrix.

use std::sync::Arc;
use std::time::Instant;

use ndarray::{Array2, ArrayView1};
use serde::Serialize;
use tracing::{debug, info};

use helpdesk_core::error::{HelpdeskError, Result};
use helpdesk_core::types::{Taxonomy, Ticket};

use crate::embedding::DynEmbeddingService;
use crate::similarity::cosine_similarity;

/// Lifecycle state of one embedding matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// Absent or invalidated; the next access rebuilds it.
    Stale,
    /// A rebuild is in progress.
    Building,
    /// Up to date with its source.
    Ready,
}

/// Dense row-major matrix of embeddings, one row per source text.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    data: Array2<f32>,
}

impl EmbeddingMatrix {
    /// Stack `rows` into a matrix.
    ///
    /// The width comes from the first row, or `dimensions` when there are no
    /// rows. All rows must share that width.
    pub fn from_rows(rows: Vec<Vec<f32>>, dimensions: usize) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(dimensions);
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(HelpdeskError::Embedding(format!(
                "row {} has {} dimensions, expected {}",
                bad,
                rows[bad].len(),
                width
            )));
        }

        let height = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((height, width), flat)
            .map_err(|e| HelpdeskError::Embedding(format!("matrix shape: {}", e)))?;
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.data.ncols()
    }

    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        (index < self.len()).then(|| self.data.row(index))
    }

    /// Cosine similarity of `query` against every row, in row order.
    pub fn similarities(&self, query: &[f32]) -> Result<Vec<f64>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions() {
            return Err(HelpdeskError::Search(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions()
            )));
        }

        self.data
            .outer_iter()
            .map(|row| {
                row.as_slice()
                    .map(|r| cosine_similarity(query, r))
                    .ok_or_else(|| {
                        HelpdeskError::Search("embedding row is not contiguous".to_string())
                    })
            })
            .collect()
    }
}

#[derive(Debug, Default)]
enum Slot {
    #[default]
    Stale,
    Building,
    Ready(Arc<EmbeddingMatrix>),
}

impl Slot {
    fn state(&self) -> IndexState {
        match self {
            Slot::Stale => IndexState::Stale,
            Slot::Building => IndexState::Building,
            Slot::Ready(_) => IndexState::Ready,
        }
    }

    /// Return the ready matrix, or embed `texts` and store the result.
    async fn ensure(
        &mut self,
        name: &'static str,
        embedder: &dyn DynEmbeddingService,
        texts: impl FnOnce() -> Vec<String>,
    ) -> Result<Arc<EmbeddingMatrix>> {
        match self {
            Slot::Ready(matrix) => return Ok(Arc::clone(matrix)),
            Slot::Building => debug!(index = name, "Discarding interrupted build"),
            Slot::Stale => {}
        }

        *self = Slot::Building;
        let texts = texts();
        let started = Instant::now();

        let built = match embedder.embed_batch_boxed(&texts).await {
            Ok(rows) if rows.len() == texts.len() => {
                EmbeddingMatrix::from_rows(rows, embedder.dimensions())
            }
            Ok(rows) => Err(HelpdeskError::Embedding(format!(
                "provider returned {} vectors for {} texts",
                rows.len(),
                texts.len()
            ))),
            Err(e) => Err(e),
        };

        match built {
            Ok(matrix) => {
                let matrix = Arc::new(matrix);
                info!(
                    index = name,
                    rows = matrix.len(),
                    dimensions = matrix.dimensions(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Embedding matrix built"
                );
                *self = Slot::Ready(Arc::clone(&matrix));
                Ok(matrix)
            }
            Err(e) => {
                *self = Slot::Stale;
                Err(e)
            }
        }
    }
}

/// Ticket and category embedding matrices owned by one engine.
///
/// The ticket matrix is aligned row-for-row with the corpus order and is
/// rebuilt wholesale after any corpus change. The category matrix is built
/// once and never invalidated.
#[derive(Debug, Default)]
pub struct EmbeddingIndex {
    tickets: Slot,
    categories: Slot,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket_state(&self) -> IndexState {
        self.tickets.state()
    }

    pub fn category_state(&self) -> IndexState {
        self.categories.state()
    }

    /// Mark the ticket matrix stale after a corpus change.
    pub fn invalidate_tickets(&mut self) {
        if !matches!(self.tickets, Slot::Stale) {
            debug!("Ticket embeddings invalidated");
        }
        self.tickets = Slot::Stale;
    }

    /// Ready ticket matrix, embedding `"{subject} {description}"` per ticket
    /// in corpus order if stale.
    pub async fn ensure_tickets(
        &mut self,
        embedder: &dyn DynEmbeddingService,
        tickets: &[Ticket],
    ) -> Result<Arc<EmbeddingMatrix>> {
        self.tickets
            .ensure("tickets", embedder, || {
                tickets.iter().map(Ticket::embedding_text).collect()
            })
            .await
    }

    /// Ready category matrix, embedding each label in taxonomy order once.
    pub async fn ensure_categories(
        &mut self,
        embedder: &dyn DynEmbeddingService,
        taxonomy: &Taxonomy,
    ) -> Result<Arc<EmbeddingMatrix>> {
        self.categories
            .ensure("categories", embedder, || taxonomy.labels().to_vec())
            .await
    }
}
