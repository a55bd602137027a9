//! Embedding service trait and implementations.
//!
//! - `OnnxEmbeddingService` runs a sentence-transformer ONNX model (e.g.
//!   all-MiniLM-L6-v2) via ort, tokenizing with the HuggingFace tokenizers
//!   crate. The model is loaded on first use.
//! - `MockEmbedding` produces deterministic feature-hashed vectors, so texts
//!   sharing words are similar without any model files.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use helpdesk_core::error::HelpdeskError;
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Service for generating text embeddings.
///
/// Implementations must be deterministic: byte-identical text always maps to
/// the same vector for a given model.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, HelpdeskError>> + Send;

    /// Embed several texts, preserving input order.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, HelpdeskError>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// A blanket implementation covers every `EmbeddingService`, so the engine
/// can hold a `Box<dyn DynEmbeddingService>` chosen at runtime.
pub trait DynEmbeddingService: Send + Sync {
    fn embed_boxed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, HelpdeskError>>;

    fn embed_batch_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, HelpdeskError>>;

    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, HelpdeskError>> {
        Box::pin(self.embed(text))
    }

    fn embed_batch_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Vec<f32>>, HelpdeskError>> {
        Box::pin(self.embed_batch(texts))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

fn embedding_error<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> HelpdeskError {
    move |e| HelpdeskError::Embedding(format!("{}: {}", context, e))
}

fn unavailable<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> HelpdeskError {
    move |e| HelpdeskError::ProviderUnavailable(format!("{}: {}", context, e))
}

/// L2-normalize in place; zero vectors are left untouched.
fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vector.iter_mut() {
            *val /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService - real ONNX Runtime inference
// ---------------------------------------------------------------------------

/// A loaded sentence-transformer session and its tokenizer.
struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimensions: usize,
}

impl OnnxModel {
    fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self, HelpdeskError> {
        if !model_path.exists() {
            return Err(HelpdeskError::ProviderUnavailable(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(HelpdeskError::ProviderUnavailable(format!(
                "Tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(unavailable("ONNX session builder"))?
            .with_intra_threads(1)
            .map_err(unavailable("ONNX set threads"))?
            .commit_from_file(model_path)
            .map_err(unavailable("ONNX load model"))?;

        // Sentence-transformer output is [batch, seq_len, hidden_dim].
        let dimensions = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { 384 })
            .unwrap_or(384);

        let tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(unavailable("Failed to load tokenizer"))?;

        info!(
            model = %model_path.display(),
            dimensions,
            "Loaded ONNX embedding model"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
        })
    }

    /// Tokenize, run inference, mean-pool over the attention mask, normalize.
    fn embed(&self, text: &str) -> Result<Vec<f32>, HelpdeskError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(embedding_error("Tokenization failed"))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        let seq_len = input_ids.len();

        // Batch size 1: every input is shaped [1, seq_len].
        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(embedding_error("input_ids array"))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .map_err(embedding_error("attention_mask array"))?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(embedding_error("token_type_ids array"))?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(embedding_error("TensorRef input_ids"))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(embedding_error("TensorRef attention_mask"))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(embedding_error("TensorRef token_type_ids"))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| HelpdeskError::Embedding(format!("Session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(embedding_error("ONNX inference failed"))?;

        // try_extract_tensor returns (&Shape, &[f32]) for [1, seq_len, hidden_dim].
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(embedding_error("Extract embeddings"))?;

        let shape_dims: Vec<i64> = shape.iter().copied().collect();
        let hidden_dim = match shape_dims.last() {
            Some(&d) if shape_dims.len() >= 2 && d > 0 => d as usize,
            _ => {
                return Err(HelpdeskError::Embedding(format!(
                    "Unexpected output shape: {:?}",
                    shape_dims
                )))
            }
        };
        if data.len() < seq_len * hidden_dim {
            return Err(HelpdeskError::Embedding(format!(
                "Output holds {} values, expected at least {}",
                data.len(),
                seq_len * hidden_dim
            )));
        }

        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;
        for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
            if mask_val > 0 {
                let token = &data[tok_idx * hidden_dim..(tok_idx + 1) * hidden_dim];
                for (acc, val) in pooled.iter_mut().zip(token) {
                    *acc += val;
                }
                count += 1.0;
            }
        }
        if count > 0.0 {
            for val in &mut pooled {
                *val /= count;
            }
        }

        normalize(&mut pooled);
        Ok(pooled)
    }
}

/// ONNX Runtime-backed embedding service using a sentence-transformer model.
///
/// Expects a model directory containing `model.onnx` and `tokenizer.json`.
/// Nothing is read at construction; the first `embed` call loads the model
/// and pays the start-up latency. A load failure is reported as
/// `ProviderUnavailable` and retried on the next call.
pub struct OnnxEmbeddingService {
    model_path: PathBuf,
    tokenizer_path: PathBuf,
    dimensions: usize,
    model: OnceCell<Arc<OnnxModel>>,
}

impl std::fmt::Debug for OnnxEmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingService")
            .field("model_path", &self.model_path)
            .field("dimensions", &self.dimensions)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl OnnxEmbeddingService {
    /// Point at a model directory holding `model.onnx` and `tokenizer.json`.
    pub fn from_directory(model_dir: &Path, dimensions: usize) -> Self {
        Self::from_files(
            &model_dir.join("model.onnx"),
            &model_dir.join("tokenizer.json"),
            dimensions,
        )
    }

    /// Point at explicit model and tokenizer files.
    pub fn from_files(model_path: &Path, tokenizer_path: &Path, dimensions: usize) -> Self {
        Self {
            model_path: model_path.to_path_buf(),
            tokenizer_path: tokenizer_path.to_path_buf(),
            dimensions,
            model: OnceCell::new(),
        }
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn model(&self) -> Result<Arc<OnnxModel>, HelpdeskError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let model_path = self.model_path.clone();
                let tokenizer_path = self.tokenizer_path.clone();
                let expected = self.dimensions;
                let model = tokio::task::spawn_blocking(move || {
                    OnnxModel::load(&model_path, &tokenizer_path)
                })
                .await
                .map_err(|e| {
                    HelpdeskError::ProviderUnavailable(format!("Model load task failed: {}", e))
                })??;
                if model.dimensions != expected {
                    warn!(
                        configured = expected,
                        detected = model.dimensions,
                        "Model dimension differs from configuration"
                    );
                }
                Ok::<_, HelpdeskError>(Arc::new(model))
            })
            .await?;
        Ok(Arc::clone(model))
    }
}

impl EmbeddingService for OnnxEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HelpdeskError> {
        let model = self.model().await?;
        let text = text.to_string();
        // Inference is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || model.embed(&text))
            .await
            .map_err(|e| HelpdeskError::Embedding(format!("Embedding task panicked: {}", e)))?
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, HelpdeskError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model().await?;
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|text| model.embed(text))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| HelpdeskError::Embedding(format!("Embedding task panicked: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.model
            .get()
            .map(|m| m.dimensions)
            .unwrap_or(self.dimensions)
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic feature hashing
// ---------------------------------------------------------------------------

/// Mock embedding service built on the hashing trick.
///
/// Each lowercase alphanumeric token is hashed to a signed bucket; the counts
/// are L2-normalized. Identical texts give identical vectors, texts sharing
/// words score higher than unrelated ones, and whitespace maps to the zero
/// vector. Tokens are hashed with SeaHash, whose output is fixed, so vectors
/// are the same across builds and platforms.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = seahash::hash(token.to_lowercase().as_bytes());
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            result[bucket] += sign;
        }

        normalize(&mut result);
        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, HelpdeskError> {
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn test_mock_embedding_dimension() {
        let service = MockEmbedding::new();
        let vec = service.embed("hello world").await.unwrap();
        assert_eq!(vec.len(), 384);
        assert_eq!(EmbeddingService::dimensions(&service), 384);
    }

    #[tokio::test]
    async fn test_mock_embedding_deterministic() {
        let service = MockEmbedding::new();
        let v1 = service.embed("same text").await.unwrap();
        let v2 = service.embed("same text").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_case_insensitive_tokens() {
        let service = MockEmbedding::new();
        let v1 = service.embed("Invoice NOT received").await.unwrap();
        let v2 = service.embed("invoice not received").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_embedding_shared_words_score_higher() {
        let service = MockEmbedding::new();
        let query = service.embed("printer not connecting").await.unwrap();
        let near = service.embed("my printer is not connecting").await.unwrap();
        let far = service.embed("charged twice for subscription").await.unwrap();
        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn test_mock_embedding_whitespace_is_zero_vector() {
        let service = MockEmbedding::with_dimensions(16);
        let vec = service.embed(" ").await.unwrap();
        assert_eq!(vec.len(), 16);
        assert!(vec.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_mock_embedding_is_unit_length() {
        let service = MockEmbedding::new();
        let vec = service.embed("unit length check").await.unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_default_batch_preserves_order() {
        let service = MockEmbedding::new();
        let texts = vec!["first".to_string(), "second".to_string()];
        let batch = service.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], service.embed("first").await.unwrap());
        assert_eq!(batch[1], service.embed("second").await.unwrap());
    }

    #[tokio::test]
    async fn test_token_bucket_is_fixed_by_seahash() {
        let service = MockEmbedding::with_dimensions(64);
        let vec = service.embed("Printer").await.unwrap();

        let h = seahash::hash(b"printer");
        let bucket = (h % 64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        for (i, v) in vec.iter().enumerate() {
            let expected = if i == bucket { sign } else { 0.0 };
            assert_eq!(*v, expected, "bucket {i}");
        }
    }

    #[tokio::test]
    async fn test_dyn_dispatch() {
        let service: Box<dyn DynEmbeddingService> = Box::new(MockEmbedding::with_dimensions(8));
        assert_eq!(service.dimensions(), 8);
        assert_eq!(service.embed_boxed("abc").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_onnx_missing_model_is_unavailable() {
        let service = OnnxEmbeddingService::from_directory(Path::new("/nonexistent"), 384);
        assert!(!service.is_loaded());
        let result = service.embed("hello").await;
        assert!(matches!(result, Err(HelpdeskError::ProviderUnavailable(_))));
        assert!(!service.is_loaded());
        assert_eq!(EmbeddingService::dimensions(&service), 384);
    }
}
