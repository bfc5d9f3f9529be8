//! Embedding capability boundary.
//!
//! [`EmbeddingProvider`] abstracts over whatever turns text into
//! fixed-dimension vectors. The pipeline only ever talks to the trait, so
//! deterministic test doubles can stand in for a real model service.
//!
//! Two implementations ship with the crate:
//!
//! - [`MockEmbeddingProvider`] — deterministic hash-derived vectors, no I/O.
//! - [`OllamaEmbeddings`] — the Ollama `/api/embed` batch endpoint.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rustc_hash::FxHasher;
use serde::Deserialize;
use tracing::debug;

use crate::config::OllamaConfig;
use crate::types::RagError;

/// Capability interface for turning text into fixed-dimension vectors.
///
/// The batch call is the primary operation; [`embed`](EmbeddingProvider::embed)
/// is defined as a batch of one, so batching is an optimization rather than a
/// semantic difference. `embed_batch` results are index-aligned with the
/// input: `result[i]` embeds `texts[i]`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Dimensionality of every vector this provider produces.
    ///
    /// Known up front so callers can create vector-store collections before
    /// embedding anything.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, index-aligned with the input.
    ///
    /// # Errors
    ///
    /// [`RagError::ProviderUnavailable`] when the backing service cannot be
    /// reached, [`RagError::DimensionMismatch`] when a returned vector
    /// disagrees with [`dimension`](EmbeddingProvider::dimension).
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text as a batch of one.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let batch = [text.to_string()];
        let mut vectors = self.embed_batch(&batch).await?;
        vectors.pop().ok_or(RagError::ProviderUnavailable {
            provider: "embeddings",
            message: "provider returned an empty batch for a single input".to_string(),
        })
    }
}

/// Deterministic embedding provider for tests and offline development.
///
/// Vectors are derived from a hash of the input text, L2-normalized, and
/// stable across calls and processes: the same text always produces the same
/// vector, and distinct texts produce distinct vectors with overwhelming
/// probability. The vectors carry no semantic signal.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub const DEFAULT_DIMENSION: usize = 32;

    pub fn new() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
        }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn pseudo_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimension);
        for slot in 0..self.dimension {
            let mut hasher = FxHasher::default();
            slot.hash(&mut hasher);
            text.hash(&mut hasher);
            let raw = hasher.finish();
            vector.push(((raw % 2001) as f32 / 1000.0) - 1.0);
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.pseudo_vector(t)).collect())
    }
}

/// Embedding provider backed by the Ollama `/api/embed` endpoint.
///
/// The HTTP client carries its own request timeout so a wedged model service
/// bounds the duration of any job that embeds, independent of caller-side
/// polling timeouts.
pub struct OllamaEmbeddings {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddings {
    /// Build a provider for the given endpoint and declared dimension.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] when the HTTP client cannot be
    /// constructed or `dimension` is zero.
    pub fn new(config: &OllamaConfig, dimension: usize) -> Result<Self, RagError> {
        if dimension == 0 {
            return Err(RagError::Configuration(
                "embedding dimension must be strictly positive".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| RagError::Configuration(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embed_model.clone(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let unavailable = |message: String| RagError::ProviderUnavailable {
            provider: "ollama-embeddings",
            message,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?
            .error_for_status()
            .map_err(|err| unavailable(err.to_string()))?;

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|err| unavailable(format!("malformed embed response: {err}")))?;

        if body.embeddings.len() != texts.len() {
            return Err(unavailable(format!(
                "misaligned batch: sent {} texts, received {} vectors",
                texts.len(),
                body.embeddings.len()
            )));
        }
        for vector in &body.embeddings {
            if vector.len() != self.dimension {
                return Err(RagError::DimensionMismatch {
                    declared: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        debug!(count = body.embeddings.len(), model = %self.model, "embedded batch");
        Ok(body.embeddings)
    }
}
