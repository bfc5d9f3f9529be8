//! Pipeline configuration and environment resolution.
//!
//! [`RagConfig`] carries the knobs shared by the ingestion and query
//! pipelines and validates them at build time. The endpoint configs
//! ([`OllamaConfig`], [`QdrantConfig`]) resolve from the environment through
//! `dotenvy`, falling back to local-development defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// Shared pipeline configuration.
///
/// Construct via [`RagConfig::builder()`] to get validation, or use
/// [`Default`] for the stock local setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Name of the vector-store collection both pipelines operate on.
    pub collection: String,
    /// Chunk window size in characters.
    pub chunk_size: usize,
    /// Overlap carried between consecutive chunks, in characters.
    pub chunk_overlap: usize,
    /// Default number of nearest points retrieved per query.
    pub top_k: usize,
    /// Upper bound, in characters, on the context assembled for generation.
    /// Lowest-ranked contexts are dropped first when the budget is exceeded.
    pub context_budget: usize,
    /// How many times a transient provider/store failure is retried before
    /// the operation is given up.
    pub transient_retries: usize,
    /// Base delay for exponential backoff between retries.
    pub retry_base_delay: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection: "docs".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            context_budget: 6000,
            transient_retries: 2,
            retry_base_delay: Duration::from_millis(200),
        }
    }
}

impl RagConfig {
    /// Create a new builder seeded with the defaults.
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Validate parameter consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if the chunk geometry is invalid,
    /// `top_k` is zero, the context budget is zero, or the collection name
    /// is empty.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.collection.trim().is_empty() {
            return Err(RagError::Configuration(
                "collection name must not be empty".to_string(),
            ));
        }
        if self.chunk_size == 0 || self.chunk_overlap == 0 {
            return Err(RagError::Configuration(
                "chunk_size and chunk_overlap must be strictly positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Configuration(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if self.context_budget == 0 {
            return Err(RagError::Configuration(
                "context_budget must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    #[must_use]
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    #[must_use]
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    #[must_use]
    pub fn context_budget(mut self, chars: usize) -> Self {
        self.config.context_budget = chars;
        self
    }

    #[must_use]
    pub fn transient_retries(mut self, retries: usize) -> Self {
        self.config.transient_retries = retries;
        self
    }

    #[must_use]
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay = delay;
        self
    }

    /// Build the config, validating parameter consistency.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig, RagError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Connection settings for the Ollama model service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    /// Per-request network timeout; bounds worst-case job duration.
    pub request_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.2".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl OllamaConfig {
    /// Resolve from `OLLAMA_BASE_URL`, `OLLAMA_EMBED_MODEL`, and
    /// `OLLAMA_CHAT_MODEL`, reading a `.env` file first if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OLLAMA_BASE_URL").unwrap_or(defaults.base_url),
            embed_model: std::env::var("OLLAMA_EMBED_MODEL").unwrap_or(defaults.embed_model),
            chat_model: std::env::var("OLLAMA_CHAT_MODEL").unwrap_or(defaults.chat_model),
            request_timeout: defaults.request_timeout,
        }
    }
}

/// Connection settings for the Qdrant vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    /// Per-request network timeout; bounds worst-case job duration.
    pub request_timeout: Duration,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl QdrantConfig {
    /// Resolve from `QDRANT_URL`, reading a `.env` file first if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            url: std::env::var("QDRANT_URL").unwrap_or(defaults.url),
            request_timeout: defaults.request_timeout,
        }
    }
}
