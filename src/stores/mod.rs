//! Storage backends for embedded document chunks.
//!
//! This module provides a unified [`VectorStore`] trait that abstracts over
//! different storage implementations, so pipelines can work with any
//! supported backend without being tied to a specific database.
//!
//! ```text
//!                    ┌──────────────────┐
//!                    │ VectorStore trait│
//!                    │   (async CRUD)   │
//!                    └────────┬─────────┘
//!                             │
//!                  ┌──────────┴──────────┐
//!                  ▼                     ▼
//!          ┌──────────────┐     ┌──────────────┐
//!          │   InMemory   │     │    Qdrant    │
//!          │  (process)   │     │   (REST)     │
//!          └──────────────┘     └──────────────┘
//! ```
//!
//! Collections are named, dimension- and metric-typed partitions. They are
//! created lazily on first use and never implicitly resized; changing a
//! collection's dimension requires deleting and recreating it.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::RagError;

pub use memory::InMemoryVectorStore;
pub use qdrant::QdrantVectorStore;

/// Distance metric configured per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Cosine similarity (the default, matching the upstream store).
    #[default]
    Cosine,
    /// Raw dot product.
    Dot,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "Cosine"),
            Self::Dot => write!(f, "Dot"),
        }
    }
}

/// Payload stored alongside every indexed vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointPayload {
    /// The chunk text this vector embeds.
    pub text: String,
    /// Source identifier of the originating document.
    pub source: String,
}

impl PointPayload {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

/// One raw nearest-neighbor hit before post-processing.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: PointPayload,
}

/// Post-processed search output: ranked contexts plus deduplicated sources.
///
/// Contexts appear in descending similarity order (ties broken by id order
/// for determinism). Sources are deduplicated keeping the first
/// retrieval-rank occurrence; per-chunk multiplicity and the full
/// rank-to-source mapping are lost here by design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub contexts: Vec<String>,
    pub sources: Vec<String>,
}

impl RetrievalResult {
    /// Collapse raw hits into contexts and deduplicated sources.
    ///
    /// Hits with empty payload text are skipped, matching the upstream
    /// store's behavior.
    #[must_use]
    pub fn from_hits(mut hits: Vec<ScoredPoint>) -> Self {
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut contexts = Vec::new();
        let mut sources = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for hit in hits {
            if hit.payload.text.is_empty() {
                continue;
            }
            contexts.push(hit.payload.text);
            if seen.insert(hit.payload.source.clone()) {
                sources.push(hit.payload.source);
            }
        }
        Self { contexts, sources }
    }

    /// Returns `true` when the search matched nothing usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Unified trait for vector storage backends.
///
/// Implementations persist `(id, vector, payload)` triples in named
/// collections and answer nearest-neighbor queries. All operations are safe
/// to call concurrently; upserts to the same id resolve last-writer-wins,
/// and upserts to different ids never interfere.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if absent; no-op otherwise.
    ///
    /// An existing collection is returned as-is: its dimension and metric
    /// are NOT validated against the requested ones. Callers must guarantee
    /// collections are never reused across incompatible dimensions — a
    /// known gap kept from the upstream store rather than silently fixed.
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<(), RagError>;

    /// Delete a collection and all its points. No-op when absent.
    async fn delete_collection(&self, name: &str) -> Result<(), RagError>;

    /// Insert or overwrite points. The three sequences must be equal length.
    ///
    /// # Errors
    ///
    /// [`RagError::LengthMismatch`] when the sequences differ in length and
    /// [`RagError::DimensionMismatch`] when any vector disagrees with the
    /// collection's dimension — in both cases nothing is written. The call
    /// is atomic: either every point lands or none does.
    async fn upsert(
        &self,
        collection: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<PointPayload>,
    ) -> Result<(), RagError>;

    /// Return up to `top_k` nearest points by the collection's metric,
    /// collapsed into a [`RetrievalResult`].
    ///
    /// `top_k` larger than the collection size returns everything available;
    /// `top_k == 0` returns an empty result. Never errors on an empty
    /// collection.
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<RetrievalResult, RagError>;

    /// Total number of points stored in the collection.
    async fn count(&self, collection: &str) -> Result<usize, RagError>;
}
