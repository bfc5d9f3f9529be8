//! In-process vector store over `tokio::sync::RwLock`.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{DistanceMetric, PointPayload, RetrievalResult, ScoredPoint, VectorStore};
use crate::types::RagError;

#[derive(Debug, Clone)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: PointPayload,
}

#[derive(Debug)]
struct Collection {
    dimension: usize,
    metric: DistanceMetric,
    points: FxHashMap<String, StoredPoint>,
}

/// Vector store backed by process memory.
///
/// Suitable for tests, demos, and single-process deployments. Each call
/// takes the collection lock once, which gives the per-call atomicity the
/// [`VectorStore`] contract requires: a rejected upsert writes nothing.
///
/// # Examples
///
/// ```
/// use ragline::stores::{DistanceMetric, InMemoryVectorStore, PointPayload, VectorStore};
///
/// # async fn example() -> Result<(), ragline::types::RagError> {
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 3, DistanceMetric::Cosine).await?;
/// store
///     .upsert(
///         "docs",
///         vec!["p1".into()],
///         vec![vec![0.1, 0.2, 0.3]],
///         vec![PointPayload::new("chunk text", "doc.txt")],
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<FxHashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<(), RagError> {
        if dimension == 0 {
            return Err(RagError::Configuration(
                "collection dimension must be strictly positive".to_string(),
            ));
        }
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_insert_with(|| {
            debug!(collection = name, dimension, %metric, "created collection");
            Collection {
                dimension,
                metric,
                points: FxHashMap::default(),
            }
        });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), RagError> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<PointPayload>,
    ) -> Result<(), RagError> {
        if ids.len() != vectors.len() || ids.len() != payloads.len() {
            return Err(RagError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
                payloads: payloads.len(),
            });
        }

        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| RagError::UnknownCollection(collection.to_string()))?;

        // Validate every vector before touching the map so a rejected call
        // leaves the collection untouched.
        for vector in &vectors {
            if vector.len() != target.dimension {
                return Err(RagError::DimensionMismatch {
                    declared: target.dimension,
                    actual: vector.len(),
                });
            }
        }

        let count = ids.len();
        for ((id, vector), payload) in ids.into_iter().zip(vectors).zip(payloads) {
            target.points.insert(id, StoredPoint { vector, payload });
        }
        debug!(collection, points = count, "upserted points");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<RetrievalResult, RagError> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| RagError::UnknownCollection(collection.to_string()))?;

        if query.len() != target.dimension {
            return Err(RagError::DimensionMismatch {
                declared: target.dimension,
                actual: query.len(),
            });
        }
        if top_k == 0 {
            return Ok(RetrievalResult::default());
        }

        let mut hits: Vec<ScoredPoint> = target
            .points
            .iter()
            .map(|(id, point)| {
                let score = match target.metric {
                    DistanceMetric::Cosine => cosine_similarity(&point.vector, query),
                    DistanceMetric::Dot => dot_product(&point.vector, query),
                };
                ScoredPoint {
                    id: id.clone(),
                    score,
                    payload: point.payload.clone(),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);

        Ok(RetrievalResult::from_hits(hits))
    }

    async fn count(&self, collection: &str) -> Result<usize, RagError> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| RagError::UnknownCollection(collection.to_string()))?;
        Ok(target.points.len())
    }
}
