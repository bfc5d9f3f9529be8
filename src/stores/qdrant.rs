//! Qdrant vector store over its REST API.
//!
//! Speaks the plain HTTP surface (`/collections/...`) rather than a vendor
//! SDK, with an explicit request timeout on the client so a wedged store
//! bounds the duration of any job that touches it.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{DistanceMetric, PointPayload, RetrievalResult, ScoredPoint, VectorStore};
use crate::config::QdrantConfig;
use crate::types::RagError;

/// Vector store backed by a Qdrant instance.
pub struct QdrantVectorStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: Option<PayloadBody>,
}

#[derive(Deserialize, Default)]
struct PayloadBody {
    #[serde(default)]
    text: String,
    #[serde(default)]
    source: String,
}

#[derive(Deserialize)]
struct CountResponse {
    result: CountBody,
}

#[derive(Deserialize)]
struct CountBody {
    count: usize,
}

fn transport_error(err: reqwest::Error) -> RagError {
    RagError::StoreUnavailable {
        backend: "qdrant",
        message: err.to_string(),
    }
}

impl QdrantVectorStore {
    /// Build a store client for the configured Qdrant endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &QdrantConfig) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| RagError::Configuration(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{name}", self.base_url)
    }

    /// Map a non-success status to the error taxonomy: server-side trouble
    /// is retryable, anything else is a rejected request.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RagError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(RagError::StoreUnavailable {
                backend: "qdrant",
                message: format!("{status}: {body}"),
            })
        } else {
            Err(RagError::Configuration(format!(
                "qdrant rejected request ({status}): {body}"
            )))
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<(), RagError> {
        let probe = self
            .client
            .get(self.collection_url(name))
            .send()
            .await
            .map_err(transport_error)?;

        match probe.status() {
            StatusCode::NOT_FOUND => {}
            status if status.is_success() => return Ok(()),
            _ => {
                Self::check(probe).await?;
                return Ok(());
            }
        }

        let create = self
            .client
            .put(self.collection_url(name))
            .json(&serde_json::json!({
                "vectors": { "size": dimension, "distance": metric.to_string() },
            }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(create).await?;
        debug!(collection = name, dimension, %metric, "created collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), RagError> {
        let response = self
            .client
            .delete(self.collection_url(name))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
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
        if ids.is_empty() {
            return Ok(());
        }

        let points: Vec<serde_json::Value> = ids
            .into_iter()
            .zip(vectors)
            .zip(payloads)
            .map(|((id, vector), payload)| {
                serde_json::json!({
                    "id": id,
                    "vector": vector,
                    "payload": { "text": payload.text, "source": payload.source },
                })
            })
            .collect();
        let count = points.len();

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url(collection)))
            .json(&serde_json::json!({ "points": points }))
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response).await?;
        debug!(collection, points = count, "upserted points");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<RetrievalResult, RagError> {
        if top_k == 0 {
            return Ok(RetrievalResult::default());
        }

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url(collection)))
            .json(&serde_json::json!({
                "vector": query,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(transport_error)?;
        let response = Self::check(response).await?;

        let body: SearchResponse = response.json().await.map_err(transport_error)?;
        let hits = body
            .result
            .into_iter()
            .map(|hit| {
                let id = match hit.id {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                let payload = hit.payload.unwrap_or_default();
                ScoredPoint {
                    id,
                    score: hit.score,
                    payload: PointPayload::new(payload.text, payload.source),
                }
            })
            .collect();
        Ok(RetrievalResult::from_hits(hits))
    }

    async fn count(&self, collection: &str) -> Result<usize, RagError> {
        let response = self
            .client
            .post(format!("{}/points/count", self.collection_url(collection)))
            .json(&serde_json::json!({ "exact": true }))
            .send()
            .await
            .map_err(transport_error)?;
        let response = Self::check(response).await?;
        let body: CountResponse = response.json().await.map_err(transport_error)?;
        Ok(body.result.count)
    }
}
