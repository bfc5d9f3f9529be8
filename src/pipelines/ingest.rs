//! Document ingestion: chunk → embed → index.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::chunker::TextChunker;
use crate::config::RagConfig;
use crate::embeddings::EmbeddingProvider;
use crate::retry::retry_transient;
use crate::stores::{DistanceMetric, PointPayload, VectorStore};
use crate::types::{Document, RagError};

/// Summary of one completed ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub source_id: String,
    pub chunks_indexed: usize,
}

impl IngestReceipt {
    /// Human-readable detail line for the job transport payload.
    #[must_use]
    pub fn detail(&self) -> String {
        format!(
            "indexed {} chunks from '{}'",
            self.chunks_indexed, self.source_id
        )
    }
}

/// Deterministic point id for a chunk: UUIDv5 over `source_id/chunk_index`.
///
/// Re-ingesting the same document with the same chunker parameters yields
/// the same ids, so the upsert overwrites prior points instead of
/// duplicating them.
#[must_use]
pub fn chunk_point_id(source_id: &str, chunk_index: usize) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{source_id}/{chunk_index}").as_bytes(),
    )
    .to_string()
}

/// Orchestrates chunking, embedding, and indexing for one document at a
/// time.
///
/// Each step is a hard dependency on the previous one succeeding; a failure
/// anywhere aborts the whole ingestion and leaves prior indexed state
/// untouched. Transient provider/store failures are retried with backoff
/// before the operation is given up.
pub struct IngestionPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: RagConfig,
}

impl IngestionPipeline {
    /// Build a pipeline from its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] when `config` is inconsistent.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: RagConfig,
    ) -> Result<Self, RagError> {
        config.validate()?;
        let chunker = TextChunker::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            chunker,
            embedder,
            store,
            config,
        })
    }

    /// The collection this pipeline writes to.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Ingest one document end to end.
    ///
    /// Splits the text, embeds all chunks in one batch call, and upserts one
    /// point per chunk with a deterministic id and a `{text, source}`
    /// payload. An empty document succeeds with zero chunks indexed.
    #[instrument(skip(self, document), fields(source_id = %document.source_id), err)]
    pub async fn ingest(&self, document: &Document) -> Result<IngestReceipt, RagError> {
        let retries = self.config.transient_retries;
        let delay = self.config.retry_base_delay;

        self.store
            .ensure_collection(
                &self.config.collection,
                self.embedder.dimension(),
                DistanceMetric::Cosine,
            )
            .await?;

        let chunks = self.chunker.split(&document.text);
        if chunks.is_empty() {
            info!(chunks = 0, "document produced no chunks");
            return Ok(IngestReceipt {
                source_id: document.source_id.clone(),
                chunks_indexed: 0,
            });
        }

        let embeddings =
            retry_transient(retries, delay, || self.embedder.embed_batch(&chunks)).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::ProviderUnavailable {
                provider: "embeddings",
                message: format!(
                    "misaligned batch: {} chunks, {} vectors",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let ids: Vec<String> = (0..chunks.len())
            .map(|idx| chunk_point_id(&document.source_id, idx))
            .collect();
        let payloads: Vec<PointPayload> = chunks
            .iter()
            .map(|text| PointPayload::new(text.clone(), document.source_id.clone()))
            .collect();

        retry_transient(retries, delay, || {
            self.store.upsert(
                &self.config.collection,
                ids.clone(),
                embeddings.clone(),
                payloads.clone(),
            )
        })
        .await?;

        let receipt = IngestReceipt {
            source_id: document.source_id.clone(),
            chunks_indexed: chunks.len(),
        };
        info!(chunks = receipt.chunks_indexed, "document ingested");
        Ok(receipt)
    }
}
