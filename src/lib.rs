//! # Ragline: Retrieval Pipeline with Asynchronous Job Orchestration
//!
//! Ragline turns raw documents into a searchable vector index and answers
//! natural-language questions from it, with both operations running as
//! independently-triggered, observable background jobs rather than
//! synchronous request handling.
//!
//! ## Core Concepts
//!
//! - **Chunker**: deterministic, boundary-aware splitting with exact overlap
//! - **Capability seams**: embedding and answer generation behind swappable
//!   traits, so test doubles slot in without touching the pipelines
//! - **Vector store**: named, dimension-typed collections of
//!   `(id, vector, payload)` points with nearest-neighbor search
//! - **Pipelines**: ingestion (chunk → embed → index) and query
//!   (embed → search → assemble → generate)
//! - **Jobs**: submit-and-poll orchestration with monotonic statuses,
//!   caller-side timeouts, cancellation, and lifecycle events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ragline::config::RagConfig;
//! use ragline::embeddings::MockEmbeddingProvider;
//! use ragline::generation::StaticAnswerGenerator;
//! use ragline::jobs::{AwaitOptions, JobOrchestrator, JobPayload};
//! use ragline::pipelines::{IngestionPipeline, QueryPipeline};
//! use ragline::stores::InMemoryVectorStore;
//! use ragline::types::Document;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RagConfig::default();
//! let embedder = Arc::new(MockEmbeddingProvider::new());
//! let store = Arc::new(InMemoryVectorStore::new());
//! let generator = Arc::new(StaticAnswerGenerator::new("stub answer"));
//!
//! let ingestion = Arc::new(IngestionPipeline::new(
//!     embedder.clone(),
//!     store.clone(),
//!     config.clone(),
//! )?);
//! let query = Arc::new(QueryPipeline::new(embedder, store, generator, config)?);
//!
//! let orchestrator = JobOrchestrator::builder()
//!     .ingestion(ingestion)
//!     .query(query)
//!     .build()?;
//!
//! let job = orchestrator
//!     .submit(JobPayload::IngestDocument {
//!         document: Document::new("notes.txt", "Cats are mammals."),
//!     })
//!     .await;
//! orchestrator.await_result(job, AwaitOptions::default()).await?;
//!
//! let job = orchestrator
//!     .submit(JobPayload::Query {
//!         question: "What are cats?".into(),
//!         top_k: 5,
//!     })
//!     .await;
//! let result = orchestrator.await_result(job, AwaitOptions::default()).await?;
//! println!("{}", serde_json::to_string_pretty(&result.transport_payload())?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`types`] - documents and the crate-wide error taxonomy
//! - [`chunker`] - overlapping, boundary-aware text splitting
//! - [`embeddings`] - embedding capability trait and backends
//! - [`generation`] - answer generation capability trait and backends
//! - [`stores`] - vector store trait, in-memory and Qdrant backends
//! - [`pipelines`] - ingestion and query orchestration
//! - [`jobs`] - job model, orchestrator, and polling protocol
//! - [`event_bus`] - job lifecycle events and pluggable sinks
//! - [`config`] - validated configuration and environment resolution
//! - [`telemetry`] - tracing subscriber installation

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod event_bus;
pub mod generation;
pub mod jobs;
pub mod pipelines;
mod retry;
pub mod stores;
pub mod telemetry;
pub mod types;

pub use chunker::TextChunker;
pub use config::RagConfig;
pub use jobs::{JobOrchestrator, JobPayload, JobStatus};
pub use pipelines::{IngestionPipeline, NO_ANSWER, QueryPipeline};
pub use stores::{RetrievalResult, VectorStore};
pub use types::{Document, RagError};
