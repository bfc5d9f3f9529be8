//! Ingestion and query orchestration.
//!
//! Both pipelines compose the same capability seams — an
//! [`EmbeddingProvider`](crate::embeddings::EmbeddingProvider), a
//! [`VectorStore`](crate::stores::VectorStore), and (for queries) an
//! [`AnswerGenerator`](crate::generation::AnswerGenerator) — passed in
//! explicitly at construction. Nothing is read from ambient global state,
//! so isolated, parallel instances are cheap to build in tests.

pub mod ingest;
pub mod query;

pub use ingest::{IngestReceipt, IngestionPipeline};
pub use query::{NO_ANSWER, QueryAnswer, QueryPipeline};
