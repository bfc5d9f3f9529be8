//! Core types shared across the retrieval pipeline.
//!
//! This module defines [`Document`], the unit of ingestion, and [`RagError`],
//! the crate-wide error taxonomy. Errors are split into two classes:
//!
//! - **Fatal**: configuration and contract violations ([`RagError::Configuration`],
//!   [`RagError::DimensionMismatch`], [`RagError::LengthMismatch`],
//!   [`RagError::UnknownCollection`]). These indicate caller bugs or provider
//!   regressions and are surfaced immediately, never retried.
//! - **Transient**: reachability failures ([`RagError::ProviderUnavailable`],
//!   [`RagError::StoreUnavailable`]). These are safe to retry with backoff;
//!   see [`RagError::is_transient`].
//!
//! Job-protocol errors (timeouts, failed jobs) live separately in
//! [`crate::jobs::OrchestratorError`].

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw document handed to the ingestion pipeline.
///
/// The `source_id` is a stable identifier (e.g. a filename) carried into
/// every indexed point derived from this document. Documents are immutable
/// once ingested; re-ingesting the same `source_id` overwrites the prior
/// points rather than duplicating them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier for the document, e.g. the uploaded file name.
    pub source_id: String,
    /// Full raw text of the document.
    pub text: String,
}

impl Document {
    /// Create a new document from a source identifier and its text.
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// Errors produced by the chunker, providers, stores, and pipelines.
#[derive(Debug, Error, Diagnostic)]
pub enum RagError {
    /// Malformed parameters or invalid wiring. Fatal, never retried.
    #[error("configuration error: {0}")]
    #[diagnostic(code(ragline::configuration))]
    Configuration(String),

    /// The embedding or generation backend could not be reached.
    #[error("provider unavailable ({provider}): {message}")]
    #[diagnostic(
        code(ragline::provider_unavailable),
        help("The backing model service could not be reached; safe to retry with backoff.")
    )]
    ProviderUnavailable {
        provider: &'static str,
        message: String,
    },

    /// The vector store could not be reached.
    #[error("vector store unavailable ({backend}): {message}")]
    #[diagnostic(
        code(ragline::store_unavailable),
        help("The store could not be reached; safe to retry with backoff.")
    )]
    StoreUnavailable {
        backend: &'static str,
        message: String,
    },

    /// A vector's length disagrees with the declared dimension.
    ///
    /// Raised both as a defensive check against provider regressions and
    /// when a point's vector does not match its collection's dimension.
    #[error("embedding dimension mismatch: declared {declared}, got {actual}")]
    #[diagnostic(
        code(ragline::dimension_mismatch),
        help("Dimension is fixed per provider and per collection; recreate the collection to change it.")
    )]
    DimensionMismatch { declared: usize, actual: usize },

    /// Upsert was called with sequences of differing lengths.
    ///
    /// No partial write is performed when this is raised.
    #[error("upsert length mismatch: {ids} ids, {vectors} vectors, {payloads} payloads")]
    #[diagnostic(code(ragline::length_mismatch))]
    LengthMismatch {
        ids: usize,
        vectors: usize,
        payloads: usize,
    },

    /// An operation referenced a collection that does not exist.
    #[error("unknown collection: {0}")]
    #[diagnostic(
        code(ragline::unknown_collection),
        help("Call ensure_collection before upserting or searching.")
    )]
    UnknownCollection(String),
}

impl RagError {
    /// Returns `true` when the error is safe to retry with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::ProviderUnavailable { .. } | RagError::StoreUnavailable { .. }
        )
    }
}
