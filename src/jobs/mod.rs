//! Asynchronous job model for ingestion and query requests.
//!
//! A [`Job`](JobRecord) tracks one ingestion or query request through a
//! monotonic status lifecycle:
//!
//! ```text
//! Pending ──dispatch──► Running ──pipeline ok──► Succeeded
//!    │                    │  │
//!    │                    │  └──pipeline err──► Failed
//!    │                    └──deadline──────────► TimedOut
//!    └───────caller cancels (also from Running)► Cancelled
//! ```
//!
//! Terminal statuses never regress; `JobRecord::transition` is the single
//! place that rule is enforced. The caller-visible statuses are exactly the
//! six [`JobStatus`] variants — no other strings are valid on the wire.

pub mod orchestrator;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::pipelines::{IngestReceipt, QueryAnswer};
use crate::types::Document;

pub use orchestrator::{AwaitOptions, CancelHandle, CancelToken, JobOrchestrator, cancel_pair};

/// Unique identifier of one submitted job.
pub type JobId = Uuid;

/// The two kinds of work a job can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    Ingest,
    Query,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Ingest => write!(f, "ingest"),
            JobKind::Query => write!(f, "query"),
        }
    }
}

/// Caller-visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
}

impl JobStatus {
    /// Terminal statuses never transition again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled | JobStatus::TimedOut
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::TimedOut => "TimedOut",
        };
        write!(f, "{label}")
    }
}

/// The request carried by a job, one of the two accepted event kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPayload {
    /// Ingest one document into the index.
    IngestDocument { document: Document },
    /// Answer a question from the index.
    Query { question: String, top_k: usize },
}

impl JobPayload {
    #[must_use]
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::IngestDocument { .. } => JobKind::Ingest,
            JobPayload::Query { .. } => JobKind::Query,
        }
    }
}

/// Result of a successfully completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobResult {
    Ingest(IngestReceipt),
    Query(QueryAnswer),
}

impl JobResult {
    /// Wire-shaped payload for transport to polling callers:
    /// `{"status": "ok", "detail": ...}` for ingestion,
    /// `{"answer": ..., "sources": [...]}` for queries.
    #[must_use]
    pub fn transport_payload(&self) -> serde_json::Value {
        match self {
            JobResult::Ingest(receipt) => serde_json::json!({
                "status": "ok",
                "detail": receipt.detail(),
            }),
            JobResult::Query(answer) => serde_json::json!({
                "answer": answer.answer,
                "sources": answer.sources,
            }),
        }
    }
}

/// Everything tracked about one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Present only once the job has succeeded.
    pub result: Option<JobResult>,
    /// Last failure reason, present on `Failed`/`Cancelled`/`TimedOut`.
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub(crate) fn new(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Pending,
            result: None,
            error: None,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Apply a status transition, refusing any move out of a terminal
    /// state. Returns whether the transition was applied.
    pub(crate) fn transition(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = next;
        match next {
            JobStatus::Running => self.started_at = Some(Utc::now()),
            status if status.is_terminal() => self.finished_at = Some(Utc::now()),
            _ => {}
        }
        true
    }
}

/// Errors surfaced by the polling protocol.
///
/// Note that [`OrchestratorError::JobTimedOut`] is a client-side
/// observation: the wait gave up, the job itself keeps executing.
#[derive(Debug, Error, Diagnostic)]
pub enum OrchestratorError {
    #[error("job not found: {0}")]
    #[diagnostic(
        code(ragline::jobs::not_found),
        help("The job id is unknown or the record was reclaimed by retention.")
    )]
    JobNotFound(JobId),

    #[error("job {job_id} failed: {reason}")]
    #[diagnostic(code(ragline::jobs::failed))]
    JobFailed { job_id: JobId, reason: String },

    #[error("timed out after {waited:?} waiting for job {job_id}")]
    #[diagnostic(
        code(ragline::jobs::timed_out),
        help("The job keeps executing; call await_result again with a longer timeout.")
    )]
    JobTimedOut { job_id: JobId, waited: Duration },

    #[error("wait for job {0} was cancelled by the caller")]
    #[diagnostic(code(ragline::jobs::wait_cancelled))]
    WaitCancelled(JobId),
}
