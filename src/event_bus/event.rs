//! Event types emitted by the job orchestrator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::jobs::{JobKind, JobStatus};

/// An event observable on the bus.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Event {
    /// A job status transition.
    Job(JobEvent),
    /// Free-form diagnostic output from the runtime itself.
    Diagnostic(DiagnosticEvent),
}

/// One job status transition with its timestamp and a short message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JobEvent {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub message: String,
    pub when: DateTime<Utc>,
}

/// Diagnostic event with a scope label and a message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
}

impl Event {
    pub fn job(
        job_id: Uuid,
        kind: JobKind,
        status: JobStatus,
        message: impl Into<String>,
    ) -> Self {
        Event::Job(JobEvent {
            job_id,
            kind,
            status,
            message: message.into(),
            when: Utc::now(),
        })
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Job(job) => &job.message,
            Event::Diagnostic(diag) => &diag.message,
        }
    }

    /// Convert the event to a normalized JSON value for sink consumers.
    ///
    /// ```json
    /// {
    ///   "type": "job" | "diagnostic",
    ///   "message": "...",
    ///   "timestamp": "2026-08-07T12:34:56.789Z",
    ///   "metadata": { /* variant-specific fields */ }
    /// }
    /// ```
    pub fn to_json_value(&self) -> Value {
        let (event_type, timestamp, metadata) = match self {
            Event::Job(job) => (
                "job",
                job.when,
                json!({
                    "job_id": job.job_id,
                    "kind": job.kind,
                    "status": job.status,
                }),
            ),
            Event::Diagnostic(diag) => (
                "diagnostic",
                Utc::now(),
                json!({ "scope": diag.scope }),
            ),
        };
        json!({
            "type": event_type,
            "message": self.message(),
            "timestamp": timestamp.to_rfc3339(),
            "metadata": metadata,
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Job(job) => write!(
                f,
                "[{} {} {}] {}",
                job.kind, job.job_id, job.status, job.message
            ),
            Event::Diagnostic(diag) => write!(f, "[{}] {}", diag.scope, diag.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_event_json_shape() {
        let id = Uuid::new_v4();
        let event = Event::job(id, JobKind::Query, JobStatus::Running, "dispatched");
        let value = event.to_json_value();
        assert_eq!(value["type"], "job");
        assert_eq!(value["message"], "dispatched");
        assert_eq!(value["metadata"]["status"], "Running");
        assert_eq!(value["metadata"]["job_id"], json!(id));
    }

    #[test]
    fn display_includes_scope() {
        let event = Event::diagnostic("bus", "listener started");
        assert_eq!(event.to_string(), "[bus] listener started");
    }
}
