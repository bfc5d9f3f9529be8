//! Submission and completion-polling for background jobs.
//!
//! [`JobOrchestrator`] decouples job execution from the submitting caller:
//! [`submit`](JobOrchestrator::submit) records the request and spawns
//! exactly one pipeline execution on the tokio runtime, returning
//! immediately; callers then poll with
//! [`await_result`](JobOrchestrator::await_result), which takes its
//! deadline, poll cadence, and cancellation signal as first-class
//! parameters. A caller-side timeout or cancelled wait never affects the
//! underlying job — re-polling the same id later still observes the
//! eventual outcome.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::AbortHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, instrument};

use super::{JobId, JobKind, JobPayload, JobRecord, JobResult, JobStatus, OrchestratorError};
use crate::event_bus::{Event, EventBus};
use crate::pipelines::{IngestionPipeline, QueryPipeline};
use crate::types::RagError;
use uuid::Uuid;

/// Parameters for one [`await_result`](JobOrchestrator::await_result) call.
///
/// The deadline and poll cadence are properties of the *wait*, not of the
/// job; two callers can poll the same job with different options.
pub struct AwaitOptions {
    /// How long this caller is willing to wait before giving up with
    /// [`OrchestratorError::JobTimedOut`].
    pub timeout: Duration,
    /// Cadence at which the job status is re-checked.
    pub poll_interval: Duration,
    /// Optional cancellation signal; firing it aborts the wait (not the
    /// job) with [`OrchestratorError::WaitCancelled`].
    pub cancel: Option<CancelToken>,
}

impl Default for AwaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
            cancel: None,
        }
    }
}

impl AwaitOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Create a linked cancellation pair.
///
/// Dropping the handle without calling [`CancelHandle::cancel`] leaves the
/// token permanently un-cancelled.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Caller-held side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal every linked token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cancellation signal accepted by [`AwaitOptions`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Resolve once cancellation is signalled; pends forever if the handle
    /// is dropped unsignalled.
    pub(crate) async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

type JobTable = Arc<RwLock<FxHashMap<JobId, JobRecord>>>;
type HandleTable = Arc<Mutex<FxHashMap<JobId, AbortHandle>>>;

/// Accepts ingestion and query requests as asynchronous jobs.
///
/// Pipelines and the event bus are passed in explicitly at construction —
/// there is no ambient global client — so isolated orchestrators can run
/// side by side in one process.
pub struct JobOrchestrator {
    ingestion: Arc<IngestionPipeline>,
    query: Arc<QueryPipeline>,
    jobs: JobTable,
    handles: HandleTable,
    event_bus: EventBus,
    sender: flume::Sender<Event>,
    execution_timeout: Option<Duration>,
}

impl JobOrchestrator {
    /// Create a new [`JobOrchestratorBuilder`].
    pub fn builder() -> JobOrchestratorBuilder {
        JobOrchestratorBuilder::default()
    }

    /// The bus carrying job lifecycle events; attach sinks or subscribe
    /// here.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Number of tracked job records (all statuses).
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Enqueue a request for out-of-band execution and return immediately.
    ///
    /// Each call dispatches exactly one pipeline execution; calling
    /// `submit` again with the same payload creates a distinct job.
    #[instrument(skip(self, payload), fields(kind = %payload.kind()))]
    pub async fn submit(&self, payload: JobPayload) -> JobId {
        let id = Uuid::new_v4();
        let kind = payload.kind();
        self.jobs.write().await.insert(id, JobRecord::new(id, kind));
        self.emit(id, kind, JobStatus::Pending, "job accepted");

        let jobs = Arc::clone(&self.jobs);
        let handles = Arc::clone(&self.handles);
        let ingestion = Arc::clone(&self.ingestion);
        let query = Arc::clone(&self.query);
        let sender = self.sender.clone();
        let execution_timeout = self.execution_timeout;

        let join = tokio::spawn(async move {
            Self::execute(
                jobs,
                handles,
                ingestion,
                query,
                sender,
                execution_timeout,
                id,
                payload,
            )
            .await;
        });
        self.handles.lock().await.insert(id, join.abort_handle());
        // The task may have finished before its handle was registered; drop
        // the stale handle so the table only tracks live jobs.
        if self
            .jobs
            .read()
            .await
            .get(&id)
            .is_none_or(|record| record.status.is_terminal())
        {
            self.handles.lock().await.remove(&id);
        }
        id
    }

    /// Current status of a job.
    pub async fn status(&self, job_id: JobId) -> Result<JobStatus, OrchestratorError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map(|record| record.status)
            .ok_or(OrchestratorError::JobNotFound(job_id))
    }

    /// Full snapshot of a job record.
    pub async fn snapshot(&self, job_id: JobId) -> Result<JobRecord, OrchestratorError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(OrchestratorError::JobNotFound(job_id))
    }

    /// Poll a job until it reaches a terminal status or the wait gives up.
    ///
    /// Returns the job result on `Succeeded`. `Failed`, `Cancelled`, and a
    /// job-side execution deadline all surface as
    /// [`OrchestratorError::JobFailed`] carrying the recorded reason.
    /// [`OrchestratorError::JobTimedOut`] means only that *this wait*
    /// elapsed — the job keeps executing and can be re-polled.
    #[instrument(skip(self, options), fields(job_id = %job_id), err)]
    pub async fn await_result(
        &self,
        job_id: JobId,
        options: AwaitOptions,
    ) -> Result<JobResult, OrchestratorError> {
        let started = Instant::now();
        let mut cancel = options.cancel;

        loop {
            {
                let jobs = self.jobs.read().await;
                let record = jobs
                    .get(&job_id)
                    .ok_or(OrchestratorError::JobNotFound(job_id))?;
                match record.status {
                    JobStatus::Succeeded => {
                        return record.result.clone().ok_or(OrchestratorError::JobFailed {
                            job_id,
                            reason: "job succeeded but its result is missing".to_string(),
                        });
                    }
                    JobStatus::Failed | JobStatus::Cancelled | JobStatus::TimedOut => {
                        let reason = record
                            .error
                            .clone()
                            .unwrap_or_else(|| record.status.to_string());
                        return Err(OrchestratorError::JobFailed { job_id, reason });
                    }
                    JobStatus::Pending | JobStatus::Running => {}
                }
            }

            let waited = started.elapsed();
            if waited >= options.timeout {
                return Err(OrchestratorError::JobTimedOut { job_id, waited });
            }
            let nap = options.poll_interval.min(options.timeout - waited);
            match cancel.as_mut() {
                Some(token) => {
                    tokio::select! {
                        _ = sleep(nap) => {}
                        _ = token.cancelled() => {
                            return Err(OrchestratorError::WaitCancelled(job_id));
                        }
                    }
                }
                None => sleep(nap).await,
            }
        }
    }

    /// Cancel a pending or running job.
    ///
    /// Returns `true` when the job was cancelled by this call, `false` when
    /// it had already reached a terminal status.
    pub async fn cancel(&self, job_id: JobId) -> Result<bool, OrchestratorError> {
        let kind = {
            let mut jobs = self.jobs.write().await;
            let record = jobs
                .get_mut(&job_id)
                .ok_or(OrchestratorError::JobNotFound(job_id))?;
            if !record.transition(JobStatus::Cancelled) {
                return Ok(false);
            }
            record.error = Some("cancelled by caller".to_string());
            record.kind
        };
        if let Some(handle) = self.handles.lock().await.remove(&job_id) {
            handle.abort();
        }
        self.emit(job_id, kind, JobStatus::Cancelled, "cancelled by caller");
        Ok(true)
    }

    /// Remove terminal job records whose completion is older than
    /// `older_than`. Returns the number of records reclaimed.
    pub async fn reclaim_finished(&self, older_than: Duration) -> usize {
        let Ok(delta) = chrono::Duration::from_std(older_than) else {
            return 0;
        };
        let Some(cutoff) = chrono::Utc::now().checked_sub_signed(delta) else {
            return 0;
        };
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, record| {
            !(record.status.is_terminal()
                && record.finished_at.is_some_and(|finished| finished < cutoff))
        });
        let reclaimed = before - jobs.len();
        if reclaimed > 0 {
            debug!(reclaimed, "reclaimed finished job records");
        }
        reclaimed
    }

    fn emit(&self, id: JobId, kind: JobKind, status: JobStatus, message: &str) {
        Self::emit_with(&self.sender, id, kind, status, message);
    }

    fn emit_with(
        sender: &flume::Sender<Event>,
        id: JobId,
        kind: JobKind,
        status: JobStatus,
        message: &str,
    ) {
        if sender.send(Event::job(id, kind, status, message)).is_err() {
            debug!(job_id = %id, "event bus receiver gone, dropping job event");
        }
    }

    /// Body of the spawned per-job task.
    #[allow(clippy::too_many_arguments)]
    async fn execute(
        jobs: JobTable,
        handles: HandleTable,
        ingestion: Arc<IngestionPipeline>,
        query: Arc<QueryPipeline>,
        sender: flume::Sender<Event>,
        execution_timeout: Option<Duration>,
        id: JobId,
        payload: JobPayload,
    ) {
        let kind = payload.kind();

        // A cancel that raced the dispatch wins; do not run the pipeline.
        let dispatched = {
            let mut table = jobs.write().await;
            table
                .get_mut(&id)
                .is_some_and(|record| record.transition(JobStatus::Running))
        };
        if !dispatched {
            handles.lock().await.remove(&id);
            return;
        }
        Self::emit_with(&sender, id, kind, JobStatus::Running, "dispatched");

        let run = async {
            match payload {
                JobPayload::IngestDocument { document } => {
                    ingestion.ingest(&document).await.map(JobResult::Ingest)
                }
                JobPayload::Query { question, top_k } => {
                    query.query(&question, top_k).await.map(JobResult::Query)
                }
            }
        };

        let outcome: Option<Result<JobResult, RagError>> = match execution_timeout {
            Some(deadline) => timeout(deadline, run).await.ok(),
            None => Some(run.await),
        };

        let mut table = jobs.write().await;
        if let Some(record) = table.get_mut(&id) {
            match outcome {
                Some(Ok(result)) => {
                    if record.transition(JobStatus::Succeeded) {
                        record.result = Some(result);
                        Self::emit_with(&sender, id, kind, JobStatus::Succeeded, "completed");
                    }
                }
                Some(Err(err)) => {
                    if record.transition(JobStatus::Failed) {
                        record.error = Some(err.to_string());
                        Self::emit_with(&sender, id, kind, JobStatus::Failed, &err.to_string());
                    }
                }
                None => {
                    if record.transition(JobStatus::TimedOut) {
                        record.error = Some("execution deadline exceeded".to_string());
                        Self::emit_with(
                            &sender,
                            id,
                            kind,
                            JobStatus::TimedOut,
                            "execution deadline exceeded",
                        );
                    }
                }
            }
        }
        drop(table);
        handles.lock().await.remove(&id);
    }
}

/// Builder wiring pipelines and the event bus into a [`JobOrchestrator`].
#[derive(Default)]
pub struct JobOrchestratorBuilder {
    ingestion: Option<Arc<IngestionPipeline>>,
    query: Option<Arc<QueryPipeline>>,
    event_bus: Option<EventBus>,
    execution_timeout: Option<Duration>,
}

impl JobOrchestratorBuilder {
    #[must_use]
    pub fn ingestion(mut self, pipeline: Arc<IngestionPipeline>) -> Self {
        self.ingestion = Some(pipeline);
        self
    }

    #[must_use]
    pub fn query(mut self, pipeline: Arc<QueryPipeline>) -> Self {
        self.query = Some(pipeline);
        self
    }

    /// Replace the default stdout event bus.
    #[must_use]
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Give every job an execution deadline; a job still running past it is
    /// marked `TimedOut`. Off by default.
    #[must_use]
    pub fn execution_timeout(mut self, deadline: Duration) -> Self {
        self.execution_timeout = Some(deadline);
        self
    }

    /// Build the orchestrator and start the event listener.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] when a pipeline is missing.
    pub fn build(self) -> Result<JobOrchestrator, RagError> {
        let ingestion = self.ingestion.ok_or_else(|| {
            RagError::Configuration("ingestion pipeline is required".to_string())
        })?;
        let query = self
            .query
            .ok_or_else(|| RagError::Configuration("query pipeline is required".to_string()))?;
        let event_bus = self.event_bus.unwrap_or_default();
        event_bus.listen_for_events();
        let sender = event_bus.get_sender();
        Ok(JobOrchestrator {
            ingestion,
            query,
            jobs: Arc::new(RwLock::new(FxHashMap::default())),
            handles: Arc::new(Mutex::new(FxHashMap::default())),
            event_bus,
            sender,
            execution_timeout: self.execution_timeout,
        })
    }
}
