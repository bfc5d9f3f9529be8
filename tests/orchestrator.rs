//! Job orchestration: submission, polling, timeouts, cancellation, events.

use std::sync::Arc;
use std::time::Duration;

use ragline::event_bus::{Event, EventBus, MemorySink};
use ragline::generation::StaticAnswerGenerator;
use ragline::jobs::{
    AwaitOptions, JobOrchestrator, JobPayload, JobResult, JobStatus, OrchestratorError,
    cancel_pair,
};
use ragline::pipelines::{IngestionPipeline, NO_ANSWER, QueryPipeline};
use ragline::stores::{InMemoryVectorStore, VectorStore};
use ragline::types::Document;

mod common;
use common::{SlowEmbeddings, TEST_ANSWER, harness, harness_with_embedder, test_config};

fn ingest_payload(source: &str, text: &str) -> JobPayload {
    JobPayload::IngestDocument {
        document: Document::new(source, text),
    }
}

fn query_payload(question: &str, top_k: usize) -> JobPayload {
    JobPayload::Query {
        question: question.to_string(),
        top_k,
    }
}

fn fast_await() -> AwaitOptions {
    AwaitOptions::new(Duration::from_secs(10), Duration::from_millis(10))
}

#[tokio::test]
async fn ingest_and_query_jobs_complete_end_to_end() {
    let h = harness();

    let ingest = h
        .orchestrator
        .submit(ingest_payload(
            "animals.txt",
            "Cats are mammals. Dogs are mammals too.",
        ))
        .await;
    let result = h.orchestrator.await_result(ingest, fast_await()).await.unwrap();
    let payload = result.transport_payload();
    assert_eq!(payload["status"], "ok");
    assert!(payload["detail"].as_str().unwrap().contains("animals.txt"));

    let query = h.orchestrator.submit(query_payload("What are cats?", 5)).await;
    let result = h.orchestrator.await_result(query, fast_await()).await.unwrap();
    match result {
        JobResult::Query(answer) => {
            assert_eq!(answer.answer, TEST_ANSWER);
            assert_eq!(answer.sources, vec!["animals.txt"]);
        }
        other => panic!("expected a query result, got {other:?}"),
    }

    assert_eq!(
        h.orchestrator.status(ingest).await.unwrap(),
        JobStatus::Succeeded
    );
    assert_eq!(
        h.orchestrator.status(query).await.unwrap(),
        JobStatus::Succeeded
    );
}

#[tokio::test]
async fn query_job_against_empty_index_returns_sentinel() {
    let h = harness();

    let job = h.orchestrator.submit(query_payload("anything?", 5)).await;
    let result = h.orchestrator.await_result(job, fast_await()).await.unwrap();
    match result {
        JobResult::Query(answer) => {
            assert_eq!(answer.answer, NO_ANSWER);
            assert!(answer.sources.is_empty());
        }
        other => panic!("expected a query result, got {other:?}"),
    }
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn caller_timeout_leaves_the_job_running() {
    let h = harness_with_embedder(Arc::new(SlowEmbeddings::new(Duration::from_millis(400))));

    let job = h.orchestrator.submit(query_payload("slow one", 5)).await;

    // First wait is shorter than the pipeline's work and must give up.
    let err = h
        .orchestrator
        .await_result(
            job,
            AwaitOptions::new(Duration::from_millis(50), Duration::from_millis(10)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::JobTimedOut { .. }));

    // The job itself was not cancelled by the caller-side timeout.
    let status = h.orchestrator.status(job).await.unwrap();
    assert!(
        matches!(status, JobStatus::Pending | JobStatus::Running),
        "job must keep executing, saw {status}"
    );

    // A later poll on the same id observes the eventual result.
    let result = h.orchestrator.await_result(job, fast_await()).await.unwrap();
    assert!(matches!(result, JobResult::Query(_)));
    assert_eq!(
        h.orchestrator.status(job).await.unwrap(),
        JobStatus::Succeeded
    );
}

#[tokio::test]
async fn wait_cancellation_stops_polling_not_the_job() {
    let h = harness_with_embedder(Arc::new(SlowEmbeddings::new(Duration::from_millis(200))));

    let job = h.orchestrator.submit(query_payload("cancel the wait", 5)).await;

    let (handle, token) = cancel_pair();
    handle.cancel();
    let err = h
        .orchestrator
        .await_result(
            job,
            AwaitOptions::new(Duration::from_secs(10), Duration::from_millis(10))
                .with_cancel(token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::WaitCancelled(_)));

    // The job itself still runs to completion.
    let result = h.orchestrator.await_result(job, fast_await()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn cancelling_a_running_job_is_terminal() {
    let h = harness_with_embedder(Arc::new(SlowEmbeddings::new(Duration::from_millis(500))));

    let job = h.orchestrator.submit(query_payload("to be cancelled", 5)).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(h.orchestrator.cancel(job).await.unwrap());
    let err = h.orchestrator.await_result(job, fast_await()).await.unwrap_err();
    match err {
        OrchestratorError::JobFailed { reason, .. } => {
            assert!(reason.contains("cancelled"), "reason was {reason:?}")
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }

    // Status never regresses out of Cancelled, even after the pipeline's
    // original deadline would have elapsed.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(
        h.orchestrator.status(job).await.unwrap(),
        JobStatus::Cancelled
    );

    // Cancelling again reports that nothing was done.
    assert!(!h.orchestrator.cancel(job).await.unwrap());
}

#[tokio::test]
async fn concurrent_ingestions_index_both_documents() {
    let h = harness();

    let first = h
        .orchestrator
        .submit(ingest_payload("cats.txt", "Cats purr when content."))
        .await;
    let second = h
        .orchestrator
        .submit(ingest_payload("dogs.txt", "Dogs bark at strangers."))
        .await;

    let (a, b) = tokio::join!(
        h.orchestrator.await_result(first, fast_await()),
        h.orchestrator.await_result(second, fast_await()),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(h.store.count(&h.config.collection).await.unwrap(), 2);

    let query = h.orchestrator.submit(query_payload("pets", 10)).await;
    let result = h.orchestrator.await_result(query, fast_await()).await.unwrap();
    if let JobResult::Query(answer) = result {
        let mut sources = answer.sources;
        sources.sort();
        assert_eq!(sources, vec!["cats.txt", "dogs.txt"]);
    } else {
        panic!("expected a query result");
    }
}

#[tokio::test]
async fn job_execution_deadline_marks_the_job_timed_out() {
    let config = test_config();
    let embedder = Arc::new(SlowEmbeddings::new(Duration::from_millis(500)));
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(StaticAnswerGenerator::new(TEST_ANSWER));
    let orchestrator = JobOrchestrator::builder()
        .ingestion(Arc::new(
            IngestionPipeline::new(embedder.clone(), store.clone(), config.clone()).unwrap(),
        ))
        .query(Arc::new(
            QueryPipeline::new(embedder, store, generator, config).unwrap(),
        ))
        .execution_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let job = orchestrator.submit(query_payload("too slow", 5)).await;
    let err = orchestrator.await_result(job, fast_await()).await.unwrap_err();
    match err {
        OrchestratorError::JobFailed { reason, .. } => {
            assert!(reason.contains("deadline"), "reason was {reason:?}")
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
    assert_eq!(
        orchestrator.status(job).await.unwrap(),
        JobStatus::TimedOut
    );
}

#[tokio::test]
async fn lifecycle_events_reach_the_bus_in_order() {
    let sink = MemorySink::new();
    let config = test_config();
    let embedder = Arc::new(ragline::embeddings::MockEmbeddingProvider::new());
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(StaticAnswerGenerator::new(TEST_ANSWER));
    let orchestrator = JobOrchestrator::builder()
        .ingestion(Arc::new(
            IngestionPipeline::new(embedder.clone(), store.clone(), config.clone()).unwrap(),
        ))
        .query(Arc::new(
            QueryPipeline::new(embedder, store, generator, config).unwrap(),
        ))
        .event_bus(EventBus::with_sink(sink.clone()))
        .build()
        .unwrap();

    let job = orchestrator
        .submit(ingest_payload("a.txt", "One small document."))
        .await;
    orchestrator.await_result(job, fast_await()).await.unwrap();

    // Give the listener a moment to drain before inspecting the sink.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let statuses: Vec<JobStatus> = sink
        .snapshot()
        .into_iter()
        .filter_map(|event| match event {
            Event::Job(job_event) if job_event.job_id == job => Some(job_event.status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Pending, JobStatus::Running, JobStatus::Succeeded],
        "exactly one dispatch and one terminal transition per job"
    );
}

#[tokio::test]
async fn unknown_job_ids_are_reported() {
    let h = harness();
    let bogus = uuid::Uuid::new_v4();
    assert!(matches!(
        h.orchestrator.status(bogus).await.unwrap_err(),
        OrchestratorError::JobNotFound(_)
    ));
    assert!(matches!(
        h.orchestrator.await_result(bogus, fast_await()).await.unwrap_err(),
        OrchestratorError::JobNotFound(_)
    ));
}

#[tokio::test]
async fn finished_jobs_are_reclaimable() {
    let h = harness();
    let job = h
        .orchestrator
        .submit(ingest_payload("a.txt", "Reclaim me afterwards."))
        .await;
    h.orchestrator.await_result(job, fast_await()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let reclaimed = h.orchestrator.reclaim_finished(Duration::ZERO).await;
    assert_eq!(reclaimed, 1);
    assert!(matches!(
        h.orchestrator.status(job).await.unwrap_err(),
        OrchestratorError::JobNotFound(_)
    ));
    assert_eq!(h.orchestrator.job_count().await, 0);
}
