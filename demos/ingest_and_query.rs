//! End-to-end walkthrough over the in-memory store: submit an ingestion
//! job, poll it, then ask a question and print the answer with its sources,
//! streaming job lifecycle events along the way.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example ingest_and_query
//! ```

use std::sync::Arc;

use ragline::config::RagConfig;
use ragline::embeddings::MockEmbeddingProvider;
use ragline::event_bus::{Event, EventBus, MemorySink};
use ragline::generation::StaticAnswerGenerator;
use ragline::jobs::{AwaitOptions, JobOrchestrator, JobPayload};
use ragline::pipelines::{IngestionPipeline, QueryPipeline};
use ragline::stores::InMemoryVectorStore;
use ragline::types::Document;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ragline::telemetry::init();

    let config = RagConfig::builder()
        .collection("demo-docs")
        .chunk_size(400)
        .chunk_overlap(80)
        .build()?;

    let embedder = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(StaticAnswerGenerator::new(
        "Cats are small domesticated mammals that purr when content.",
    ));

    let ingestion = Arc::new(IngestionPipeline::new(
        embedder.clone(),
        store.clone(),
        config.clone(),
    )?);
    let query = Arc::new(QueryPipeline::new(embedder, store, generator, config)?);

    let bus = EventBus::with_sink(MemorySink::new());
    let mut events = bus.subscribe();
    let orchestrator = JobOrchestrator::builder()
        .ingestion(ingestion)
        .query(query)
        .event_bus(bus)
        .build()?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Event::Job(job) = event {
                println!("  event: {} {} -> {}", job.kind, job.job_id, job.status);
            }
        }
    });

    println!("ingesting...");
    let job = orchestrator
        .submit(JobPayload::IngestDocument {
            document: Document::new(
                "cats.txt",
                "Cats are mammals. They purr when content and sleep most of the day. \
                 Dogs are mammals too, though they rarely purr.",
            ),
        })
        .await;
    let receipt = orchestrator.await_result(job, AwaitOptions::default()).await?;
    println!("ingest result: {}", receipt.transport_payload());

    println!("querying...");
    let job = orchestrator
        .submit(JobPayload::Query {
            question: "What are cats?".to_string(),
            top_k: 5,
        })
        .await;
    let answer = orchestrator.await_result(job, AwaitOptions::default()).await?;
    println!("query result: {}", serde_json::to_string_pretty(&answer.transport_payload())?);

    Ok(())
}
