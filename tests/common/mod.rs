#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use ragline::config::RagConfig;
use ragline::embeddings::{EmbeddingProvider, MockEmbeddingProvider};
use ragline::generation::StaticAnswerGenerator;
use ragline::jobs::JobOrchestrator;
use ragline::pipelines::{IngestionPipeline, QueryPipeline};
use ragline::stores::InMemoryVectorStore;
use ragline::types::RagError;

pub const TEST_ANSWER: &str = "Cats are small domesticated mammals.";

/// Small chunks and fast retries so suites stay quick.
pub fn test_config() -> RagConfig {
    RagConfig::builder()
        .collection("test-docs")
        .chunk_size(200)
        .chunk_overlap(40)
        .top_k(5)
        .transient_retries(2)
        .retry_base_delay(Duration::from_millis(5))
        .build()
        .unwrap()
}

/// Embedding provider that fails its first `failures` batch calls with a
/// transient error, then delegates to the deterministic mock.
pub struct FlakyEmbeddings {
    inner: MockEmbeddingProvider,
    remaining_failures: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyEmbeddings {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: MockEmbeddingProvider::new(),
            remaining_failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbeddings {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(RagError::ProviderUnavailable {
                provider: "flaky-test",
                message: "synthetic outage".to_string(),
            });
        }
        self.inner.embed_batch(texts).await
    }
}

/// Embedding provider that sleeps before every batch call, to make job
/// execution observably slower than a caller-side wait.
pub struct SlowEmbeddings {
    inner: MockEmbeddingProvider,
    delay: Duration,
}

impl SlowEmbeddings {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockEmbeddingProvider::new(),
            delay,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for SlowEmbeddings {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_batch(texts).await
    }
}

/// Everything a suite needs to drive jobs end to end.
pub struct Harness {
    pub orchestrator: JobOrchestrator,
    pub store: Arc<InMemoryVectorStore>,
    pub generator: Arc<StaticAnswerGenerator>,
    pub config: RagConfig,
}

/// Build an orchestrator over an in-memory store with the given embedding
/// provider.
pub fn harness_with_embedder(embedder: Arc<dyn EmbeddingProvider>) -> Harness {
    let config = test_config();
    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(StaticAnswerGenerator::new(TEST_ANSWER));

    let ingestion = Arc::new(
        IngestionPipeline::new(embedder.clone(), store.clone(), config.clone()).unwrap(),
    );
    let query = Arc::new(
        QueryPipeline::new(embedder, store.clone(), generator.clone(), config.clone()).unwrap(),
    );
    let orchestrator = JobOrchestrator::builder()
        .ingestion(ingestion)
        .query(query)
        .build()
        .unwrap();

    Harness {
        orchestrator,
        store,
        generator,
        config,
    }
}

/// Harness with the stock deterministic mock embedder.
pub fn harness() -> Harness {
    harness_with_embedder(Arc::new(MockEmbeddingProvider::new()))
}
