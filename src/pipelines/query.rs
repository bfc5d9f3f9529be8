//! Query execution: embed → search → assemble context → generate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::RagConfig;
use crate::embeddings::EmbeddingProvider;
use crate::generation::AnswerGenerator;
use crate::retry::retry_transient;
use crate::stores::{DistanceMetric, VectorStore};
use crate::types::RagError;

/// Sentinel answer returned when retrieval comes back empty.
///
/// On that path the answer generator is never invoked, so an empty index
/// cannot produce a hallucinated answer.
pub const NO_ANSWER: &str = "No answer found in the indexed documents.";

/// Result of one query: the generated answer plus the deduplicated sources
/// that grounded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

impl QueryAnswer {
    /// Returns `true` when this is the empty-retrieval sentinel.
    #[must_use]
    pub fn is_no_answer(&self) -> bool {
        self.answer == NO_ANSWER
    }
}

/// Orchestrates question answering over the indexed corpus.
///
/// Zero retrieved sources is a defined successful outcome (the sentinel),
/// never a failure; the pipeline only fails on provider or store
/// unavailability and on malformed parameters.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn AnswerGenerator>,
    config: RagConfig,
}

impl QueryPipeline {
    /// Build a pipeline from its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] when `config` is inconsistent.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn AnswerGenerator>,
        config: RagConfig,
    ) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self {
            embedder,
            store,
            generator,
            config,
        })
    }

    /// The collection this pipeline searches.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Answer `question` from the `top_k` most relevant chunks.
    ///
    /// # Errors
    ///
    /// [`RagError::Configuration`] when `top_k` is zero; transient provider
    /// or store failures after retries are exhausted.
    #[instrument(skip(self, question), err)]
    pub async fn query(&self, question: &str, top_k: usize) -> Result<QueryAnswer, RagError> {
        if top_k == 0 {
            return Err(RagError::Configuration(
                "top_k must be greater than zero".to_string(),
            ));
        }
        let retries = self.config.transient_retries;
        let delay = self.config.retry_base_delay;

        self.store
            .ensure_collection(
                &self.config.collection,
                self.embedder.dimension(),
                DistanceMetric::Cosine,
            )
            .await?;

        let query_vector =
            retry_transient(retries, delay, || self.embedder.embed(question)).await?;

        let retrieval = retry_transient(retries, delay, || {
            self.store
                .search(&self.config.collection, &query_vector, top_k)
        })
        .await?;

        if retrieval.is_empty() {
            info!("empty retrieval, returning sentinel answer");
            return Ok(QueryAnswer {
                answer: NO_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = assemble_context(&retrieval.contexts, self.config.context_budget);
        let answer = retry_transient(retries, delay, || {
            self.generator.generate(question, &context)
        })
        .await?;

        info!(
            contexts = retrieval.contexts.len(),
            sources = retrieval.sources.len(),
            "query answered"
        );
        Ok(QueryAnswer {
            answer,
            sources: retrieval.sources,
        })
    }
}

/// Join ranked contexts under a character budget.
///
/// Contexts are taken in rank order until the budget is hit, so the
/// lowest-ranked contexts are dropped first. The top-ranked context is
/// always included, truncated to the budget if it alone exceeds it.
fn assemble_context(contexts: &[String], budget: usize) -> String {
    const SEPARATOR: &str = "\n\n";

    let mut assembled = String::new();
    for (rank, context) in contexts.iter().enumerate() {
        let chars = context.chars().count();
        if rank == 0 {
            if chars > budget {
                assembled.extend(context.chars().take(budget));
            } else {
                assembled.push_str(context);
            }
            continue;
        }
        let used = assembled.chars().count();
        if used + SEPARATOR.len() + chars > budget {
            break;
        }
        assembled.push_str(SEPARATOR);
        assembled.push_str(context);
    }
    assembled
}
