//! Answer generation capability boundary.
//!
//! [`AnswerGenerator`] is the seam between retrieval and the language model:
//! given a question and assembled context, produce a natural-language
//! answer. The pipeline treats it as a black box; no streaming contract is
//! required at this level.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::OllamaConfig;
use crate::types::RagError;

/// Capability interface for answer generation.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Produce an answer for `question` grounded in `context`.
    ///
    /// # Errors
    ///
    /// [`RagError::ProviderUnavailable`] when the backing model service
    /// cannot be reached.
    async fn generate(&self, question: &str, context: &str) -> Result<String, RagError>;
}

/// Test double returning a canned answer and counting invocations.
///
/// The call counter lets tests assert that the generator was *not* invoked
/// on the empty-retrieval path.
#[derive(Debug)]
pub struct StaticAnswerGenerator {
    answer: String,
    calls: AtomicUsize,
}

impl StaticAnswerGenerator {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times [`generate`](AnswerGenerator::generate) was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerGenerator for StaticAnswerGenerator {
    async fn generate(&self, _question: &str, _context: &str) -> Result<String, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

/// Generator backed by the Ollama `/api/generate` endpoint (non-streaming).
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    /// Build a generator for the configured endpoint and chat model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &OllamaConfig) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| RagError::Configuration(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
        })
    }

    fn prompt(question: &str, context: &str) -> String {
        format!(
            "Answer the question using only the context below. \
             If the context does not contain the answer, say so.\n\n\
             Context:\n{context}\n\nQuestion: {question}\n\nAnswer:"
        )
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String, RagError> {
        let unavailable = |message: String| RagError::ProviderUnavailable {
            provider: "ollama-generate",
            message,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "prompt": Self::prompt(question, context),
                "stream": false,
            }))
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?
            .error_for_status()
            .map_err(|err| unavailable(err.to_string()))?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| unavailable(format!("malformed generate response: {err}")))?;

        debug!(model = %self.model, answer_len = body.response.len(), "generated answer");
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_generator_counts_calls() {
        let generator = StaticAnswerGenerator::new("canned");
        assert_eq!(generator.calls(), 0);
        let answer = generator.generate("q", "ctx").await.unwrap();
        assert_eq!(answer, "canned");
        assert_eq!(generator.calls(), 1);
    }

    #[test]
    fn prompt_embeds_question_and_context() {
        let prompt = OllamaGenerator::prompt("why?", "because.");
        assert!(prompt.contains("Question: why?"));
        assert!(prompt.contains("because."));
    }
}
