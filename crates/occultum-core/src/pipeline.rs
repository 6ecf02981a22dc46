//! Question answering pipeline
//!
//! query -> retrieval -> context budget -> prompt -> generation -> answer.
//! Every stage runs once per request; the first failure ends the request.

use crate::config::{Config, RetrievalConfig};
use crate::db::ScoredDocument;
use crate::error::{OccultumError, Result};
use crate::llm::{ChatClient, Generator};
use crate::prompt::{assemble, fit_context};
use crate::search::Retriever;
use serde::Serialize;
use std::sync::Arc;

/// Answer with the material it was grounded on
#[derive(Debug, Clone, Serialize)]
pub struct AnswerReport {
    pub answer: String,
    /// Retrieved passages that made it into the prompt, best first
    ///
    /// Passages dropped by the context budget are not listed; a cut first
    /// passage is listed with its full text.
    pub passages: Vec<ScoredDocument>,
    /// Exact prompt sent to the generation endpoint
    pub prompt: String,
}

/// Long-lived answering service
///
/// Built once at startup; `answer` may be called concurrently.
pub struct Pipeline {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    top_k: usize,
    max_context_chars: usize,
}

impl Pipeline {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            top_k: retrieval.top_k,
            max_context_chars: retrieval.max_context_chars,
        }
    }

    /// Open the store, load the embedder and connect the generation client
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let retriever = Retriever::from_config(config)?;
        let generator = Arc::new(ChatClient::new(&config.generation)?);
        tracing::info!(
            "Pipeline ready (embedder: {}, generator: {}, k={})",
            retriever.embedder().model_name(),
            generator.model_name(),
            config.retrieval.top_k
        );
        Ok(Self::new(retriever, generator, &config.retrieval))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `query`, returning the generated text unmodified
    pub async fn answer(&self, query: &str) -> Result<String> {
        Ok(self.answer_detailed(query).await?.answer)
    }

    /// Answer `query` and keep the passages and prompt used
    pub async fn answer_detailed(&self, query: &str) -> Result<AnswerReport> {
        if query.trim().is_empty() {
            return Err(OccultumError::InvalidQuery(
                "the question is empty".to_string(),
            ));
        }

        let mut passages = self.retriever.retrieve_scored(query, self.top_k).await?;
        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        let context = fit_context(&texts, self.max_context_chars);
        let prompt = assemble(&context, query);

        tracing::debug!(
            "Prompt built from {} of {} passages ({} chars)",
            context.len(),
            passages.len(),
            prompt.chars().count()
        );

        passages.truncate(context.len());
        let answer = self.generator.generate(&prompt).await?;
        Ok(AnswerReport {
            answer,
            passages,
            prompt,
        })
    }
}
