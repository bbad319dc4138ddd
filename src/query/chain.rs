//! Stuffed QA chain
//!
//! All retrieved chunks are concatenated into a single prompt, followed by
//! the question, and sent to the model in one call.

use serde::Serialize;

use crate::query::embedding::Embedder;
use crate::query::engine::{KnowledgeBase, ScoredChunk, DEFAULT_TOP_K};
use crate::query::llm::LanguageModel;
use crate::Result;

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Reply shown by the dashboard before any file is loaded
pub const NO_DOCUMENT_ANSWER: &str = "Please upload a file first";

/// Model answer and the chunks it was given
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ScoredChunk>,
}

/// Retrieve-then-answer over a knowledge base
pub struct StuffChain {
    top_k: usize,
}

impl Default for StuffChain {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl StuffChain {
    pub fn new(top_k: usize) -> Self {
        Self { top_k: top_k.max(1) }
    }

    /// Build the prompt for a question and its retrieved chunks
    pub fn build_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
        let context = chunks
            .iter()
            .map(|c| c.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
            PROMPT_PREAMBLE, context, question
        )
    }

    /// Embed the question, find the closest chunks and ask the model
    pub async fn answer(
        &self,
        knowledge_base: &KnowledgeBase,
        question: &str,
        embedder: &dyn Embedder,
        llm: &dyn LanguageModel,
    ) -> Result<Answer> {
        let query_vector = embedder.embed_query(question).await?;
        let sources = knowledge_base.similarity_search(&query_vector, self.top_k)?;
        tracing::debug!(
            "Retrieved {} chunks for question ({} chars)",
            sources.len(),
            question.len()
        );

        let prompt = Self::build_prompt(question, &sources);
        let text = llm.complete(&prompt).await?;
        tracing::info!("Answered with {} ({} chars)", llm.model_name(), text.len());

        Ok(Answer { text, sources })
    }
}
