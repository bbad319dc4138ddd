//! Deterministic stand-ins for the hosted models

use async_trait::async_trait;

use crate::query::embedding::Embedder;
use crate::query::llm::LanguageModel;
use crate::Result;

/// Embeds text as keyword occurrence counts, one dimension per keyword
pub(crate) struct KeywordEmbedder {
    keywords: Vec<String>,
}

impl KeywordEmbedder {
    pub(crate) fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .map(|k| lower.matches(k.as_str()).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Replies with the prompt it was given
pub(crate) struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    fn model_name(&self) -> &str {
        "echo-test"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(prompt.trim().to_string())
    }
}
