//! Client for an OpenAI-compatible hosted API
//!
//! One client serves both halves of the pipeline: `/embeddings` for the
//! knowledge base and `/completions` (or `/chat/completions`) for answers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AskdocConfig, CompletionApi};
use crate::query::embedding::Embedder;
use crate::query::llm::LanguageModel;
use crate::{Error, Result};

/// Inputs per embeddings request
const EMBEDDING_BATCH_SIZE: usize = 100;

// --- OpenAI-compatible serde structs ---

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client with the configured request timeout
pub fn http_client(config: &AskdocConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?)
}

/// Client for the hosted embeddings and completion endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    embedding_model: String,
    completion_model: String,
    completion_api: CompletionApi,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Create a client from the configuration and an API key
    pub fn new(config: &AskdocConfig, api_key: &str) -> Result<Self> {
        Self::with_client(http_client(config)?, config, api_key)
    }

    /// Create a client on an existing connection pool
    pub fn with_client(client: Client, config: &AskdocConfig, api_key: &str) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: config.api_base.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            completion_model: config.completion_model.clone(),
            completion_api: config.completion_api,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[cfg(test)]
    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> Result<R> {
        let response = self
            .client
            .post(format!("{}{}", self.endpoint, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| {
                    if text.is_empty() {
                        status.canonical_reason().unwrap_or("request failed").to_string()
                    } else {
                        text
                    }
                });
            return Err(Error::Provider {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<R>().await?)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let mut response: EmbeddingResponse = self.post("/embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.embedding_model
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            debug!("Embedding batch of {} texts", batch.len());
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.completion_model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let text = match self.completion_api {
            CompletionApi::Completions => {
                let request = CompletionRequest {
                    model: &self.completion_model,
                    prompt,
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                };
                let response: CompletionResponse = self.post("/completions", &request).await?;
                response.choices.into_iter().next().map(|c| c.text)
            }
            CompletionApi::Chat => {
                let request = ChatRequest {
                    model: &self.completion_model,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                };
                let response: ChatResponse = self.post("/chat/completions", &request).await?;
                response.choices.into_iter().next().and_then(|c| c.message.content)
            }
        };

        Ok(text.unwrap_or_default().trim().to_string())
    }
}
