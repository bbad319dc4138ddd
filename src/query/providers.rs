use std::sync::Arc;

use crate::config::{AskdocConfig, EmbedderKind};
use crate::query::embedding::{Embedder, LocalEmbedder};
use crate::query::llm::LanguageModel;
use crate::query::openai::{http_client, OpenAiClient};
use crate::{Error, Result};

/// Builds the models for a request from the caller's API key
pub trait ProviderFactory: Send + Sync {
    fn embedder(&self, api_key: Option<&str>) -> Result<Arc<dyn Embedder>>;
    fn language_model(&self, api_key: Option<&str>) -> Result<Arc<dyn LanguageModel>>;
}

/// Hosted OpenAI models, with the local embedder when configured
pub struct OpenAiProviders {
    config: AskdocConfig,
    http: reqwest::Client,
    default_api_key: Option<String>,
    local: Option<Arc<LocalEmbedder>>,
}

impl OpenAiProviders {
    /// `default_api_key` is used when a caller does not supply one
    pub fn new(config: AskdocConfig, default_api_key: Option<String>) -> Result<Self> {
        let local = match config.embedder {
            EmbedderKind::Local => {
                tracing::info!("Loading local embedding model");
                Some(Arc::new(LocalEmbedder::new()?))
            }
            EmbedderKind::OpenAi => None,
        };

        tracing::info!(
            "OpenAI provider configured: endpoint={}, embeddings={}, completions={}",
            config.api_base, config.embedding_model, config.completion_model
        );

        Ok(Self {
            http: http_client(&config)?,
            config,
            default_api_key,
            local,
        })
    }

    fn client(&self, api_key: Option<&str>) -> Result<OpenAiClient> {
        let key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or(self.default_api_key.as_deref())
            .ok_or(Error::MissingApiKey)?;
        OpenAiClient::with_client(self.http.clone(), &self.config, key)
    }
}

impl ProviderFactory for OpenAiProviders {
    fn embedder(&self, api_key: Option<&str>) -> Result<Arc<dyn Embedder>> {
        if let Some(local) = &self.local {
            return Ok(local.clone());
        }
        Ok(Arc::new(self.client(api_key)?))
    }

    fn language_model(&self, api_key: Option<&str>) -> Result<Arc<dyn LanguageModel>> {
        Ok(Arc::new(self.client(api_key)?))
    }
}
