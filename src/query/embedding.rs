use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::Result;

/// Turns text into vectors for the knowledge base
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Name of the model, recorded on every knowledge base it builds
    fn model_name(&self) -> &str;

    /// Embed a batch of chunk texts, one vector per input in order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single question
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(crate::Error::Embedding("Query embedding returned no vector".to_string()));
        }
        Ok(vectors.swap_remove(0))
    }
}

/// Engine for generating text embeddings using a local transformer model
pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

/// Name reported for the local model
pub const LOCAL_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Inputs per forward pass of the local model
const LOCAL_BATCH_SIZE: usize = 32;

impl LocalEmbedder {
    /// Load (downloading on first use) the default local model
    pub fn new() -> Result<Self> {
        let mut options = InitOptions::default();
        options.model_name = EmbeddingModel::AllMiniLML6V2;
        options.show_download_progress = true;

        let model = TextEmbedding::try_new(options)
            .map_err(|e| crate::Error::Embedding(format!("Failed to load embedding model: {}", e)))?;

        Ok(Self { model: Arc::new(Mutex::new(model)) })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        LOCAL_MODEL_NAME
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // inference is CPU bound, keep it off the async workers
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| crate::Error::Embedding("Embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, Some(LOCAL_BATCH_SIZE))
                .map_err(|e| crate::Error::Embedding(format!("Embedding generation failed: {}", e)))
        })
        .await
        .map_err(|e| crate::Error::Embedding(format!("Embedding task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // current_thread runtime: spawn_blocking must still make progress
    #[tokio::test]
    #[ignore] // Downloads the model on first run
    async fn test_local_embedder_embeds_on_blocking_pool() {
        let embedder = LocalEmbedder::new().unwrap();

        let texts = vec!["cats purr".to_string(), "dogs bark".to_string()];
        let vectors = embedder.embed_documents(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 384);

        let query = embedder.embed_query("cats").await.unwrap();
        assert_eq!(query.len(), 384);
    }

    #[tokio::test]
    #[ignore] // Downloads the model on first run
    async fn test_local_embedder_empty_batch() {
        let embedder = LocalEmbedder::new().unwrap();
        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }
}
