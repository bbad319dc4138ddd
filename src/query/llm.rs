use async_trait::async_trait;

use crate::Result;

/// A hosted text model that continues a prompt
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete `prompt`, returning the reply without surrounding whitespace
    async fn complete(&self, prompt: &str) -> Result<String>;
}
