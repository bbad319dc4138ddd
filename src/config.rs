use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::loader::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATOR};
use crate::loader::CharacterTextSplitter;

/// Environment variable holding the hosted API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Which embedder builds the knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Hosted embeddings endpoint
    #[default]
    OpenAi,
    /// Local all-MiniLM-L6-v2 model
    Local,
}

/// Which completion endpoint answers questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionApi {
    /// Legacy `/completions` with a plain prompt
    #[default]
    Completions,
    /// `/chat/completions` with the prompt as a single user message
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub separator: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn splitter(&self) -> crate::Result<CharacterTextSplitter> {
        CharacterTextSplitter::with_settings(&self.separator, self.chunk_size, self.chunk_overlap)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Dashboard sessions idle for longer than this are dropped
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
            max_upload_bytes: 32 * 1024 * 1024,
            session_ttl_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AskdocConfig {
    pub api_base: String,
    pub embedder: EmbedderKind,
    pub embedding_model: String,
    pub completion_model: String,
    pub completion_api: CompletionApi,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: usize,
    pub request_timeout_secs: u64,
    pub chunking: ChunkingConfig,
    pub server: ServerConfig,
}

impl Default for AskdocConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            embedder: EmbedderKind::OpenAi,
            embedding_model: "text-embedding-ada-002".to_string(),
            completion_model: "gpt-3.5-turbo-instruct".to_string(),
            completion_api: CompletionApi::Completions,
            temperature: 0.4,
            max_tokens: 256,
            top_k: 4,
            request_timeout_secs: 120,
            chunking: ChunkingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("askdoc.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("askdoc.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<AskdocConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AskdocConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &AskdocConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// API key from the command line, falling back to the environment
pub fn resolve_api_key(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("askdoc.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("askdoc.toml");
        std::fs::write(
            &path,
            "embedder = \"local\"\ntop_k = 2\n\n[chunking]\nchunk_size = 500\n\n[server]\nport = 9000\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.embedder, EmbedderKind::Local);
        assert_eq!(config.top_k, 2);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, DEFAULT_CHUNK_OVERLAP);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.completion_model, "gpt-3.5-turbo-instruct");
    }

    #[test]
    fn test_write_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("askdoc.toml");
        let config = AskdocConfig::default();

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let reloaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_explicit_api_key_wins() {
        assert_eq!(resolve_api_key(Some(" sk-test ")).as_deref(), Some("sk-test"));
    }
}
