//! # askdoc - Ask your PDF
//!
//! Chat with a document: load a PDF, text or Word file (or a URL pointing to
//! one), split it into overlapping chunks, embed the chunks into an in-memory
//! vector index and answer questions by stuffing the closest chunks into a
//! prompt for a hosted language model.
//!
//! askdoc provides:
//! - Loaders for local files and URLs with text extraction
//! - A fixed-size, overlap-based character splitter
//! - Pluggable embedders (hosted API or local model) and language models
//! - An in-memory knowledge base with similarity search, persistable to SQLite
//! - A web server with a single-page form and a session-backed dashboard

pub mod document;
pub mod loader;
pub mod query;
pub mod storage;
pub mod server;
pub mod output;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use document::{Chunk, Document, DocumentKind};
pub use loader::CharacterTextSplitter;
pub use query::{Answer, Embedder, KnowledgeBase, LanguageModel, StuffChain};
pub use storage::SqliteStore;

/// Result type alias for askdoc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for askdoc operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Please enter a valid URL ({0})")]
    InvalidUrl(String),

    #[error("Check the url of your file; returned status code {0}")]
    DownloadStatus(u16),

    #[error("Could not download your file: {0}")]
    Download(String),

    #[error("The file is larger than the {0} byte limit")]
    TooLarge(usize),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("No text could be extracted from {0}")]
    EmptyDocument(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("An OpenAI API key is required")]
    MissingApiKey,

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}
