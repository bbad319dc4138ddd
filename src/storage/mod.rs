//! Storage Layer - SQLite-backed knowledge base files
//!
//! One database file holds one knowledge base:
//! - meta(key, value): source, embedding_model, content_hash, dimensions
//! - chunks(idx, content, source, vector)

pub mod schema;
pub mod sqlite;

pub use sqlite::{KbStats, SqliteStore};
