//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, params, OptionalExtension};
use serde::Serialize;
use crate::Result;
use crate::document::Chunk;
use crate::query::KnowledgeBase;
use super::schema;

/// SQLite-backed storage for a knowledge base
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Meta Operations ==========

    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Hash and embedding model of the stored knowledge base, if any
    pub fn fingerprint(&self) -> Result<Option<(String, String)>> {
        let hash = self.get_meta(schema::META_CONTENT_HASH)?;
        let model = self.get_meta(schema::META_EMBEDDING_MODEL)?;
        Ok(hash.zip(model))
    }

    // ========== Knowledge Base Operations ==========

    /// Replace the stored knowledge base
    pub fn save_knowledge_base(&mut self, kb: &KnowledgeBase) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM meta", [])?;

        {
            let mut meta = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
            meta.execute(params![schema::META_SOURCE, kb.source()])?;
            meta.execute(params![schema::META_EMBEDDING_MODEL, kb.embedding_model()])?;
            meta.execute(params![schema::META_CONTENT_HASH, kb.content_hash()])?;
            meta.execute(params![schema::META_DIMENSIONS, kb.dimensions().to_string()])?;

            let mut insert = tx.prepare(
                "INSERT INTO chunks (idx, content, source, vector) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (chunk, vector) in kb.iter() {
                insert.execute(params![
                    chunk.index as i64,
                    chunk.content,
                    chunk.source,
                    encode_vector(vector),
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!("Saved knowledge base with {} chunks", kb.len());
        Ok(())
    }

    /// Load the stored knowledge base; `None` for a fresh database
    pub fn load_knowledge_base(&self) -> Result<Option<KnowledgeBase>> {
        let Some(source) = self.get_meta(schema::META_SOURCE)? else {
            return Ok(None);
        };
        let model = self.get_meta(schema::META_EMBEDDING_MODEL)?.unwrap_or_default();
        let hash = self.get_meta(schema::META_CONTENT_HASH)?.unwrap_or_default();

        let mut stmt = self
            .conn
            .prepare("SELECT idx, content, source, vector FROM chunks ORDER BY idx")?;

        let rows = stmt.query_map([], |row| {
            let idx: i64 = row.get(0)?;
            let content: String = row.get(1)?;
            let chunk_source: String = row.get(2)?;
            let blob: Vec<u8> = row.get(3)?;
            Ok((Chunk::new(idx as usize, content, chunk_source), decode_vector(&blob)))
        })?;

        let mut chunks = Vec::new();
        let mut vectors = Vec::new();
        for row in rows {
            let (chunk, vector) = row?;
            chunks.push(chunk);
            vectors.push(vector);
        }

        KnowledgeBase::from_embeddings(source, model, hash, chunks, vectors).map(Some)
    }

    /// Count stored chunks
    pub fn count_chunks(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<KbStats> {
        Ok(KbStats {
            source: self.get_meta(schema::META_SOURCE)?,
            embedding_model: self.get_meta(schema::META_EMBEDDING_MODEL)?,
            dimensions: self
                .get_meta(schema::META_DIMENSIONS)?
                .and_then(|d| d.parse().ok())
                .unwrap_or(0),
            chunks: self.count_chunks()?,
        })
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct KbStats {
    pub source: Option<String>,
    pub embedding_model: Option<String>,
    pub dimensions: usize,
    pub chunks: usize,
}

impl std::fmt::Display for KbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Knowledge Base Statistics:")?;
        writeln!(f, "  Source: {}", self.source.as_deref().unwrap_or("-"))?;
        writeln!(f, "  Embedding model: {}", self.embedding_model.as_deref().unwrap_or("-"))?;
        writeln!(f, "  Dimensions: {}", self.dimensions)?;
        writeln!(f, "  Chunks: {}", self.chunks)
    }
}
