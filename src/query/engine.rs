//! Knowledge base - in-memory vector index over document chunks
//!
//! Every chunk is stored with its embedding. Search is exhaustive: the query
//! vector is compared against every entry with cosine similarity and the
//! best `k` entries are returned, highest score first.

use serde::{Deserialize, Serialize};

use crate::document::{Chunk, Document};
use crate::loader::CharacterTextSplitter;
use crate::query::embedding::Embedder;
use crate::{Error, Result};

/// Chunks handed to the model when no `k` is configured
pub const DEFAULT_TOP_K: usize = 4;

/// A chunk with its relevance to a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone)]
struct IndexedChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Vector index over the chunks of one document
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    source: String,
    embedding_model: String,
    content_hash: String,
    dimensions: usize,
    entries: Vec<IndexedChunk>,
}

impl KnowledgeBase {
    /// Pair chunks with their vectors. Every vector must have the same length.
    pub fn from_embeddings(
        source: impl Into<String>,
        embedding_model: impl Into<String>,
        content_hash: impl Into<String>,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::Embedding(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().position(|v| v.len() != dimensions) {
            return Err(Error::Embedding(format!(
                "Embedding {} has {} dimensions, expected {}",
                bad,
                vectors[bad].len(),
                dimensions
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk { chunk, vector })
            .collect();

        Ok(Self {
            source: source.into(),
            embedding_model: embedding_model.into(),
            content_hash: content_hash.into(),
            dimensions,
            entries,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chunks and vectors in document order
    pub fn iter(&self) -> impl Iterator<Item = (&Chunk, &[f32])> {
        self.entries.iter().map(|e| (&e.chunk, e.vector.as_slice()))
    }

    /// Find the `k` chunks closest to `query_vector`
    pub fn similarity_search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(vec![]);
        }
        if query_vector.len() != self.dimensions {
            return Err(Error::Embedding(format!(
                "Query has {} dimensions, knowledge base has {}",
                query_vector.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query_vector, &e.vector)))
            .collect();

        // Sort by score descending; stable sort keeps document order on ties
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Chunk a document, embed the chunks and index them
pub async fn build_knowledge_base(
    document: &Document,
    splitter: &CharacterTextSplitter,
    embedder: &dyn Embedder,
) -> Result<KnowledgeBase> {
    let chunks = splitter.split_document(document);
    if chunks.is_empty() {
        return Err(Error::EmptyDocument(document.source.clone()));
    }

    tracing::info!(
        "Embedding {} chunks of {} with {}",
        chunks.len(),
        document.source,
        embedder.model_name()
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder.embed_documents(&texts).await?;

    KnowledgeBase::from_embeddings(
        document.source.clone(),
        embedder.model_name(),
        document.content_hash(),
        chunks,
        vectors,
    )
}
