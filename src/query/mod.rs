//! Query Layer - embeddings, vector search and answer generation

pub mod chain;
pub mod embedding;
pub mod engine;
pub mod llm;
pub mod openai;
pub mod providers;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{Answer, StuffChain, NO_DOCUMENT_ANSWER};
pub use embedding::{Embedder, LocalEmbedder};
pub use engine::{build_knowledge_base, KnowledgeBase, ScoredChunk, DEFAULT_TOP_K};
pub use llm::LanguageModel;
pub use openai::OpenAiClient;
pub use providers::{OpenAiProviders, ProviderFactory};
