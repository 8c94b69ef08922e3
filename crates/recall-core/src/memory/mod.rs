//! ============================================================================
//! Memory - Long-term conversational memory over a vector store
//! ============================================================================
//! Per-user memory records embedded and persisted in Qdrant, retrieved by
//! semantic similarity. `MemoryService` is the seam the dialogue engine
//! talks to; `MemoryManager` is the production implementation.
//! ============================================================================

mod embeddings;
mod manager;
mod store;
mod types;

pub use embeddings::{EmbeddingClient, DEFAULT_EMBEDDING_MODEL, EMBEDDING_DIM};
pub use manager::MemoryManager;
pub use store::MemoryStore;
pub use types::{
    LlmOptions, LlmSection, MemoryConfig, MemoryRecord, VectorStoreOptions, VectorStoreSection,
    DEFAULT_COLLECTION_NAME, SUPPORTED_LLM_PROVIDER, SUPPORTED_VECTOR_STORE_PROVIDER,
};

use async_trait::async_trait;

use crate::completion::ChatMessage;
use crate::error::Result;

/// Long-term memory operations scoped to a single user
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Return the records most semantically similar to the query
    async fn search(&self, user_id: &str, query: &str, limit: u64) -> Result<Vec<MemoryRecord>>;

    /// Distill durable facts from a completed turn and persist them
    async fn add(&self, user_id: &str, messages: &[ChatMessage]) -> Result<()>;

    /// Delete every record belonging to the user
    async fn clear(&self, user_id: &str) -> Result<()>;

    /// List stored records without a similarity query
    async fn list(&self, user_id: &str, limit: u64) -> Result<Vec<MemoryRecord>>;
}
