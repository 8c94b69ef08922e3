//! ============================================================================
//! Memory Types - Records and configuration for the memory service
//! ============================================================================
//! Defines the durable memory record and the recognized configuration tree
//! (llm section for fact extraction, vector_store section for storage).
//! ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RecallError, Result};

/// Default collection holding memory records
pub const DEFAULT_COLLECTION_NAME: &str = "memories";

/// LLM provider the memory service knows how to drive
pub const SUPPORTED_LLM_PROVIDER: &str = "openai";

/// Vector store provider the memory service knows how to drive
pub const SUPPORTED_VECTOR_STORE_PROVIDER: &str = "qdrant";

/// A durable fact extracted from conversation, stored in the vector database
/// and retrievable by similarity search. Callers only inspect `text` after
/// retrieval; the rest is bookkeeping.
#[derive(Debug, Clone)]
pub struct MemoryRecord {
    /// Unique identifier, doubles as the vector store point id
    pub id: Uuid,
    /// Owning user; every store operation is partitioned by this
    pub user_id: String,
    /// The fact itself
    pub text: String,
    /// Unix timestamp when the record was created
    pub created_at: i64,
}

impl MemoryRecord {
    /// Create a new record owned by `user_id`
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            text: text.into(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Memory service configuration.
///
/// The recognized option tree:
/// ```json
/// {
///   "llm": { "provider": "openai", "config": { "model": "gpt-4o-mini" } },
///   "vector_store": {
///     "provider": "qdrant",
///     "config": { "connection_string": "...", "collection_name": "memories" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub llm: LlmSection,
    pub vector_store: VectorStoreSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    pub provider: String,
    pub config: LlmOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmOptions {
    /// Model used for fact extraction inside `add`
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreSection {
    pub provider: String,
    pub config: VectorStoreOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreOptions {
    /// Connection string for the vector database
    pub connection_string: String,
    /// Collection holding this deployment's records
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
}

fn default_collection_name() -> String {
    DEFAULT_COLLECTION_NAME.to_string()
}

impl MemoryConfig {
    /// Reject configurations the memory service cannot act on. Called at
    /// construction time so a bad deployment fails at process start, not
    /// on the first chat turn.
    pub fn validate(&self) -> Result<()> {
        if self.vector_store.config.connection_string.trim().is_empty() {
            return Err(RecallError::configuration(
                "vector_store.config.connection_string must not be empty",
            ));
        }
        if self.llm.provider != SUPPORTED_LLM_PROVIDER {
            return Err(RecallError::configuration(format!(
                "Unsupported llm provider '{}' (expected '{}')",
                self.llm.provider, SUPPORTED_LLM_PROVIDER
            )));
        }
        if self.vector_store.provider != SUPPORTED_VECTOR_STORE_PROVIDER {
            return Err(RecallError::configuration(format!(
                "Unsupported vector_store provider '{}' (expected '{}')",
                self.vector_store.provider, SUPPORTED_VECTOR_STORE_PROVIDER
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> MemoryConfig {
        MemoryConfig {
            llm: LlmSection {
                provider: "openai".to_string(),
                config: LlmOptions {
                    model: "gpt-4o-mini".to_string(),
                },
            },
            vector_store: VectorStoreSection {
                provider: "qdrant".to_string(),
                config: VectorStoreOptions {
                    connection_string: "http://localhost:6334".to_string(),
                    collection_name: "memories".to_string(),
                },
            },
        }
    }

    #[test]
    fn record_creation_stamps_owner_and_time() {
        let record = MemoryRecord::new("user-1", "Favorite color is blue");
        assert_eq!(record.user_id, "user-1");
        assert_eq!(record.text, "Favorite color is blue");
        assert!(record.created_at > 0);
    }

    #[test]
    fn config_parses_the_recognized_option_tree() {
        let json = r#"{
            "llm": { "provider": "openai", "config": { "model": "gpt-4o-mini" } },
            "vector_store": {
                "provider": "qdrant",
                "config": { "connection_string": "http://localhost:6334" }
            }
        }"#;
        let config: MemoryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.llm.config.model, "gpt-4o-mini");
        assert_eq!(
            config.vector_store.config.connection_string,
            "http://localhost:6334"
        );
        // collection_name falls back to the documented default
        assert_eq!(config.vector_store.config.collection_name, "memories");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_connection_string_fails_validation() {
        let mut config = valid_config();
        config.vector_store.config.connection_string = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RecallError::Configuration(_)));
    }

    #[test]
    fn unknown_providers_fail_validation() {
        let mut config = valid_config();
        config.llm.provider = "anthropic".to_string();
        assert!(matches!(
            config.validate(),
            Err(RecallError::Configuration(_))
        ));

        let mut config = valid_config();
        config.vector_store.provider = "supabase".to_string();
        assert!(matches!(
            config.validate(),
            Err(RecallError::Configuration(_))
        ));
    }
}
