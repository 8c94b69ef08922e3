//! ============================================================================
//! Memory Manager - Orchestrates memory storage and retrieval
//! ============================================================================
//! Concrete `MemoryService`: semantic search over a user's records, fact
//! extraction and persistence after each turn, per-user clearing and
//! listing. Fact extraction runs one completion with the memory service's
//! own configured model; the caller never sees the extraction policy.
//! ============================================================================

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::embeddings::EmbeddingClient;
use super::store::MemoryStore;
use super::types::{MemoryConfig, MemoryRecord};
use super::MemoryService;
use crate::completion::{ChatMessage, CompletionClient, OpenAiClient};
use crate::error::{RecallError, Result};

/// Instruction for the fact-extraction completion
const EXTRACTION_PROMPT: &str = "You are a memory extraction assistant. From the conversation below, \
identify durable facts about the user worth remembering across sessions: preferences, biographical \
details, goals, and decisions.\n\
Respond with ONLY the facts, one per line, each phrased as a short standalone statement. \
If there is nothing worth remembering, respond with NONE.";

/// Memory manager combining the vector store, embeddings, and an
/// extraction LLM
pub struct MemoryManager {
    store: MemoryStore,
    embeddings: EmbeddingClient,
    llm: Arc<dyn CompletionClient>,
}

impl MemoryManager {
    /// Build the manager from a validated configuration. Fails with a
    /// configuration or store error before any turn can run.
    pub async fn new(config: &MemoryConfig, api_key: &str) -> Result<Self> {
        config.validate()?;

        let store = MemoryStore::connect(
            &config.vector_store.config.connection_string,
            &config.vector_store.config.collection_name,
        )
        .await?;

        let llm: Arc<dyn CompletionClient> =
            Arc::new(OpenAiClient::new(api_key, config.llm.config.model.clone()));

        Ok(Self {
            store,
            embeddings: EmbeddingClient::new(api_key),
            llm,
        })
    }

    /// Run one extraction completion over the turn and split the reply
    /// into fact lines
    async fn extract_facts(&self, messages: &[ChatMessage]) -> Result<Vec<String>> {
        let request = build_extraction_request(messages);
        let response = self.llm.complete(&request).await?;
        Ok(parse_fact_lines(&response))
    }
}

#[async_trait]
impl MemoryService for MemoryManager {
    async fn search(&self, user_id: &str, query: &str, limit: u64) -> Result<Vec<MemoryRecord>> {
        debug!("Searching memories for user {} (limit: {})", user_id, limit);

        let query_embedding = self.embeddings.embed_single(query).await?;
        self.store.search(user_id, query_embedding, limit).await
    }

    async fn add(&self, user_id: &str, messages: &[ChatMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let facts = self.extract_facts(messages).await?;
        if facts.is_empty() {
            debug!("No durable facts extracted for user {}", user_id);
            return Ok(());
        }

        let embeddings = self.embeddings.embed(&facts).await?;
        check_embedding_count(&facts, &embeddings)?;
        for (text, embedding) in facts.iter().zip(embeddings) {
            let record = MemoryRecord::new(user_id, text.clone());
            self.store.upsert(&record, embedding).await?;
        }

        info!("Stored {} memories for user {}", facts.len(), user_id);
        Ok(())
    }

    async fn clear(&self, user_id: &str) -> Result<()> {
        self.store.delete_user(user_id).await
    }

    async fn list(&self, user_id: &str, limit: u64) -> Result<Vec<MemoryRecord>> {
        self.store.scroll(user_id, limit).await
    }
}

/// Build the extraction request: instruction plus the turn rendered as
/// `role: content` lines
fn build_extraction_request(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let transcript = messages
        .iter()
        .map(|message| format!("{}: {}", message.role.as_str(), message.content))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        ChatMessage::system(EXTRACTION_PROMPT),
        ChatMessage::user(transcript),
    ]
}

/// Refuse an embedding batch whose size disagrees with the fact list;
/// zipping a short batch would silently drop the trailing facts.
fn check_embedding_count(facts: &[String], embeddings: &[Vec<f32>]) -> Result<()> {
    if facts.len() != embeddings.len() {
        return Err(RecallError::store_unavailable(format!(
            "Embedding count mismatch: {} facts, {} vectors",
            facts.len(),
            embeddings.len()
        )));
    }
    Ok(())
}

/// Split an extraction reply into fact lines. Handles the NONE sentinel,
/// blank lines, and bullet prefixes the model sometimes adds.
fn parse_fact_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*']).trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !line.eq_ignore_ascii_case("none"))
        .map(|line| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{LlmOptions, LlmSection, VectorStoreOptions, VectorStoreSection};

    #[test]
    fn extraction_request_embeds_both_turn_roles() {
        let turn = [
            ChatMessage::user("My favorite color is blue"),
            ChatMessage::assistant("Noted, blue it is."),
        ];
        let request = build_extraction_request(&turn);

        assert_eq!(request.len(), 2);
        assert_eq!(request[0].content, EXTRACTION_PROMPT);
        assert!(request[1].content.contains("user: My favorite color is blue"));
        assert!(request[1].content.contains("assistant: Noted, blue it is."));
    }

    #[test]
    fn fact_lines_strip_bullets_and_blanks() {
        let response = "- Favorite color is blue\n\n* Works as a nurse\n  Lives in Lisbon  \n";
        assert_eq!(
            parse_fact_lines(response),
            vec![
                "Favorite color is blue".to_string(),
                "Works as a nurse".to_string(),
                "Lives in Lisbon".to_string(),
            ]
        );
    }

    #[test]
    fn none_sentinel_yields_no_facts() {
        assert!(parse_fact_lines("NONE").is_empty());
        assert!(parse_fact_lines("none\n").is_empty());
        assert!(parse_fact_lines("").is_empty());
    }

    #[test]
    fn short_embedding_batch_is_rejected_not_truncated() {
        let facts = vec![
            "Favorite color is blue".to_string(),
            "Works as a nurse".to_string(),
        ];
        let full = vec![vec![0.1_f32; 4], vec![0.2_f32; 4]];
        let short = vec![vec![0.1_f32; 4]];

        assert!(check_embedding_count(&facts, &full).is_ok());

        let err = match check_embedding_count(&facts, &short) {
            Ok(()) => panic!("short batch accepted"),
            Err(err) => err,
        };
        assert!(matches!(err, RecallError::StoreUnavailable(_)));
        assert!(err.to_string().contains("2 facts"));
    }

    #[tokio::test]
    async fn construction_rejects_unsupported_providers_before_connecting() {
        let config = MemoryConfig {
            llm: LlmSection {
                provider: "llama-cpp".to_string(),
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
        };

        let err = match MemoryManager::new(&config, "test-key").await {
            Ok(_) => panic!("construction accepted an unsupported provider"),
            Err(err) => err,
        };
        assert!(matches!(err, RecallError::Configuration(_)));
    }
}
