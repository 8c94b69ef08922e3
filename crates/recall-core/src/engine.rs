//! ============================================================================
//! Dialogue Engine - Memory-grounded turn handling
//! ============================================================================
//! One turn: retrieve the user's most relevant memories, fold them into a
//! system prompt, complete against the model, persist what the exchange
//! revealed, then commit the turn to the transcript. The transcript is
//! only touched after every fallible step has succeeded.
//! ============================================================================

use std::sync::Arc;
use tracing::debug;

use crate::auth::Session;
use crate::completion::{ChatMessage, CompletionClient};
use crate::error::{RecallError, Result};
use crate::memory::{MemoryRecord, MemoryService};

/// How many memories ground each turn
pub const MEMORY_SEARCH_LIMIT: u64 = 3;

const GROUNDING_PREFIX: &str = "You are a helpful AI assistant with memory. \
Answer the question based on the query and user's memories.";

/// Turn orchestrator over the memory and completion services
pub struct DialogueEngine {
    memory: Arc<dyn MemoryService>,
    completion: Arc<dyn CompletionClient>,
}

impl DialogueEngine {
    pub fn new(memory: Arc<dyn MemoryService>, completion: Arc<dyn CompletionClient>) -> Self {
        Self { memory, completion }
    }

    /// Run one full turn for the signed-in user and return the assistant's
    /// reply. Any failure aborts the turn before the transcript changes.
    pub async fn handle_turn(&self, session: &mut Session, user_message: &str) -> Result<String> {
        let user_id = match session.user() {
            Some(user) => user.id.clone(),
            None => return Err(RecallError::auth("Sign in to chat")),
        };

        let records = self
            .memory
            .search(&user_id, user_message, MEMORY_SEARCH_LIMIT)
            .await?;
        debug!("Grounding turn with {} memories", records.len());

        let user_msg = ChatMessage::user(user_message);
        let request = [
            ChatMessage::system(build_grounding_prompt(&records)),
            user_msg.clone(),
        ];
        let reply = self.completion.complete(&request).await?;
        let assistant_msg = ChatMessage::assistant(reply.clone());

        self.memory
            .add(&user_id, &[user_msg.clone(), assistant_msg.clone()])
            .await?;

        session.append_turn(user_msg, assistant_msg);
        Ok(reply)
    }
}

/// System prompt carrying the retrieved memories, one `- ` line each
fn build_grounding_prompt(records: &[MemoryRecord]) -> String {
    let memories_str = records
        .iter()
        .map(|record| format!("- {}", record.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\nUser Memories:\n{}", GROUNDING_PREFIX, memories_str)
}
