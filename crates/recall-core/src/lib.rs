//! ============================================================================
//! RECALL-CORE: Memory-Augmented Chat Backend
//! ============================================================================
//! This crate handles all backend logic for Recall:
//! - Email/password auth and session state via Supabase GoTrue
//! - Long-term per-user memory over Qdrant with OpenAI embeddings
//! - Memory-grounded chat completions against the OpenAI API
//! - Lazily initialized shared services and environment config
//! ============================================================================

pub mod auth;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod resources;

// Re-export main types for convenience
pub use auth::{AuthProvider, Session, SignUpOutcome, SupabaseAuth, User, View};
pub use completion::{ChatMessage, ChatRole, CompletionClient, OpenAiClient};
pub use config::{AppConfig, DEFAULT_MODEL};
pub use engine::{DialogueEngine, MEMORY_SEARCH_LIMIT};
pub use error::{RecallError, Result};
pub use memory::{MemoryManager, MemoryRecord, MemoryService};
pub use resources::{ResourceCache, Resources, RESOURCES};
