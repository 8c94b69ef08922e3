//! ============================================================================
//! Error Types - Shared error taxonomy for the recall core
//! ============================================================================
//! Four conditions cover every failure the core can surface:
//! - Configuration: fatal at startup, halts the UI context
//! - Auth: failed sign-in/sign-up/sign-out, session state unchanged
//! - StoreUnavailable: memory store call failed, turn aborted
//! - Completion: completion call failed, turn aborted
//! ============================================================================

use thiserror::Error;

/// A shared error type for the recall core.
///
/// `Clone` so the resource cache can store a construction failure and
/// replay it on every later access.
#[derive(Error, Debug, Clone)]
pub enum RecallError {
    /// Missing or invalid configuration, raised at process start
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Authentication provider rejected a request
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Memory store (or its embedding backend) could not serve a call
    #[error("Memory store unavailable: {0}")]
    StoreUnavailable(String),

    /// Completion API rejected a request or returned an unusable response
    #[error("Completion error: {0}")]
    Completion(String),
}

impl RecallError {
    // ========================================================================
    // Constructor helpers
    // ========================================================================

    /// Creates a Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a StoreUnavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Creates a Completion error
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion(message.into())
    }

    /// Whether this error must stop the session entirely rather than
    /// abort a single operation
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// A type alias for `Result<T, RecallError>`.
pub type Result<T> = std::result::Result<T, RecallError>;
