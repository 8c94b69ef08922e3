//! ============================================================================
//! Auth - Accounts, sessions, and the sign-in gate
//! ============================================================================
//! Email/password authentication through a pluggable provider, plus the
//! session state machine that gates the chat view behind sign-in.
//! ============================================================================

mod provider;
mod session;
mod types;

pub use provider::{AuthProvider, SupabaseAuth};
pub use session::{Session, View};
pub use types::{AuthSession, AuthTokens, SignUpOutcome, SignUpResponse, User};
