//! ============================================================================
//! Auth Types - Users, tokens, and sign-up outcomes
//! ============================================================================

/// Authenticated user identity
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Provider-assigned user id, used to scope memory records
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// Bearer tokens for an authenticated session
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp after which the access token is stale
    pub expires_at: i64,
}

/// A signed-in user together with their tokens
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub tokens: AuthTokens,
}

/// Normalized provider sign-up response. Depending on project settings
/// the provider returns a usable session, or only the created user while
/// email confirmation is pending.
#[derive(Debug, Clone)]
pub struct SignUpResponse {
    pub user: Option<User>,
    pub session: Option<AuthSession>,
}

impl SignUpResponse {
    /// Collapse to the outcome the session machine acts on: only an
    /// actually-returned session counts as signed in
    pub fn outcome(self) -> SignUpOutcome {
        match self.session {
            Some(session) => SignUpOutcome::SignedIn(session),
            None => SignUpOutcome::ConfirmationRequired,
        }
    }
}

/// Result of a sign-up attempt. Providers configured to require email
/// confirmation return an account without a usable session.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Account created and immediately signed in
    SignedIn(AuthSession),
    /// Account created; the user must confirm their email before signing in
    ConfirmationRequired,
}
