//! ============================================================================
//! Session - Authentication state and the current conversation
//! ============================================================================
//! Tracks whether a user is signed in and holds the transcript of the
//! active conversation. All state transitions happen here so the UI can
//! stay a thin rendering of `view()`.
//! ============================================================================

use tracing::info;

use super::provider::AuthProvider;
use super::types::{AuthSession, SignUpOutcome, User};
use crate::completion::ChatMessage;
use crate::error::{RecallError, Result};
use crate::memory::MemoryService;

#[cfg(test)]
use super::types::AuthTokens;

/// Which screen the interface should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    SignIn,
    Chat,
}

enum AuthState {
    Anonymous,
    Authenticated(AuthSession),
}

/// Per-user application session
pub struct Session {
    auth: AuthState,
    transcript: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            auth: AuthState::Anonymous,
            transcript: Vec::new(),
        }
    }

    pub fn view(&self) -> View {
        match self.auth {
            AuthState::Anonymous => View::SignIn,
            AuthState::Authenticated(_) => View::Chat,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match &self.auth {
            AuthState::Anonymous => None,
            AuthState::Authenticated(session) => Some(&session.user),
        }
    }

    /// Messages exchanged since sign-in, oldest first
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Record one completed exchange. Only called once the turn has fully
    /// succeeded, so the transcript never holds half a turn.
    pub(crate) fn append_turn(&mut self, user_message: ChatMessage, assistant_message: ChatMessage) {
        self.transcript.push(user_message);
        self.transcript.push(assistant_message);
    }

    /// Create an account. Signs the session in immediately when the
    /// provider returns one; otherwise the session stays anonymous until
    /// the user confirms their email and signs in.
    pub async fn sign_up(
        &mut self,
        provider: &dyn AuthProvider,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome> {
        let outcome = provider.sign_up(email, password, full_name).await?;

        if let SignUpOutcome::SignedIn(auth_session) = &outcome {
            info!("Signed up and in as {}", auth_session.user.email);
            self.auth = AuthState::Authenticated(auth_session.clone());
        }

        Ok(outcome)
    }

    pub async fn sign_in(
        &mut self,
        provider: &dyn AuthProvider,
        email: &str,
        password: &str,
    ) -> Result<User> {
        let auth_session = provider.sign_in(email, password).await?;
        let user = auth_session.user.clone();
        info!("Signed in as {}", user.email);

        self.auth = AuthState::Authenticated(auth_session);
        Ok(user)
    }

    /// Revoke the current tokens and drop back to anonymous. Signing out
    /// while anonymous is a no-op; a provider failure leaves the session
    /// signed in so the user can retry. The transcript belongs to the UI
    /// context, not the identity, so it survives sign-out.
    pub async fn sign_out(&mut self, provider: &dyn AuthProvider) -> Result<()> {
        let tokens = match &self.auth {
            AuthState::Authenticated(auth_session) => auth_session.tokens.clone(),
            AuthState::Anonymous => return Ok(()),
        };

        provider.sign_out(&tokens).await?;

        info!("Signed out");
        self.auth = AuthState::Anonymous;
        Ok(())
    }

    /// Delete the signed-in user's stored memories and reset the
    /// transcript so no forgotten context lingers on screen
    pub async fn clear_memories(&mut self, memory: &dyn MemoryService) -> Result<()> {
        let user_id = match self.user() {
            Some(user) => user.id.clone(),
            None => return Err(RecallError::auth("Sign in to manage memories")),
        };

        memory.clear(&user_id).await?;
        self.transcript.clear();

        info!("Cleared memories for user {}", user_id);
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Session {
    /// Session already signed in, for exercising post-auth flows
    pub(crate) fn authenticated(user: User) -> Self {
        Self {
            auth: AuthState::Authenticated(AuthSession {
                user,
                tokens: AuthTokens {
                    access_token: "test-access-token".to_string(),
                    refresh_token: None,
                    expires_at: 0,
                },
            }),
            transcript: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn test_user() -> User {
        User {
            id: "user-123".to_string(),
            email: "ada@example.com".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
        }
    }

    fn test_auth_session() -> AuthSession {
        AuthSession {
            user: test_user(),
            tokens: AuthTokens {
                access_token: "access".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: 1700003600,
            },
        }
    }

    struct MockProvider {
        signup_outcome: Option<SignUpOutcome>,
        fail_sign_out: bool,
        sign_out_calls: AtomicUsize,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                signup_outcome: None,
                fail_sign_out: false,
                sign_out_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuthProvider for MockProvider {
        async fn sign_up(
            &self,
            _email: &str,
            _password: &str,
            _full_name: Option<&str>,
        ) -> Result<SignUpOutcome> {
            match &self.signup_outcome {
                Some(outcome) => Ok(outcome.clone()),
                None => Err(RecallError::auth("no sign-up outcome configured")),
            }
        }

        async fn sign_in(&self, _email: &str, _password: &str) -> Result<AuthSession> {
            Ok(test_auth_session())
        }

        async fn sign_out(&self, _tokens: &AuthTokens) -> Result<()> {
            self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_out {
                Err(RecallError::auth("revocation failed"))
            } else {
                Ok(())
            }
        }
    }

    struct MockMemory {
        records: Mutex<Vec<MemoryRecord>>,
        cleared: Mutex<Vec<String>>,
    }

    impl MockMemory {
        fn with_records(user_id: &str, texts: &[&str]) -> Self {
            Self {
                records: Mutex::new(
                    texts
                        .iter()
                        .map(|text| MemoryRecord::new(user_id, *text))
                        .collect(),
                ),
                cleared: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MemoryService for MockMemory {
        async fn search(
            &self,
            user_id: &str,
            _query: &str,
            _limit: u64,
        ) -> Result<Vec<MemoryRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|record| record.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn add(&self, _user_id: &str, _messages: &[ChatMessage]) -> Result<()> {
            Ok(())
        }

        async fn clear(&self, user_id: &str) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .retain(|record| record.user_id != user_id);
            self.cleared.lock().unwrap().push(user_id.to_string());
            Ok(())
        }

        async fn list(&self, _user_id: &str, _limit: u64) -> Result<Vec<MemoryRecord>> {
            Ok(self.records.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn new_session_starts_on_sign_in_view() {
        let session = Session::new();
        assert_eq!(session.view(), View::SignIn);
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn sign_in_switches_to_chat_view() {
        let provider = MockProvider::new();
        let mut session = Session::new();

        let user = session
            .sign_in(&provider, "ada@example.com", "password")
            .await
            .unwrap();

        assert_eq!(user.id, "user-123");
        assert_eq!(session.view(), View::Chat);
        assert_eq!(session.user().unwrap().email, "ada@example.com");
    }

    #[tokio::test]
    async fn signup_with_session_signs_in() {
        let mut provider = MockProvider::new();
        provider.signup_outcome = Some(SignUpOutcome::SignedIn(test_auth_session()));
        let mut session = Session::new();

        let outcome = session
            .sign_up(&provider, "ada@example.com", "password", Some("Ada"))
            .await
            .unwrap();

        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
        assert_eq!(session.view(), View::Chat);
    }

    #[tokio::test]
    async fn signup_pending_confirmation_stays_anonymous() {
        let mut provider = MockProvider::new();
        provider.signup_outcome = Some(SignUpOutcome::ConfirmationRequired);
        let mut session = Session::new();

        let outcome = session
            .sign_up(&provider, "ada@example.com", "password", None)
            .await
            .unwrap();

        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired));
        assert_eq!(session.view(), View::SignIn);
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn repeated_sign_out_revokes_once() {
        let provider = MockProvider::new();
        let mut session = Session::authenticated(test_user());

        session.sign_out(&provider).await.unwrap();
        assert_eq!(session.view(), View::SignIn);

        session.sign_out(&provider).await.unwrap();
        assert_eq!(provider.sign_out_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_sign_out_keeps_session_signed_in() {
        let mut provider = MockProvider::new();
        provider.fail_sign_out = true;
        let mut session = Session::authenticated(test_user());

        let err = session.sign_out(&provider).await.unwrap_err();
        assert!(matches!(err, RecallError::Auth(_)));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn sign_out_keeps_the_transcript() {
        let provider = MockProvider::new();
        let mut session = Session::authenticated(test_user());
        session.append_turn(
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi there"),
        );

        session.sign_out(&provider).await.unwrap();

        assert_eq!(session.view(), View::SignIn);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn clear_memories_scopes_to_user_and_resets_transcript() {
        let memory = MockMemory::with_records("user-123", &["Favorite color is blue"]);
        let mut session = Session::authenticated(test_user());
        session.append_turn(
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi there"),
        );
        assert_eq!(session.transcript().len(), 2);

        session.clear_memories(&memory).await.unwrap();

        assert_eq!(*memory.cleared.lock().unwrap(), vec!["user-123".to_string()]);
        assert!(session.transcript().is_empty());
        assert!(session.is_authenticated());

        let remaining = memory.search("user-123", "color", 3).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn clear_memories_requires_sign_in() {
        let memory = MockMemory::with_records("user-123", &[]);
        let mut session = Session::new();

        let err = session.clear_memories(&memory).await.unwrap_err();
        assert!(matches!(err, RecallError::Auth(_)));
        assert!(memory.cleared.lock().unwrap().is_empty());
    }
}
