//! ============================================================================
//! Auth Provider - Supabase GoTrue REST client
//! ============================================================================
//! Email/password authentication against the Supabase auth endpoints:
//! sign-up (which may require email confirmation depending on project
//! settings), password grant sign-in, and token revocation on sign-out.
//! ============================================================================

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::types::{AuthSession, AuthTokens, SignUpOutcome, SignUpResponse, User};
use crate::error::{RecallError, Result};

/// Authentication operations the session layer depends on
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account. Yields a session immediately or signals that
    /// email confirmation is pending.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome>;

    /// Exchange credentials for a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Revoke the session's tokens
    async fn sign_out(&self, tokens: &AuthTokens) -> Result<()>;
}

/// Supabase GoTrue client
pub struct SupabaseAuth {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseAuth {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        debug!("Signing up {} via {}", email, url);

        let response = self
            .client
            .post(&url)
            .header("apikey", self.api_key.as_str())
            .json(&signup_payload(email, password, full_name))
            .send()
            .await
            .map_err(|e| RecallError::auth(format!("Sign-up request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecallError::auth(format!("Failed to read sign-up response: {}", e)))?;

        if !status.is_success() {
            return Err(RecallError::auth(parse_error_reason(status, &body)));
        }

        Ok(parse_signup_body(&body)?.outcome())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        debug!("Signing in {} via {}", email, url);

        let response = self
            .client
            .post(&url)
            .header("apikey", self.api_key.as_str())
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| RecallError::auth(format!("Sign-in request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecallError::auth(format!("Failed to read sign-in response: {}", e)))?;

        if !status.is_success() {
            return Err(RecallError::auth(parse_error_reason(status, &body)));
        }

        parse_session_body(&body)
    }

    async fn sign_out(&self, tokens: &AuthTokens) -> Result<()> {
        let url = format!("{}/auth/v1/logout", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(|e| RecallError::auth(format!("Sign-out request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecallError::auth(parse_error_reason(status, &body)));
        }

        Ok(())
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Deserialize)]
struct SessionPayload {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: UserPayload,
}

#[derive(Deserialize)]
struct UserPayload {
    id: String,
    email: Option<String>,
    user_metadata: Option<serde_json::Value>,
}

fn signup_payload(email: &str, password: &str, full_name: Option<&str>) -> serde_json::Value {
    match full_name {
        Some(name) => serde_json::json!({
            "email": email,
            "password": password,
            "data": { "full_name": name },
        }),
        None => serde_json::json!({
            "email": email,
            "password": password,
        }),
    }
}

/// A successful sign-up returns either a full session or, when the project
/// requires email confirmation, the user record (bare or wrapped).
fn parse_signup_body(body: &str) -> Result<SignUpResponse> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| RecallError::auth(format!("Malformed sign-up response: {}", e)))?;

    if value.get("access_token").is_some() {
        let payload: SessionPayload = serde_json::from_value(value)
            .map_err(|e| RecallError::auth(format!("Malformed sign-up response: {}", e)))?;
        let auth_session = session_from_payload(payload);
        return Ok(SignUpResponse {
            user: Some(auth_session.user.clone()),
            session: Some(auth_session),
        });
    }

    let user_value = if value.get("id").is_some() {
        Some(value)
    } else {
        value.get("user").cloned()
    };

    match user_value {
        Some(user_value) => {
            let payload: UserPayload = serde_json::from_value(user_value)
                .map_err(|e| RecallError::auth(format!("Malformed sign-up response: {}", e)))?;
            Ok(SignUpResponse {
                user: Some(user_from_payload(payload)),
                session: None,
            })
        }
        None => Err(RecallError::auth(
            "Sign-up response carried neither a session nor a user",
        )),
    }
}

fn parse_session_body(body: &str) -> Result<AuthSession> {
    let payload: SessionPayload = serde_json::from_str(body)
        .map_err(|e| RecallError::auth(format!("Malformed session response: {}", e)))?;
    Ok(session_from_payload(payload))
}

fn session_from_payload(payload: SessionPayload) -> AuthSession {
    // GoTrue reports both an absolute expiry and a relative lifetime;
    // older deployments omit the absolute one.
    let expires_at = payload
        .expires_at
        .unwrap_or_else(|| chrono::Utc::now().timestamp() + payload.expires_in.unwrap_or(0));

    AuthSession {
        user: user_from_payload(payload.user),
        tokens: AuthTokens {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_at,
        },
    }
}

fn user_from_payload(payload: UserPayload) -> User {
    let full_name = payload
        .user_metadata
        .as_ref()
        .and_then(|metadata| metadata.get("full_name"))
        .and_then(|name| name.as_str())
        .map(|name| name.to_string());

    User {
        id: payload.id,
        email: payload.email.unwrap_or_default(),
        full_name,
    }
}

/// GoTrue error bodies are inconsistent across endpoints and versions;
/// try the known field names before falling back to the raw body.
fn parse_error_reason(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["error_description", "msg", "message", "error"] {
            if let Some(reason) = value.get(field).and_then(|v| v.as_str()) {
                return reason.to_string();
            }
        }
    }

    if body.trim().is_empty() {
        format!("Auth service returned {}", status)
    } else {
        format!("Auth service returned {}: {}", status, body.trim())
    }
}
