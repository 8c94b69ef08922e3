//! ============================================================================
//! Completion Client - Chat completions over an OpenAI-compatible API
//! ============================================================================
//! One synchronous-from-the-caller call: messages in, generated text out.
//! The `CompletionClient` trait is the seam the dialogue engine and the
//! memory manager's fact extraction both go through.
//! ============================================================================

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecallError, Result};

/// Default base URL for the completion and embedding APIs
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Role of a chat message, serialized lowercase on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    /// Wire/display name for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single chat message. Immutable once appended to a transcript;
/// chronological order is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat-completion seam: messages in, generated text out.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for the ordered message list, blocking the
    /// caller until the response (or error) arrives.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// The configured model identifier
    fn model(&self) -> &str;
}

/// Completion client for an OpenAI-compatible `/v1/chat/completions` endpoint
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client against the default OpenAI endpoint
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_OPENAI_BASE_URL)
    }

    /// Create a client against a custom OpenAI-compatible endpoint
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            "Requesting completion from {} ({} messages)",
            self.model,
            messages.len()
        );

        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecallError::completion(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecallError::completion(format!("Failed to read response body: {}", e)))?;

        parse_completion_response(status, &body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extract the first choice's text, or a readable error reason
fn parse_completion_response(status: StatusCode, body: &str) -> Result<String> {
    if !status.is_success() {
        if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
            return Err(RecallError::completion(format!(
                "API error ({}): {}",
                status, error.error.message
            )));
        }
        return Err(RecallError::completion(format!(
            "API error ({}): {}",
            status, body
        )));
    }

    let chat_response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| RecallError::completion(format!("Failed to parse response: {}", e)))?;

    chat_response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| RecallError::completion("Response contained no choices"))
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChatRole::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&ChatRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&ChatRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn request_body_matches_wire_format() {
        let messages = vec![
            ChatMessage::system("Be helpful."),
            ChatMessage::user("Hello"),
        ];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        let wire_messages = json["messages"].as_array().unwrap();
        assert_eq!(wire_messages.len(), 2);
        assert_eq!(wire_messages[0]["role"], "system");
        assert_eq!(wire_messages[0]["content"], "Be helpful.");
        assert_eq!(wire_messages[1]["role"], "user");
        assert_eq!(wire_messages[1]["content"], "Hello");
    }

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Blue."}}]}"#;
        let text = parse_completion_response(StatusCode::OK, body).unwrap();
        assert_eq!(text, "Blue.");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let body = r#"{"choices":[]}"#;
        let err = parse_completion_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, RecallError::Completion(_)));
    }

    #[test]
    fn error_body_message_is_surfaced() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
        let err = parse_completion_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Incorrect API key provided"));
        assert!(text.contains("401"));
    }

    #[test]
    fn unparseable_error_body_falls_back_to_raw_text() {
        let err = parse_completion_response(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OpenAiClient::with_base_url("k", "gpt-4o-mini", "https://api.example.com/");
        assert_eq!(client.base_url, "https://api.example.com");
        assert_eq!(client.model(), "gpt-4o-mini");
    }
}
