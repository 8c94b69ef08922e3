//! ============================================================================
//! Embedding Client - Vector embeddings for semantic memory search
//! ============================================================================
//! Generates text embeddings via the OpenAI `/v1/embeddings` endpoint.
//! Embedding failures surface as StoreUnavailable: from the caller's point
//! of view the memory store could not serve the search or add.
//! ============================================================================

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::completion::DEFAULT_OPENAI_BASE_URL;
use crate::error::{RecallError, Result};

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Expected embedding dimension for text-embedding-3-small
pub const EMBEDDING_DIM: usize = 1536;

/// Embedding client for generating text vectors
pub struct EmbeddingClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    model: String,
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct EmbeddingUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl EmbeddingClient {
    /// Create a new embedding client against the default OpenAI endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL)
    }

    /// Create with a custom OpenAI-compatible base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// Generate embeddings for multiple texts, returned in input order
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RecallError::store_unavailable(format!("Failed to send embedding request: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            RecallError::store_unavailable(format!("Failed to read embedding response: {}", e))
        })?;

        if !status.is_success() {
            // Try to parse error response
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(RecallError::store_unavailable(format!(
                    "Embedding API error ({}): {}",
                    status, error.error.message
                )));
            }
            return Err(RecallError::store_unavailable(format!(
                "Embedding API error ({}): {}",
                status, body
            )));
        }

        let embedding_response: EmbeddingResponse = serde_json::from_str(&body).map_err(|e| {
            RecallError::store_unavailable(format!("Failed to parse embedding response: {}", e))
        })?;

        if let Some(usage) = &embedding_response.usage {
            debug!(
                "Embedding tokens used: {} (model: {})",
                usage.total_tokens, embedding_response.model
            );
        }

        // Sort by index and extract embeddings
        let mut embeddings: Vec<(usize, Vec<f32>)> = embedding_response
            .data
            .into_iter()
            .map(|d| (d.index, d.embedding))
            .collect();
        embeddings.sort_by_key(|(idx, _)| *idx);

        Ok(embeddings.into_iter().map(|(_, e)| e).collect())
    }

    /// Generate embedding for a single text
    pub async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| RecallError::store_unavailable("No embedding returned"))
    }

    /// Get the current model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_uses_documented_defaults() {
        let client = EmbeddingClient::new("test-key");
        assert_eq!(client.base_url, "https://api.openai.com");
        assert_eq!(client.model(), DEFAULT_EMBEDDING_MODEL);
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let client = EmbeddingClient::new("test-key");
        let result = client.embed(&[]).await;
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }
}
