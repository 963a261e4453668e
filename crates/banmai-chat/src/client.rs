//! Gemini completion client.
//!
//! The completion service is the only operation expected to block; the
//! client carries a bounded timeout and maps every failure into
//! [`CompletionError`] for the engine to absorb.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use banmai_core::config::GeminiConfig;
use banmai_core::types::{ConversationTurn, Role};

use crate::error::CompletionError;

/// Black-box text-completion service.
///
/// `history` carries the bounded recent turns; `user_message` is already
/// annotated with its expanded form where that differs.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[ConversationTurn],
        user_message: &str,
    ) -> Result<String, CompletionError>;
}

// =============================================================================
// Wire types (generateContent REST shape)
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn turn_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn text_content(role: Option<&str>, text: &str) -> Content {
    Content {
        role: role.map(str::to_string),
        parts: vec![Part {
            text: text.to_string(),
        }],
    }
}

// =============================================================================
// GeminiClient
// =============================================================================

/// HTTP client for the generative-language `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    /// Build a client from configuration. An empty API key is allowed here;
    /// every `complete` call then fails with `NotConfigured`.
    pub fn from_config(config: &GeminiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn build_request(
        system_instruction: &str,
        history: &[ConversationTurn],
        user_message: &str,
    ) -> GenerateContentRequest {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| text_content(Some(turn_role(turn.role)), &turn.text))
            .collect();
        contents.push(text_content(Some("user"), user_message));

        GenerateContentRequest {
            system_instruction: text_content(None, system_instruction),
            contents,
        }
    }

    fn extract_text(response: GenerateContentResponse) -> Result<String, CompletionError> {
        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| CompletionError::Malformed("no candidates".to_string()))?;

        let text = content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(CompletionError::Malformed(
                "candidate has no text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(
        &self,
        system_instruction: &str,
        history: &[ConversationTurn],
        user_message: &str,
    ) -> Result<String, CompletionError> {
        if !self.is_configured() {
            return Err(CompletionError::NotConfigured);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let request = Self::build_request(system_instruction, history, user_message);

        debug!(
            "Calling {} with {} history turns",
            self.model,
            history.len()
        );
        let response = self.http.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;
        Self::extract_text(parsed)
    }
}
