//! Generation backend client — OpenAI-compatible chat completions.
//!
//! Fails closed: whatever goes wrong (missing key, transport error, API
//! error, blocked completion), the caller always gets usable reply text —
//! the fixed apology — plus the raw error detail for the audit log. No
//! error from this client ever aborts a turn.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Settings, GENERATION_TIMEOUT_SECS};
use crate::error::GenerationError;
use crate::session::{Message, Role};

/// Reply used when the backend is unreachable or errors out.
pub const APOLOGY_FALLBACK: &str = "Sorry, I couldn't get a response from the assistant.";

/// Reply used when no API key is configured at all.
pub const APOLOGY_MISCONFIGURED: &str =
    "Sorry, the assistant is not configured correctly (API key missing).";

/// Token usage reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Outcome of one generation call. `error` carries the detail of a
/// fail-closed turn for event logging; the reply text is always usable.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    pub usage: Option<Usage>,
    pub error: Option<String>,
}

/// Client for the chat-completions backend.
pub struct GenerationClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GenerationClient {
    pub fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GENERATION_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.api_base_url.clone(),
            model: settings.model.clone(),
        }
    }

    /// Run one completion. Never returns an error — failures collapse into
    /// the apology text with the detail preserved in `error`.
    pub async fn generate(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_message: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> GenerationResult {
        match self
            .try_generate(system_prompt, history, user_message, temperature, max_tokens)
            .await
        {
            Ok((text, usage)) => GenerationResult {
                text,
                usage,
                error: None,
            },
            Err(GenerationError::MissingApiKey) => {
                tracing::error!("generation call refused: API key missing");
                GenerationResult {
                    text: APOLOGY_MISCONFIGURED.to_string(),
                    usage: None,
                    error: Some(GenerationError::MissingApiKey.to_string()),
                }
            }
            Err(e) => {
                tracing::error!("generation call failed: {e}");
                GenerationResult {
                    text: APOLOGY_FALLBACK.to_string(),
                    usage: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_generate(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_message: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<(String, Option<Usage>), GenerationError> {
        let api_key = self.api_key.as_ref().ok_or(GenerationError::MissingApiKey)?;
        let body = build_request_body(
            &self.model,
            system_prompt,
            history,
            user_message,
            temperature,
            max_tokens,
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, body });
        }

        let json: Value = resp.json().await?;
        match json["choices"][0]["message"]["content"].as_str() {
            Some(content) if !content.is_empty() => {
                let usage = serde_json::from_value(json["usage"].clone()).ok();
                Ok((content.to_string(), usage))
            }
            _ => {
                let finish_reason = json["choices"][0]["finish_reason"]
                    .as_str()
                    .unwrap_or("N/A")
                    .to_string();
                // A blocked completion is not a transport failure: surface
                // the bracketed reason as the reply, as the frontend expects.
                Ok((
                    format!("[Blocked or No Content - Finish Reason: {finish_reason}]"),
                    None,
                ))
            }
        }
    }
}

/// Build the chat-completions request body: system prompt, mapped history
/// (legacy "model" role normalized to "assistant"), then the current user
/// message.
fn build_request_body(
    model: &str,
    system_prompt: &str,
    history: &[Message],
    user_message: &str,
    temperature: f64,
    max_tokens: u32,
) -> Value {
    let mut messages = vec![serde_json::json!({
        "role": "system",
        "content": system_prompt,
    })];
    for m in history {
        let role = match m.role {
            Role::User => "user",
            Role::Assistant | Role::Model => "assistant",
        };
        messages.push(serde_json::json!({ "role": role, "content": m.content }));
    }
    messages.push(serde_json::json!({ "role": "user", "content": user_message }));

    serde_json::json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
        "max_tokens": max_tokens,
    })
}
