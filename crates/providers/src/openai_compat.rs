//! OpenAI-compatible dispatcher.
//!
//! Works with any endpoint exposing `/chat/completions` (OpenAI, DeepSeek,
//! OpenRouter, Ollama, vLLM). Sends the system prompt, a trimmed slice of
//! history and the user turn, and returns the raw reply text.

use async_trait::async_trait;
use petmind_config::DispatcherConfig;
use petmind_core::{ChatTurn, DispatchError, Dispatcher, PromptBundle};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible chat completions client.
pub struct OpenAiCompatDispatcher {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    history_turns: usize,
    char_budget: usize,
    message_char_limit: usize,
    client: reqwest::Client,
}

impl OpenAiCompatDispatcher {
    /// Build from config. Fails with [`DispatchError::NotConfigured`] when
    /// no API key is set.
    pub fn from_config(config: &DispatcherConfig) -> Result<Self, DispatchError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                DispatchError::NotConfigured(
                    "no API key; set dispatcher.api_key or PETMIND_API_KEY".into(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DispatchError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            history_turns: config.history_turns,
            char_budget: config.char_budget,
            message_char_limit: config.message_char_limit,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// System prompt, then the newest history turns that fit the turn and
    /// character budgets (oldest first), then the user turn.
    fn to_api_messages(&self, bundle: &PromptBundle) -> Vec<ApiMessage> {
        let mut messages = vec![ApiMessage::new("system", bundle.system_prompt.clone())];
        messages.extend(
            trim_history(
                &bundle.history,
                self.history_turns,
                self.char_budget,
                self.message_char_limit,
            )
            .into_iter()
            .map(|turn| ApiMessage::new(turn.role.as_str(), turn.content)),
        );
        messages.push(ApiMessage::new("user", bundle.user_message.clone()));
        messages
    }
}

/// Keep at most `max_turns` of the newest turns whose total length stays
/// within `char_budget`, cutting each one to `per_message` chars.
pub fn trim_history(
    history: &[ChatTurn],
    max_turns: usize,
    char_budget: usize,
    per_message: usize,
) -> Vec<ChatTurn> {
    let mut kept = Vec::new();
    let mut used = 0;
    for turn in history.iter().rev().take(max_turns) {
        let content: String = turn.content.chars().take(per_message).collect();
        let len = content.chars().count();
        if used + len > char_budget {
            break;
        }
        used += len;
        kept.push(ChatTurn {
            role: turn.role,
            content,
        });
    }
    kept.reverse();
    kept
}

#[async_trait]
impl Dispatcher for OpenAiCompatDispatcher {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn send(&self, bundle: &PromptBundle) -> Result<String, DispatchError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ApiRequest {
            model: &self.model,
            messages: self.to_api_messages(bundle),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        debug!(model = %self.model, turns = body.messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(DispatchError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(DispatchError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Dispatcher returned error");
            return Err(DispatchError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            DispatchError::ApiError {
                status_code: status,
                message: format!("Failed to parse response: {e}"),
            }
        })?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DispatchError::ApiError {
                status_code: status,
                message: "No choices in response".into(),
            })
    }
}

fn map_transport_error(e: reqwest::Error) -> DispatchError {
    if e.is_timeout() {
        DispatchError::Timeout(e.to_string())
    } else {
        DispatchError::Network(e.to_string())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl ApiMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}
