//! OpenAI-compatible chat-completions client.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// Fixed sampling temperature sent with every request.
const SAMPLING_TEMPERATURE: f64 = 0.7;

/// Bounded timeout for the completion round trip. Configured on the HTTP
/// client, not a behavior of the fallback contract itself.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Failure classes for a single completion round trip. All of them are
/// recovered at the `FallbackResponder` boundary; callers of
/// `generate_reply` never see these.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion provider returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid completion response: {0}")]
    InvalidFormat(String),
}

/// Request body for the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

/// One role/content message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat completion response (only the fields we consume).
#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Stateless: each call is one request/response round trip with no retry
/// policy. Failure is terminal for that call.
#[derive(Clone)]
pub struct CompletionClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl CompletionClient {
    /// Create a new completion client.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            api_key,
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build request headers with optional bearer auth.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &self.api_key {
            let auth_value = format!("Bearer {}", api_key);
            if let Ok(header_value) = HeaderValue::from_str(&auth_value) {
                headers.insert(AUTHORIZATION, header_value);
            }
        }
        headers
    }

    fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Sends one completion request: a system persona message followed by
    /// the user's text verbatim. Returns the first choice's text content.
    pub async fn complete(
        &self,
        persona: &str,
        user_text: &str,
    ) -> Result<String, CompletionError> {
        let request_body = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: persona.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
            temperature: SAMPLING_TEMPERATURE,
        };

        let response = self
            .http_client
            .post(self.chat_completions_url())
            .headers(self.build_headers())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response_text = response.text().await?;
        let completions: ChatCompletionsResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                let preview: String = response_text.chars().take(500).collect();
                CompletionError::InvalidFormat(format!(
                    "failed to parse completion response: {e}\nBody preview: {preview}"
                ))
            })?;

        completions
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                CompletionError::InvalidFormat("response carried no text content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_completions_url_without_v1_suffix() {
        let client = CompletionClient::new("http://127.0.0.1:8080/", None, "gpt-4o-mini");
        assert_eq!(
            client.chat_completions_url(),
            "http://127.0.0.1:8080/v1/chat/completions"
        );
    }

    #[test]
    fn chat_completions_url_with_v1_suffix() {
        let client = CompletionClient::new("http://127.0.0.1:8080/v1", None, "gpt-4o-mini");
        assert_eq!(
            client.chat_completions_url(),
            "http://127.0.0.1:8080/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_carries_persona_user_and_temperature() {
        let request = ChatCompletionsRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "Eres un asistente médico experto en cirugía vascular.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "¿qué es una trombosis?".to_string(),
                },
            ],
            temperature: 0.7,
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["temperature"], 0.7);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "¿qué es una trombosis?");
    }

    #[test]
    fn response_parsing_extracts_first_choice_content() {
        let raw = r#"{
            "id": "chatcmpl-123",
            "model": "gpt-4o-mini",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "X" }, "finish_reason": "stop" }
            ],
            "usage": { "prompt_tokens": 20, "completion_tokens": 1, "total_tokens": 21 }
        }"#;
        let parsed: ChatCompletionsResponse = serde_json::from_str(raw).expect("parse");
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);
        assert_eq!(content.as_deref(), Some("X"));
    }
}
