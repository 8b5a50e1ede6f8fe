use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subwatch_core::{CoreError, LlmError};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PROVIDER_NAME: &str = "openai";

/// External judgment service consumed by the content filter. Callers treat
/// any `Err` as fail-open, so implementations only classify failures, they
/// never decide relevance themselves.
pub trait LlmProvider {
    async fn judge(&self, prompt: &str) -> Result<String, CoreError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Provider speaking the OpenAI chat completions wire format. Works against
/// any `/chat/completions`-compatible endpoint via the configured base URL.
pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, api_base: String) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            api_key,
            model,
            api_base,
        })
    }
}

impl LlmProvider for OpenAiProvider {
    async fn judge(&self, prompt: &str) -> Result<String, CoreError> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Submitting judgment request to {} ({})", url, self.model);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Llm(LlmError::RequestTimeout {
                        provider: PROVIDER_NAME.to_string(),
                    })
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = match status.as_u16() {
                401 | 403 => LlmError::AuthenticationFailed {
                    provider: PROVIDER_NAME.to_string(),
                },
                429 => LlmError::RateLimitExceeded {
                    provider: PROVIDER_NAME.to_string(),
                },
                _ => LlmError::ServiceUnavailable {
                    provider: PROVIDER_NAME.to_string(),
                },
            };
            return Err(CoreError::Llm(err));
        }

        let chat: ChatResponse = response.json().await.map_err(|_| {
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: PROVIDER_NAME.to_string(),
            })
        })?;

        extract_content(chat)
    }
}

fn extract_content(response: ChatResponse) -> Result<String, CoreError> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        CoreError::Llm(LlmError::InvalidResponseFormat {
            provider: PROVIDER_NAME.to_string(),
        })
    })?;
    Ok(choice.message.content.unwrap_or_default())
}
