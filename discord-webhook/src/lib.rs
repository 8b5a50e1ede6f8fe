use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use subwatch_core::{ConfigError, CoreError, DeliveryError};
use tracing::info;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Discord webhook execution payload. Field names follow the webhook wire
/// format, so the struct serializes directly into the request body.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub username: String,
    pub avatar_url: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub author: EmbedAuthor,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Fire-and-forget webhook delivery. Failures are surfaced to the caller
/// as errors; there is no retry here.
#[derive(Debug)]
pub struct WebhookClient {
    http_client: Client,
    endpoint: Url,
}

impl WebhookClient {
    pub fn new(endpoint: &str) -> Result<Self, CoreError> {
        let endpoint = Url::parse(endpoint).map_err(|_| {
            CoreError::Config(ConfigError::InvalidValue {
                field: "DISCORD_WEBHOOK_URL".to_string(),
                value: endpoint.to_string(),
            })
        })?;

        let http_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub async fn post(&self, payload: &WebhookPayload) -> Result<u16, CoreError> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Delivery(DeliveryError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        info!(
            "Discord POST status: {} ({})",
            status.canonical_reason().unwrap_or("unknown"),
            status.as_u16()
        );

        if !status.is_success() {
            return Err(CoreError::Delivery(DeliveryError::Rejected {
                status: status.as_u16(),
            }));
        }
        Ok(status.as_u16())
    }
}
