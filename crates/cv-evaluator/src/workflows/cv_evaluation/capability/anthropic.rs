use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CapabilityError, EvaluationCapability, PromptTemplate, PromptVariables};
use crate::config::LlmConfig;

const API_VERSION: &str = "2023-06-01";

/// Capability backed by the Anthropic Messages API.
pub struct AnthropicCapability {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    client: Client,
}

impl AnthropicCapability {
    pub fn new(config: &LlmConfig) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: config.base_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl EvaluationCapability for AnthropicCapability {
    async fn respond(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables,
    ) -> Result<String, CapabilityError> {
        if self.api_key.is_empty() {
            return Err(CapabilityError::Unavailable(
                "ANTHROPIC_API_KEY is not configured".to_string(),
            ));
        }

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: template.system.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: template.render(variables),
            }],
        };

        debug!(prompt = %template.name, model = %self.model, "sending capability request");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(CapabilityError::RateLimited { retry_after_ms });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(CapabilityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<MessagesResponse>().await?;
        let text = body
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(CapabilityError::EmptyResponse);
        }

        Ok(text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}
