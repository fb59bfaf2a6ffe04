//! Anthropic Messages API client.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;

use super::{LanguageModel, Message, ModelRequest, ModelResponse};
use crate::error::{Error, Result};

/// Default model for direct API access.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: &'a [Message],
}

/// [`LanguageModel`] served by the Anthropic API with an API key.
#[derive(Clone)]
pub struct AnthropicModel {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl AnthropicModel {
    /// Client for [`DEFAULT_ANTHROPIC_MODEL`].
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("Anthropic API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Load the key from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| Error::Config("ANTHROPIC_API_KEY is not set".to_string()))?;
        Self::new(key)
    }

    /// Use another model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use another API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

impl std::fmt::Debug for AnthropicModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicModel")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LanguageModel for AnthropicModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn invoke(&self, request: &ModelRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: &request.messages,
        };

        log::info!("Invoking model {}", self.model);
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Http {
                status: status.as_u16(),
                message,
            });
        }

        ModelResponse::from_slice(&response.bytes()?)?.into_text()
    }
}
