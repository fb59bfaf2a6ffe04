//! Language-model calls used to restructure documents and answer questions.
//!
//! Both hosted backends speak the Anthropic messages format: a list of
//! role-tagged messages plus an output token budget and a temperature. The
//! reply carries a list of content blocks; the first text block is the
//! answer.

#[cfg(feature = "remote")]
mod anthropic;
#[cfg(feature = "remote")]
mod bedrock;
mod prompt;

#[cfg(feature = "remote")]
pub use anthropic::{AnthropicModel, DEFAULT_ANTHROPIC_MODEL};
#[cfg(feature = "remote")]
pub use bedrock::{BedrockModel, DEFAULT_BEDROCK_MODEL};
pub use prompt::{
    answer_prompt, restructure_prompt, ANSWER_MAX_TOKENS, DEFAULT_TEMPERATURE,
    RESTRUCTURE_MAX_TOKENS,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The caller
    User,
    /// The model
    Assistant,
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
}

/// A role-tagged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Content blocks
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A single-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// Output budget and sampling temperature for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl ModelSettings {
    /// Create settings.
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }

    /// Settings for restructuring a whole document.
    pub fn restructure() -> Self {
        Self::new(RESTRUCTURE_MAX_TOKENS, DEFAULT_TEMPERATURE)
    }

    /// Settings for answering a question.
    pub fn answer() -> Self {
        Self::new(ANSWER_MAX_TOKENS, DEFAULT_TEMPERATURE)
    }

    /// Set the token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A single model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Conversation so far
    pub messages: Vec<Message>,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl ModelRequest {
    /// A one-message user request.
    pub fn user(text: impl Into<String>, settings: ModelSettings) -> Self {
        Self {
            messages: vec![Message::user(text)],
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

/// Model reply in the messages format.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelResponse {
    /// Generated content blocks
    #[serde(default)]
    pub content: Vec<ResponseContent>,
    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// A generated content block.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseContent {
    /// Block type, `text` for generated text
    #[serde(rename = "type")]
    pub kind: String,
    /// Generated text
    #[serde(default)]
    pub text: Option<String>,
}

impl ModelResponse {
    /// Decode a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Text of the first content block.
    pub fn into_text(self) -> Result<String> {
        if self.stop_reason.as_deref() == Some("max_tokens") {
            log::warn!("Model output was cut off at the token limit");
        }
        self.content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| {
                Error::MalformedResponse("model response has no text content".to_string())
            })
    }
}

/// A hosted language model.
pub trait LanguageModel: Send + Sync {
    /// Identifier of the model being called.
    fn model_id(&self) -> &str;

    /// Run one request and return the generated text.
    fn invoke(&self, request: &ModelRequest) -> Result<String>;
}
