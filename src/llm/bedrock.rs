//! Amazon Bedrock invoke-model client for Anthropic models.

use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde::Serialize;

use super::{LanguageModel, Message, ModelRequest, ModelResponse};
use crate::aws::AwsContext;
use crate::error::{Error, Result};

/// Default model: Claude 3 Haiku.
pub const DEFAULT_BEDROCK_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const JSON: &str = "application/json";

#[derive(Debug, Serialize)]
struct InvokeBody<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f32,
    messages: &'a [Message],
}

/// [`LanguageModel`] served through Bedrock's `InvokeModel` API.
#[derive(Debug, Clone)]
pub struct BedrockModel {
    model_id: String,
    client: Client,
    aws: AwsContext,
}

impl BedrockModel {
    /// Client for [`DEFAULT_BEDROCK_MODEL`] in the context's region.
    pub fn new(aws: &AwsContext) -> Self {
        Self::with_model(aws, DEFAULT_BEDROCK_MODEL)
    }

    /// Client for a specific model id.
    pub fn with_model(aws: &AwsContext, model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            client: Client::new(aws.sdk_config()),
            aws: aws.clone(),
        }
    }

    fn body(request: &ModelRequest) -> Result<Vec<u8>> {
        let body = InvokeBody {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: &request.messages,
        };
        Ok(serde_json::to_vec(&body)?)
    }

    async fn invoke_model(&self, body: Vec<u8>) -> Result<String> {
        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type(JSON)
            .accept(JSON)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                Error::Model(format!("Bedrock {}: {}", self.model_id, DisplayErrorContext(e)))
            })?;

        ModelResponse::from_slice(output.body().as_ref())?.into_text()
    }
}

impl LanguageModel for BedrockModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn invoke(&self, request: &ModelRequest) -> Result<String> {
        log::info!("Invoking model {}", self.model_id);
        let body = Self::body(request)?;
        self.aws.block_on(self.invoke_model(body))
    }
}
