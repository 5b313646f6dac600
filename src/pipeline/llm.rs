//! Model interaction: the [`ExtractionClient`] seam and its edgequake-llm
//! backend.
//!
//! A client takes one [`EncodedPage`] and returns the model's raw text. It
//! does not parse, retry or cache: a failed call is fatal for the run, and
//! whether the text is usable is decided by [`crate::pipeline::parse`].
//!
//! Two implementations ship with the crate:
//!
//! * [`crate::pipeline::openai::ResponsesClient`]: the default; calls the
//!   OpenAI Responses API directly with an inline data-URL image and no proxy.
//! * [`ProviderClient`]: any edgequake-llm provider (Anthropic, Gemini,
//!   Ollama, …) with the image as a provider attachment.

use crate::config::ExtractionConfig;
use crate::error::InvoiceError;
use crate::pipeline::encode::EncodedPage;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Raw model output for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl ModelReply {
    /// A reply without token accounting.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Sends one page image plus the line-item instruction to a model.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// One request, no retry.
    ///
    /// The system prompt comes from [`ExtractionConfig::prompt`]; sampling
    /// from `config.temperature` and `config.max_output_tokens`.
    async fn extract(&self, page: &EncodedPage, config: &ExtractionConfig) -> Result<ModelReply, InvoiceError>;
}

/// [`ExtractionClient`] backed by an edgequake-llm provider.
///
/// Networking, including proxy handling, belongs to the provider library.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    name: String,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }

    /// Instantiate a named provider (`openai`, `anthropic`, `gemini`, `ollama`, …).
    ///
    /// The provider reads its own API key variable from the environment.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, InvoiceError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            InvoiceError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, provider_name))
    }
}

#[async_trait]
impl ExtractionClient for ProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, page: &EncodedPage, config: &ExtractionConfig) -> Result<ModelReply, InvoiceError> {
        let start = Instant::now();

        // The image carries all the content; the user turn needs no text.
        let messages = vec![
            ChatMessage::system(config.prompt()),
            ChatMessage::user_with_images("", vec![page.to_image_data()]),
        ];
        let options = build_options(config);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| InvoiceError::LlmApiError {
                page: page.page_num,
                message: format!("{}: {}", self.name, e),
            })?;

        debug!(
            "Page {}: {} input tokens, {} output tokens, {:?}",
            page.page_num,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(ModelReply {
            text: response.content,
            input_tokens: Some(response.prompt_tokens as u64),
            output_tokens: Some(response.completion_tokens as u64),
        })
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_output_tokens),
        ..Default::default()
    }
}
