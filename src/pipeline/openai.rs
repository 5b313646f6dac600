//! Direct OpenAI Responses API client.
//!
//! `POST {base_url}/responses` with a system message and one `input_image`
//! data URL. The HTTP client is built once with proxies disabled so calls
//! always go straight to the endpoint in [`ApiConfig::base_url`], whatever
//! `HTTP(S)_PROXY` says.

use crate::config::{ApiConfig, ExtractionConfig};
use crate::error::InvoiceError;
use crate::pipeline::encode::EncodedPage;
use crate::pipeline::llm::{ExtractionClient, ModelReply};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    max_output_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    InputImage { image_url: String },
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl ResponsesResponse {
    /// Concatenate every `output_text` part, in order.
    fn output_text(&self) -> String {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|c| c.kind == "output_text")
            .filter_map(|c| c.text.as_deref())
            .collect()
    }
}

fn build_request<'a>(
    model: &'a str,
    prompt: &'a str,
    page: &EncodedPage,
    config: &ExtractionConfig,
) -> ResponsesRequest<'a> {
    ResponsesRequest {
        model,
        input: vec![
            InputMessage {
                role: "system",
                content: MessageContent::Text(prompt),
            },
            InputMessage {
                role: "user",
                content: MessageContent::Parts(vec![ContentPart::InputImage {
                    image_url: page.data_url(),
                }]),
            },
        ],
        max_output_tokens: config.max_output_tokens,
        temperature: config.temperature,
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// [`ExtractionClient`] for the OpenAI Responses API.
#[derive(Clone)]
pub struct ResponsesClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ResponsesClient {
    /// Build the client from an [`ApiConfig`].
    pub fn new(api: &ApiConfig) -> Result<Self, InvoiceError> {
        if !api.ignored_proxy_vars.is_empty() {
            debug!(
                "Ignoring proxy variables for model calls: {}",
                api.ignored_proxy_vars.join(", ")
            );
        }

        let http_client = Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| InvoiceError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key: api.api_key.clone(),
            model: api.model.clone(),
            base_url: api.base_url.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

#[async_trait]
impl ExtractionClient for ResponsesClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn extract(&self, page: &EncodedPage, config: &ExtractionConfig) -> Result<ModelReply, InvoiceError> {
        let start = Instant::now();
        let request = build_request(&self.model, config.prompt(), page, config);

        let response = self
            .http_client
            .post(self.endpoint())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Responses request failed");
                InvoiceError::RequestFailed {
                    page: page.page_num,
                    detail: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "Responses API error");
            return Err(status_error(status, page.page_num, body, retry_after));
        }

        let parsed: ResponsesResponse = response.json().await.map_err(|e| InvoiceError::LlmApiError {
            page: page.page_num,
            message: format!("unreadable response body: {e}"),
        })?;

        let usage = parsed.usage.as_ref();
        let reply = ModelReply {
            text: parsed.output_text(),
            input_tokens: usage.map(|u| u.input_tokens),
            output_tokens: usage.map(|u| u.output_tokens),
        };

        debug!(
            page = page.page_num,
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            chars = reply.text.len(),
            "Responses API call"
        );

        Ok(reply)
    }
}

/// Map a non-2xx status to the fatal error the user sees.
fn status_error(status: StatusCode, page: usize, body: String, retry_after_secs: Option<u64>) -> InvoiceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InvoiceError::AuthError {
            provider: "openai".to_string(),
            detail: body,
        },
        StatusCode::TOO_MANY_REQUESTS => InvoiceError::RateLimitExceeded {
            provider: "openai".to_string(),
            retry_after_secs,
        },
        _ => InvoiceError::LlmApiError {
            page,
            message: format!("HTTP {status}: {body}"),
        },
    }
}
