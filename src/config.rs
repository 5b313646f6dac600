//! Configuration types for invoice extraction.
//!
//! Two structs, two lifetimes:
//!
//! * [`ExtractionConfig`]: per-run knobs (render DPI, prompt, sampling),
//!   built via [`ExtractionConfigBuilder`].
//! * [`ApiConfig`]: credentials and endpoint for the default
//!   [`crate::pipeline::openai::ResponsesClient`], read once at startup and
//!   handed to the client by reference.
//!
//! The environment is only ever read, never written. Proxy variables are
//! recorded in [`ApiConfig::ignored_proxy_vars`] and the HTTP client is built
//! with proxies disabled.

use crate::error::InvoiceError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default OpenAI model for invoice reading.
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Default OpenAI REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Proxy variables that are deliberately bypassed for model calls.
pub const PROXY_ENV_VARS: [&str; 6] = [
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "http_proxy",
    "https_proxy",
    "all_proxy",
];

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use invoice2xlsx::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .max_output_tokens(2000)
///     .build()
///     .unwrap();
/// assert_eq!(config.temperature, 0.0);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 200.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    ///
    /// Caps the longest edge regardless of DPI so an oversized page cannot
    /// exhaust memory or the model's upload limit.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Custom system prompt. If None, uses [`crate::prompts::LINE_ITEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 1500.
    ///
    /// A reply cut off by this ceiling is no longer valid JSON and surfaces
    /// as a page diagnostic.
    pub max_output_tokens: usize,

    /// Explicit path to the pdfium shared library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 4000,
            password: None,
            system_prompt: None,
            temperature: 0.0,
            max_output_tokens: 1500,
            pdfium_lib_path: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The system prompt actually sent to the model.
    pub fn prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::LINE_ITEM_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, InvoiceError> {
        let c = &self.config;
        if !(72..=600).contains(&c.dpi) {
            return Err(InvoiceError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(InvoiceError::InvalidConfig(format!(
                "Temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.max_output_tokens == 0 {
            return Err(InvoiceError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if matches!(&c.system_prompt, Some(p) if p.trim().is_empty()) {
            return Err(InvoiceError::InvalidConfig(
                "System prompt override is empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── API configuration ────────────────────────────────────────────────────

/// Credentials and endpoint for the OpenAI Responses API.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// REST base URL without trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,
    /// Proxy variables that were present in the environment and are bypassed.
    pub ignored_proxy_vars: Vec<String>,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("ignored_proxy_vars", &self.ignored_proxy_vars)
            .finish()
    }
}

impl ApiConfig {
    /// Build a config from an explicit key with default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            ignored_proxy_vars: Vec::new(),
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and the proxy variables from
    /// the process environment.
    pub fn from_env() -> Result<Self, InvoiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] but against any key→value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InvoiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| InvoiceError::ProviderNotConfigured {
                provider: "openai".to_string(),
                hint: "Set OPENAI_API_KEY (environment or .env file).".to_string(),
            })?;

        let base_url = lookup("OPENAI_BASE_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let ignored_proxy_vars = PROXY_ENV_VARS
            .iter()
            .filter(|name| lookup(name).is_some())
            .map(|name| name.to_string())
            .collect();

        Ok(Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            ignored_proxy_vars,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}
