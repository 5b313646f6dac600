//! Error types for the invoice2xlsx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`InvoiceError`]: **Fatal**: the run cannot proceed at all (unreadable
//!   upload, corrupt PDF, model endpoint unreachable or rejecting the call).
//!   Returned as `Err(InvoiceError)` from the top-level `extract*` functions.
//!
//! * [`PageError`]: **Non-fatal**: the model answered for one page but the
//!   text was not a JSON array of objects. Stored in
//!   [`crate::output::ExtractionOutput::diagnostics`] together with the raw
//!   reply; that page contributes no line items and the run continues.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice2xlsx library.
#[derive(Debug, Error)]
pub enum InvoiceError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The declared content type is not PDF, PNG or JPEG.
    #[error("Unsupported media type '{media_type}'\nAccepted: application/pdf, image/png, image/jpeg.")]
    UnsupportedMediaType { media_type: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The uploaded PNG/JPEG could not be decoded.
    #[error("Image could not be decoded: {detail}")]
    ImageDecodeFailed { detail: String },

    /// A page image could not be PNG-encoded for transport.
    #[error("Encoding page {page} failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The request never reached the model endpoint or the connection broke.
    #[error("Request for page {page} failed: {detail}")]
    RequestFailed { page: usize, detail: String },

    /// The model API answered with an error or an unreadable body.
    #[error("LLM API error on page {page}: {message}")]
    LlmApiError { page: usize, message: String },

    /// Model API returned HTTP 429.
    ///
    /// The run does not retry; `retry_after_secs` is reported so the user
    /// knows how long to wait before triggering again.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Model API returned an authentication error (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The workbook could not be built.
    #[error("Failed to build spreadsheet: {0}")]
    ExportFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Rendering PDF invoices needs the PDFium shared library. You can:\n\
  • Place libpdfium next to the working directory.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
  • Install it system-wide (https://github.com/bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rust_xlsxwriter::XlsxError> for InvoiceError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        InvoiceError::ExportFailed(e.to_string())
    }
}

/// A non-fatal diagnostic for a single page whose reply was unusable.
///
/// Every variant keeps the raw model text so it can be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The reply is not valid JSON.
    #[error("Page {page}: model returned invalid JSON: {detail}")]
    InvalidJson {
        page: usize,
        detail: String,
        raw: String,
    },

    /// The reply is JSON, but not an array.
    #[error("Page {page}: expected a JSON array of line items, got {found}")]
    NotAnArray {
        page: usize,
        found: String,
        raw: String,
    },

    /// One array element is not an object; the whole page is dropped.
    #[error("Page {page}: element {position} of the line-item array is {found}, not an object")]
    NotAnObject {
        page: usize,
        position: usize,
        found: String,
        raw: String,
    },
}

impl PageError {
    /// 1-indexed page number the diagnostic refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::InvalidJson { page, .. }
            | PageError::NotAnArray { page, .. }
            | PageError::NotAnObject { page, .. } => *page,
        }
    }

    /// The raw model reply for the page.
    pub fn raw(&self) -> &str {
        match self {
            PageError::InvalidJson { raw, .. }
            | PageError::NotAnArray { raw, .. }
            | PageError::NotAnObject { raw, .. } => raw,
        }
    }
}
