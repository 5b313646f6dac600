//! # invoice2xlsx
//!
//! Extract invoice line items from a PDF or image into a spreadsheet using a
//! vision-capable language model.
//!
//! Each page is rasterised, sent to the model once with an instruction to
//! return a JSON array of line items, and the items from every page that
//! answered with valid JSON are collected into one table. The table is
//! offered as `invoice_output.xlsx`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Input   read a local file or download from URL
//!  ├─ 2. Render  one image per page via pdfium (spawn_blocking)
//!  ├─ 3. Encode  PNG → base64
//!  ├─ 4. Model   one call per page, strictly in order
//!  ├─ 5. Parse   JSON array of objects → LineItem rows, or a diagnostic
//!  └─ 6. Export  ResultTable → invoice_output.xlsx
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice2xlsx::{extract_path, ApiConfig, ExtractionConfig, ResponsesClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ResponsesClient::new(&ApiConfig::from_env()?)?;
//!     let config = ExtractionConfig::default();
//!     let output = extract_path("invoice.pdf", None, &client, &config).await?;
//!     for diag in &output.diagnostics {
//!         eprintln!("{diag}");
//!     }
//!     if let Some(file) = output.export()? {
//!         file.write_to_dir(".").await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice2xlsx` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ApiConfig, ExtractionConfig, ExtractionConfigBuilder};
pub use document::{Document, MediaType};
pub use error::{InvoiceError, PageError};
pub use export::{ExportedFile, OUTPUT_FILE_NAME};
pub use extract::{count_pages, extract, extract_pages, extract_path, extract_sync, extract_to_dir};
pub use output::{ExtractionOutput, ExtractionStats, SavedExtraction};
pub use pipeline::encode::EncodedPage;
pub use pipeline::llm::{ExtractionClient, ModelReply, ProviderClient};
pub use pipeline::openai::ResponsesClient;
pub use pipeline::render::Page;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use table::{LineItem, ResultTable};
