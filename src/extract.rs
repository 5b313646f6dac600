//! Extraction entry points.
//!
//! Every function funnels into [`extract_pages`], which walks the pages
//! strictly in order: encode, one model call, parse, accumulate. A fatal
//! error at any page ends the run; a page whose reply is not a JSON array
//! of objects is recorded as a diagnostic and skipped.

use crate::config::ExtractionConfig;
use crate::document::{Document, MediaType};
use crate::error::InvoiceError;
use crate::output::{ExtractionOutput, ExtractionStats, SavedExtraction};
use crate::pipeline::llm::ExtractionClient;
use crate::pipeline::render::Page;
use crate::pipeline::{encode, input, parse, render};
use crate::table::ResultTable;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract line items from a document.
///
/// # Returns
/// `Ok(ExtractionOutput)` even when some or all pages produced diagnostics;
/// check [`ExtractionOutput::is_empty`] for the "no items" outcome.
///
/// # Errors
/// Returns `Err(InvoiceError)` only for fatal errors: the document cannot be
/// decoded, a page cannot be encoded, or a model call fails.
pub async fn extract(
    document: Document,
    client: &dyn ExtractionClient,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, InvoiceError> {
    info!("Starting extraction: {} ({})", document.label(), document.media_type);

    let render_start = Instant::now();
    let pages = render::load_pages(document, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let mut output = extract_pages(pages, client, config).await?;
    output.stats.render_duration_ms = render_duration_ms;
    output.stats.total_duration_ms += render_duration_ms;
    Ok(output)
}

/// Resolve a local path or URL, then [`extract`].
pub async fn extract_path(
    input_str: impl AsRef<str>,
    media_type: Option<MediaType>,
    client: &dyn ExtractionClient,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, InvoiceError> {
    let document = input::resolve_input(input_str.as_ref(), media_type, config.download_timeout_secs).await?;
    extract(document, client, config).await
}

/// Run the per-page loop over already-loaded pages.
pub async fn extract_pages(
    pages: Vec<Page>,
    client: &dyn ExtractionClient,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, InvoiceError> {
    let start = Instant::now();
    let total_pages = pages.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_loaded(total_pages);
    }

    let mut table = ResultTable::new();
    let mut diagnostics = Vec::new();
    let mut stats = ExtractionStats {
        total_pages,
        ..Default::default()
    };

    for page in pages {
        let page_num = page.page_num();
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }
        debug!("Processing page {}/{} via {}", page_num, total_pages, client.name());

        let encoded = encode::encode_page(&page)?;
        drop(page);

        let call_start = Instant::now();
        let reply = client.extract(&encoded, config).await?;
        stats.model_duration_ms += call_start.elapsed().as_millis() as u64;
        stats.total_input_tokens += reply.input_tokens.unwrap_or(0);
        stats.total_output_tokens += reply.output_tokens.unwrap_or(0);
        drop(encoded);

        match parse::parse_page(page_num, &reply.text) {
            Ok(items) => {
                stats.parsed_pages += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_complete(page_num, total_pages, items.len());
                }
                table.extend(items);
            }
            Err(diagnostic) => {
                warn!("{}", diagnostic);
                stats.failed_pages += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_invalid(page_num, total_pages, &diagnostic);
                }
                diagnostics.push(diagnostic);
            }
        }
    }

    stats.total_items = table.len();
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    if table.is_empty() {
        warn!("No line items extracted from {} page(s)", total_pages);
    } else {
        info!(
            "Extraction complete: {} items from {}/{} pages, {}ms",
            stats.total_items, stats.parsed_pages, total_pages, stats.total_duration_ms
        );
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(total_pages, stats.total_items, stats.failed_pages);
    }

    Ok(ExtractionOutput {
        table,
        diagnostics,
        stats,
    })
}

/// Extract and write `invoice_output.xlsx` into `dir` when items exist.
pub async fn extract_to_dir(
    document: Document,
    client: &dyn ExtractionClient,
    config: &ExtractionConfig,
    dir: impl AsRef<Path>,
) -> Result<SavedExtraction, InvoiceError> {
    let output = extract(document, client, config).await?;
    let path = match output.export()? {
        Some(file) => Some(file.write_to_dir(dir).await?),
        None => None,
    };
    Ok(SavedExtraction { output, path })
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
///
/// # Panics
/// Panics when called from within a tokio runtime; use [`extract`] there.
pub fn extract_sync(
    document: Document,
    client: &dyn ExtractionClient,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, InvoiceError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| InvoiceError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(document, client, config))
}

/// Number of pages the document will be split into. No model call.
pub async fn count_pages(document: &Document, config: &ExtractionConfig) -> Result<usize, InvoiceError> {
    render::count_pages(document, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::EncodedPage;
    use crate::pipeline::llm::ModelReply;
    use crate::progress::ExtractionProgressCallback;
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct Scripted(Mutex<VecDeque<Result<ModelReply, InvoiceError>>>);

    impl Scripted {
        fn replies(texts: &[&str]) -> Self {
            Self(Mutex::new(texts.iter().map(|t| Ok(ModelReply::text(*t))).collect()))
        }
    }

    #[async_trait]
    impl ExtractionClient for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn extract(&self, _page: &EncodedPage, _config: &ExtractionConfig) -> Result<ModelReply, InvoiceError> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(InvoiceError::Internal("no reply left".into())))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ExtractionProgressCallback for Recorder {
        fn on_document_loaded(&self, total: usize) {
            self.0.lock().unwrap().push(format!("loaded {total}"));
        }
        fn on_page_start(&self, page: usize, _total: usize) {
            self.0.lock().unwrap().push(format!("start {page}"));
        }
        fn on_page_complete(&self, page: usize, _total: usize, item_count: usize) {
            self.0.lock().unwrap().push(format!("ok {page} {item_count}"));
        }
        fn on_page_invalid(&self, page: usize, _total: usize, _error: &crate::error::PageError) {
            self.0.lock().unwrap().push(format!("invalid {page}"));
        }
        fn on_extraction_complete(&self, total_pages: usize, item_count: usize, failed_pages: usize) {
            self.0
                .lock()
                .unwrap()
                .push(format!("done {total_pages} {item_count} {failed_pages}"));
        }
    }

    fn pages(n: usize) -> Vec<Page> {
        (0..n).map(|i| Page::new(i, DynamicImage::new_rgb8(2, 2))).collect()
    }

    #[tokio::test]
    async fn invalid_page_is_skipped_and_reported() {
        let client = Scripted::replies(&[r#"[{"Product": "A"}]"#, "not json", r#"[{"Product": "B"}, {"Product": "C"}]"#]);
        let recorder = Arc::new(Recorder::default());
        let config = ExtractionConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();

        let output = extract_pages(pages(3), &client, &config).await.unwrap();

        assert_eq!(output.table.len(), 3);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].page(), 2);
        assert_eq!(output.stats.parsed_pages, 2);
        assert_eq!(output.stats.failed_pages, 1);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            [
                "loaded 3", "start 1", "ok 1 1", "start 2", "invalid 2", "start 3", "ok 3 2", "done 3 3 1"
            ]
        );
    }

    fn png_document() -> Document {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Document::new(buf, MediaType::Png)
    }

    #[test]
    fn extract_sync_runs_without_a_runtime() {
        let client = Scripted::replies(&[r#"[{"Product": "Sealant"}]"#]);
        let output = extract_sync(png_document(), &client, &ExtractionConfig::default()).unwrap();
        assert_eq!(output.table.len(), 1);
    }

    #[tokio::test]
    async fn client_failure_is_fatal() {
        let client = Scripted(Mutex::new(VecDeque::from([
            Ok(ModelReply::text("[]")),
            Err(InvoiceError::LlmApiError {
                page: 2,
                message: "boom".into(),
            }),
        ])));
        let err = extract_pages(pages(3), &client, &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::LlmApiError { page: 2, .. }));
    }

    #[tokio::test]
    async fn token_usage_is_summed() {
        let reply = |i, o| {
            Ok(ModelReply {
                text: "[]".into(),
                input_tokens: Some(i),
                output_tokens: Some(o),
            })
        };
        let client = Scripted(Mutex::new(VecDeque::from([reply(100, 5), reply(120, 7)])));
        let output = extract_pages(pages(2), &client, &ExtractionConfig::default())
            .await
            .unwrap();
        assert!(output.is_empty());
        assert_eq!(output.stats.total_input_tokens, 220);
        assert_eq!(output.stats.total_output_tokens, 12);
    }
}
