//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks the document. The CLI uses it for the
//! "Detected N page(s)" line, the per-page log and the raw-reply dump of
//! pages whose output was not valid JSON.
//!
//! # Example
//!
//! ```rust
//! use invoice2xlsx::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct ItemCounter {
//!     items: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for ItemCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, item_count: usize) {
//!         self.items.fetch_add(item_count, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} items", page_num, total_pages, item_count);
//!     }
//! }
//!
//! let counter = Arc::new(ItemCounter { items: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PageError;
use std::sync::Arc;

/// Called by the extraction pipeline as it processes each page.
///
/// Pages are processed one at a time, so events arrive in page order. All
/// methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the document has been split into pages.
    fn on_document_loaded(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the page is sent to the model.
    ///
    /// # Arguments
    /// * `page_num`:    1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when the page reply parsed into line items (possibly zero).
    fn on_page_complete(&self, page_num: usize, total_pages: usize, item_count: usize) {
        let _ = (page_num, total_pages, item_count);
    }

    /// Called when the page reply was not a JSON array of objects.
    ///
    /// `diagnostic.raw()` holds the unparsed model output.
    fn on_page_invalid(&self, page_num: usize, total_pages: usize, diagnostic: &PageError) {
        let _ = (page_num, total_pages, diagnostic);
    }

    /// Called once after every page has been attempted.
    ///
    /// # Arguments
    /// * `total_pages`:  pages in the document
    /// * `item_count`:   line items in the final table
    /// * `failed_pages`: pages that produced a diagnostic
    fn on_extraction_complete(&self, total_pages: usize, item_count: usize, failed_pages: usize) {
        let _ = (total_pages, item_count, failed_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
