//! Result types returned by the extraction entry points.

use crate::error::{InvoiceError, PageError};
use crate::export::{self, ExportedFile};
use crate::table::ResultTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything one run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Line items from every page that parsed, in page-then-item order.
    pub table: ResultTable,
    /// One entry per page whose reply was unusable.
    pub diagnostics: Vec<PageError>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// `true` when no line items were extracted from any page.
    ///
    /// This is a valid outcome, not an error.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Build the spreadsheet, or `None` when there is nothing to export.
    pub fn export(&self) -> Result<Option<ExportedFile>, InvoiceError> {
        if self.is_empty() {
            return Ok(None);
        }
        export::to_xlsx(&self.table).map(Some)
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    pub parsed_pages: usize,
    pub failed_pages: usize,
    pub total_items: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub render_duration_ms: u64,
    pub model_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of [`crate::extract::extract_to_dir`].
#[derive(Debug, Clone)]
pub struct SavedExtraction {
    pub output: ExtractionOutput,
    /// Where the workbook was written; `None` when no items were extracted.
    pub path: Option<PathBuf>,
}
