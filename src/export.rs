//! Spreadsheet export: [`ResultTable`] → `invoice_output.xlsx`.
//!
//! One worksheet, a bold header row with the five column names, then one row
//! per line item. Every value goes in as a text cell. Missing fields are
//! written as text-formatted blanks so an item with no known fields still
//! occupies its row.

use crate::error::InvoiceError;
use crate::table::{LineItem, ResultTable};
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name offered for download.
pub const OUTPUT_FILE_NAME: &str = "invoice_output.xlsx";

/// Standard spreadsheet MIME type.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Worksheet holding the line items.
pub const SHEET_NAME: &str = "Sheet1";

/// A generated workbook held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ExportedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl ExportedFile {
    /// Write into `dir` as [`OUTPUT_FILE_NAME`], replacing any previous file.
    ///
    /// Uses atomic write (temp file + rename) so a crash never leaves a
    /// half-written workbook behind.
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, InvoiceError> {
        let dir = dir.as_ref();
        let path = dir.join(self.file_name);

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| InvoiceError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        let tmp_path = path.with_extension("xlsx.tmp");
        tokio::fs::write(&tmp_path, &self.bytes)
            .await
            .map_err(|e| InvoiceError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| InvoiceError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        info!("Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Serialise the table to an xlsx workbook.
///
/// Callers check [`ResultTable::is_empty`] first; an empty table still
/// yields a valid header-only workbook.
pub fn to_xlsx(table: &ResultTable) -> Result<ExportedFile, InvoiceError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let text = Format::new().set_num_format("@");

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in LineItem::COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (i, item) in table.items.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, cell) in item.cells().iter().enumerate() {
            match cell {
                Some(value) if !value.is_empty() => {
                    sheet.write_string_with_format(row, col as u16, *value, &text)?;
                }
                _ => {
                    sheet.write_blank(row, col as u16, &text)?;
                }
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    debug!("Built workbook: {} rows, {} bytes", table.len(), bytes.len());

    Ok(ExportedFile {
        file_name: OUTPUT_FILE_NAME,
        mime_type: XLSX_MIME,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Reader, Xlsx};
    use std::io::Cursor;

    fn item(q: &str, product: &str, total: Option<&str>) -> LineItem {
        LineItem {
            quantity: Some(q.into()),
            product: Some(product.into()),
            line_total: total.map(Into::into),
            ..Default::default()
        }
    }

    /// Rows the sheet declares, header included, whether or not they hold values.
    fn declared_rows(bytes: &[u8]) -> u32 {
        let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec())).unwrap();
        let reader = wb.worksheet_cells_reader(SHEET_NAME).unwrap();
        reader.dimensions().end.0 + 1
    }

    fn read_rows(bytes: &[u8]) -> Vec<Vec<String>> {
        let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec())).unwrap();
        let range = wb.worksheet_range(SHEET_NAME).unwrap();
        range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn file_metadata() {
        let file = to_xlsx(&ResultTable::new()).unwrap();
        assert_eq!(file.file_name, "invoice_output.xlsx");
        assert_eq!(file.mime_type, XLSX_MIME);
        assert_eq!(&file.bytes[..2], b"PK");
    }

    #[test]
    fn header_and_rows_in_order() {
        let mut table = ResultTable::new();
        table.extend(vec![item("2", "Bolts", Some("4.00")), item("1", "Drill", None)]);

        let rows = read_rows(&to_xlsx(&table).unwrap().bytes);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], ["Quantity", "Unit", "Product", "Unit Price", "Line Total"]);
        assert_eq!(rows[1], ["2", "", "Bolts", "", "4.00"]);
        assert_eq!(rows[2], ["1", "", "Drill", "", ""]);
    }

    #[test]
    fn numeric_looking_values_stay_text() {
        let mut table = ResultTable::new();
        table.extend(vec![item("007", "Spy kit", Some("1,000.00"))]);
        let rows = read_rows(&to_xlsx(&table).unwrap().bytes);
        assert_eq!(rows[1][0], "007");
        assert_eq!(rows[1][4], "1,000.00");
    }

    #[test]
    fn trailing_items_without_fields_keep_their_rows() {
        let mut table = ResultTable::new();
        table.extend(vec![
            item("1", "Hinge", Some("2.50")),
            LineItem::default(),
            LineItem {
                product: Some(String::new()),
                ..Default::default()
            },
        ]);

        let bytes = to_xlsx(&table).unwrap().bytes;
        assert_eq!(declared_rows(&bytes), 1 + table.len() as u32);
        assert_eq!(read_rows(&bytes)[1], ["1", "", "Hinge", "", "2.50"]);
    }

    #[tokio::test]
    async fn write_to_dir_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = to_xlsx(&ResultTable::new()).unwrap();

        std::fs::write(dir.path().join(OUTPUT_FILE_NAME), b"stale").unwrap();
        let path = file.write_to_dir(dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join(OUTPUT_FILE_NAME));
        assert_eq!(std::fs::read(&path).unwrap(), file.bytes);
        assert!(!dir.path().join("invoice_output.xlsx.tmp").exists());
    }
}
