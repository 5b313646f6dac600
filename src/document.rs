//! The uploaded artifact: raw bytes plus the declared media type.

use crate::error::InvoiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Pdf,
    Png,
    Jpeg,
}

impl MediaType {
    /// Parse a declared MIME type (`application/pdf`, `image/png`, `image/jpeg`).
    ///
    /// Parameters such as `; charset=binary` are ignored.
    pub fn from_mime(mime: &str) -> Result<Self, InvoiceError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Ok(MediaType::Pdf),
            "image/png" => Ok(MediaType::Png),
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            _ => Err(InvoiceError::UnsupportedMediaType {
                media_type: mime.to_string(),
            }),
        }
    }

    /// Infer the media type from a file extension (`pdf`, `png`, `jpg`, `jpeg`).
    pub fn from_path(path: &Path) -> Result<Self, InvoiceError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(MediaType::Pdf),
            "png" => Ok(MediaType::Png),
            "jpg" | "jpeg" => Ok(MediaType::Jpeg),
            _ => Err(InvoiceError::UnsupportedMediaType {
                media_type: if ext.is_empty() {
                    format!("<no extension: {}>", path.display())
                } else {
                    format!(".{ext}")
                },
            }),
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Png => "image/png",
            MediaType::Jpeg => "image/jpeg",
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, MediaType::Pdf)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// An uploaded invoice, held entirely in memory.
#[derive(Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    /// File name or URL, used only in log lines.
    pub name: Option<String>,
}

impl Document {
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: MediaType) -> Self {
        Self {
            bytes: bytes.into(),
            media_type,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Human-readable label for logs.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<upload>")
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
