//! Input resolution: turn a user-supplied path or URL into an in-memory
//! [`Document`].
//!
//! The media type is taken from the caller's override when given, otherwise
//! from the file extension (local files) or the `Content-Type` header falling
//! back to the URL extension (downloads). Bytes are never sniffed: a PDF
//! declared as PNG fails at decode time, as a corrupt upload would.

use crate::document::{Document, MediaType};
use crate::error::InvoiceError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a [`Document`].
pub async fn resolve_input(
    input: &str,
    media_type: Option<MediaType>,
    timeout_secs: u64,
) -> Result<Document, InvoiceError> {
    if input.trim().is_empty() {
        return Err(InvoiceError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, media_type, timeout_secs).await
    } else {
        read_local(input, media_type).await
    }
}

/// Read a local file, validating existence and readability.
async fn read_local(path_str: &str, media_type: Option<MediaType>) -> Result<Document, InvoiceError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(InvoiceError::FileNotFound { path });
    }

    // The extension check runs before the read so a wrong file type fails fast.
    let media_type = match media_type {
        Some(mt) => mt,
        None => MediaType::from_path(&path)?,
    };

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => InvoiceError::PermissionDenied { path: path.clone() },
        _ => InvoiceError::FileNotFound { path: path.clone() },
    })?;

    debug!("Read {} ({}, {} bytes)", path.display(), media_type, bytes.len());
    Ok(Document::new(bytes, media_type).with_name(display_name(&path)))
}

/// Download a URL into memory.
async fn download_url(
    url: &str,
    media_type: Option<MediaType>,
    timeout_secs: u64,
) -> Result<Document, InvoiceError> {
    info!("Downloading invoice from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            InvoiceError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            InvoiceError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let media_type = match media_type {
        Some(mt) => mt,
        None => media_type_for_download(url, header_type.as_deref())?,
    };

    let bytes = response
        .bytes()
        .await
        .map_err(|e| InvoiceError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes ({})", bytes.len(), media_type);
    Ok(Document::new(bytes.to_vec(), media_type).with_name(url))
}

/// Pick the media type of a download: `Content-Type` first, then the URL path.
///
/// Generic types such as `application/octet-stream` fall through to the
/// extension.
fn media_type_for_download(url: &str, content_type: Option<&str>) -> Result<MediaType, InvoiceError> {
    if let Some(ct) = content_type {
        if let Ok(mt) = MediaType::from_mime(ct) {
            return Ok(mt);
        }
    }

    let path_part = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments().and_then(|mut s| s.next_back().map(str::to_string)))
        .unwrap_or_default();

    MediaType::from_path(Path::new(&path_part)).map_err(|_| InvoiceError::UnsupportedMediaType {
        media_type: content_type.unwrap_or("<unknown>").to_string(),
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
