//! Page encoding: `DynamicImage` → base64 PNG wrapped in [`EncodedPage`].
//!
//! PNG is lossless, so digits in a unit-price column reach the model exactly
//! as rendered. The payload can be sent either as an inline data URL
//! ([`EncodedPage::data_url`]) or as an edgequake-llm attachment
//! ([`EncodedPage::to_image_data`]).

use crate::error::InvoiceError;
use crate::pipeline::render::Page;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::io::Cursor;
use tracing::debug;

/// MIME type of every encoded page.
pub const PNG_MIME: &str = "image/png";

/// A page ready to be embedded in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Standard base64 of the PNG bytes.
    pub base64: String,
    pub mime_type: &'static str,
}

impl EncodedPage {
    /// `data:image/png;base64,...` for inline image inputs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// Attachment form for edgequake-llm providers.
    ///
    /// `detail: "high"` keeps OpenAI-style tiling at full resolution so small
    /// print in the line-item table stays legible.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.base64.clone(), self.mime_type).with_detail("high")
    }
}

/// Encode a page as a base64 PNG.
pub fn encode_page(page: &Page) -> Result<EncodedPage, InvoiceError> {
    let mut buf = Vec::new();
    page.image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| InvoiceError::EncodeFailed {
            page: page.page_num(),
            detail: e.to_string(),
        })?;

    let b64 = STANDARD.encode(&buf);
    debug!("Page {}: encoded {} PNG bytes → {} base64 bytes", page.page_num(), buf.len(), b64.len());

    Ok(EncodedPage {
        page_num: page.page_num(),
        base64: b64,
        mime_type: PNG_MIME,
    })
}
