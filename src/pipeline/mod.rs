//! Pipeline stages for invoice line-item extraction.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm/openai ──▶ parse
//! (path/URL)  (pages)   (base64)   (one call)    (rows)
//! ```
//!
//! 1. [`input`]:  read the local file or download the URL into a `Document`
//! 2. [`render`]: split into page images; pdfium runs in `spawn_blocking`
//! 3. [`encode`]: PNG-encode and base64-wrap each page
//! 4. [`llm`]:    the `ExtractionClient` seam and the edgequake-llm backend;
//!    [`openai`] is the direct Responses API client
//! 5. [`parse`]:  strict JSON-array decoding into line items

pub mod encode;
pub mod input;
pub mod llm;
pub mod openai;
pub mod parse;
pub mod render;
