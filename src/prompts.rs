//! System prompt for invoice line-item extraction.
//!
//! Kept in one place so the tests can inspect it and so
//! [`crate::config::ExtractionConfig::system_prompt`] has a single default
//! to fall back to.

/// Column names the model is asked to produce, in spreadsheet order.
pub const LINE_ITEM_KEYS: [&str; 5] = ["Quantity", "Unit", "Product", "Unit Price", "Line Total"];

/// Default system prompt sent with every page image.
pub const LINE_ITEM_PROMPT: &str = r#"You are an invoice parser.
Extract ONLY line items. Return STRICT JSON array.

Format:
[
  {
    "Quantity": "...",
    "Unit": "...",
    "Product": "...",
    "Unit Price": "...",
    "Line Total": "..."
  }
]"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_column() {
        for key in LINE_ITEM_KEYS {
            assert!(
                LINE_ITEM_PROMPT.contains(&format!("\"{key}\"")),
                "prompt is missing {key}"
            );
        }
    }

    #[test]
    fn prompt_demands_strict_json_array() {
        assert!(LINE_ITEM_PROMPT.contains("STRICT JSON array"));
        assert!(LINE_ITEM_PROMPT.contains("ONLY line items"));
    }
}
