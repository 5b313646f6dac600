//! Response parsing: one page's raw model text → line items or a diagnostic.
//!
//! The reply must be, in its entirety, a JSON array of objects. Anything
//! else becomes a [`PageError`] carrying the raw text; the caller records it
//! and moves on to the next page. No fence stripping or repair is attempted.

use crate::error::PageError;
use crate::table::LineItem;
use serde_json::Value;
use tracing::debug;

/// Parse the model reply for `page_num` (1-indexed).
pub fn parse_page(page_num: usize, raw: &str) -> Result<Vec<LineItem>, PageError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| PageError::InvalidJson {
        page: page_num,
        detail: e.to_string(),
        raw: raw.to_string(),
    })?;

    let elements = match value {
        Value::Array(elements) => elements,
        other => {
            return Err(PageError::NotAnArray {
                page: page_num,
                found: describe(&other).to_string(),
                raw: raw.to_string(),
            })
        }
    };

    let mut items = Vec::with_capacity(elements.len());
    for (position, element) in elements.iter().enumerate() {
        match element {
            Value::Object(object) => items.push(LineItem::from_json_object(object)),
            other => {
                return Err(PageError::NotAnObject {
                    page: page_num,
                    position,
                    found: describe(other).to_string(),
                    raw: raw.to_string(),
                })
            }
        }
    }

    debug!("Page {}: parsed {} line items", page_num, items.len());
    Ok(items)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_array_in_order() {
        let raw = r#"[
            {"Quantity": "1", "Unit": "pc", "Product": "Hammer", "Unit Price": "12.00", "Line Total": "12.00"},
            {"Quantity": "4", "Unit": "pc", "Product": "Nails", "Unit Price": "0.10", "Line Total": "0.40"}
        ]"#;
        let items = parse_page(1, raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product.as_deref(), Some("Hammer"));
        assert_eq!(items[1].product.as_deref(), Some("Nails"));
    }

    #[test]
    fn empty_array_is_success() {
        assert_eq!(parse_page(1, "[]").unwrap(), Vec::<LineItem>::new());
        assert_eq!(parse_page(1, "  [ ]\n").unwrap().len(), 0);
    }

    #[test]
    fn prose_is_invalid_json_with_raw_text() {
        let raw = "I'm sorry, the image is too blurry.";
        let err = parse_page(3, raw).unwrap_err();
        assert!(matches!(err, PageError::InvalidJson { page: 3, .. }));
        assert_eq!(err.raw(), raw);
    }

    #[test]
    fn fenced_json_is_not_repaired() {
        let raw = "```json\n[{\"Product\": \"X\"}]\n```";
        assert!(matches!(parse_page(1, raw), Err(PageError::InvalidJson { .. })));
    }

    #[test]
    fn truncated_reply_is_invalid_json() {
        let raw = r#"[{"Quantity": "1", "Product": "Cab"#;
        assert!(matches!(parse_page(2, raw), Err(PageError::InvalidJson { page: 2, .. })));
    }

    #[test]
    fn top_level_object_is_not_an_array() {
        let err = parse_page(1, r#"{"Product": "X"}"#).unwrap_err();
        match err {
            PageError::NotAnArray { found, .. } => assert_eq!(found, "an object"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn mixed_array_drops_whole_page() {
        let err = parse_page(5, r#"[{"Product": "X"}, "oops"]"#).unwrap_err();
        match err {
            PageError::NotAnObject { page, position, found, .. } => {
                assert_eq!(page, 5);
                assert_eq!(position, 1);
                assert_eq!(found, "a string");
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
