//! Line items and the accumulated result table.

use crate::prompts::LINE_ITEM_KEYS;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// One invoice row. Every field is free-form text as read by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "Quantity")]
    pub quantity: Option<String>,
    #[serde(rename = "Unit")]
    pub unit: Option<String>,
    #[serde(rename = "Product")]
    pub product: Option<String>,
    #[serde(rename = "Unit Price")]
    pub unit_price: Option<String>,
    #[serde(rename = "Line Total")]
    pub line_total: Option<String>,
}

impl LineItem {
    /// Spreadsheet column headers, in order.
    pub const COLUMNS: [&'static str; 5] = LINE_ITEM_KEYS;

    /// Decode one JSON object tolerantly.
    ///
    /// Keys match after trimming, lowercasing and reading `_`/`-` as spaces.
    /// Unknown keys are dropped. Scalars become text, `null` stays empty and
    /// nested values keep their compact JSON form.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut item = LineItem::default();
        for (key, value) in object {
            let slot = match normalise_key(key).as_str() {
                "quantity" => &mut item.quantity,
                "unit" => &mut item.unit,
                "product" => &mut item.product,
                "unit price" => &mut item.unit_price,
                "line total" => &mut item.line_total,
                _ => {
                    debug!("Ignoring unknown line-item key {:?}", key);
                    continue;
                }
            };
            *slot = value_to_text(value);
        }
        item
    }

    /// Cells in [`LineItem::COLUMNS`] order.
    pub fn cells(&self) -> [Option<&str>; 5] {
        [
            self.quantity.as_deref(),
            self.unit.as_deref(),
            self.product.as_deref(),
            self.unit_price.as_deref(),
            self.line_total.as_deref(),
        ]
    }
}

fn normalise_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_lowercase() })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
    }
}

/// Line items of a whole document in page-then-item order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    pub items: Vec<LineItem>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page's items, preserving their order.
    pub fn extend(&mut self, items: Vec<LineItem>) {
        self.items.extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &LineItem::COLUMNS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn decodes_exact_keys() {
        let item = LineItem::from_json_object(&obj(json!({
            "Quantity": "3",
            "Unit": "box",
            "Product": "A4 paper",
            "Unit Price": "4.50",
            "Line Total": "13.50"
        })));
        assert_eq!(item.cells(), [Some("3"), Some("box"), Some("A4 paper"), Some("4.50"), Some("13.50")]);
    }

    #[test]
    fn tolerates_key_spelling_and_scalar_types() {
        let item = LineItem::from_json_object(&obj(json!({
            "quantity": 2,
            "unit_price": 9.99,
            " LINE-TOTAL ": "19.98",
            "product": null,
            "Unit": true
        })));
        assert_eq!(item.quantity.as_deref(), Some("2"));
        assert_eq!(item.unit_price.as_deref(), Some("9.99"));
        assert_eq!(item.line_total.as_deref(), Some("19.98"));
        assert_eq!(item.product, None);
        assert_eq!(item.unit.as_deref(), Some("true"));
    }

    #[test]
    fn unknown_keys_are_ignored_and_missing_keys_empty() {
        let item = LineItem::from_json_object(&obj(json!({
            "Product": "Widget",
            "SKU": "W-1",
            "Discount": "5%"
        })));
        assert_eq!(
            item,
            LineItem {
                product: Some("Widget".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn nested_values_keep_json_text() {
        let item = LineItem::from_json_object(&obj(json!({"Product": ["a", "b"]})));
        assert_eq!(item.product.as_deref(), Some(r#"["a","b"]"#));
    }

    #[test]
    fn serialises_with_column_names() {
        let item = LineItem {
            unit_price: Some("1.00".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["Unit Price"], "1.00");
        assert!(v["Quantity"].is_null());
    }

    #[test]
    fn table_preserves_append_order() {
        let mut table = ResultTable::new();
        let named = |p: &str| LineItem {
            product: Some(p.into()),
            ..Default::default()
        };
        table.extend(vec![named("a"), named("b")]);
        table.extend(vec![]);
        table.extend(vec![named("c")]);
        let products: Vec<_> = table.items.iter().map(|i| i.product.clone().unwrap()).collect();
        assert_eq!(products, ["a", "b", "c"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns(), &LINE_ITEM_KEYS);
    }
}
