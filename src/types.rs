//! Wire shapes returned by the AI extraction collaborator.
//!
//! The AI output is an unvalidated JSON blob, so everything here is probed
//! field by field instead of derived: missing keys, wrong types and odd rows
//! degrade to defaults rather than failing the whole document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::key_resolver::parse_numeric;

/// One table row as the AI produced it: column name -> cell value, in column order.
pub type ExtractedRow = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPage {
    pub page_number: u32,
    pub rows: Vec<ExtractedRow>,
    pub summary_text: String,
}

/// Full per-document extraction: pages in extraction order plus the model's confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub confidence: f64,
    pub pages: Vec<ExtractedPage>,
    /// Whether the payload carried `pages` as an array at all.
    #[serde(skip)]
    pub pages_present: bool,
}

impl ExtractionResult {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(&value))
    }

    /// Build from `{ confidence, pages: [{ pageNumber, tableData, summary }] }`.
    pub fn from_value(value: &Value) -> Self {
        let confidence = value.get("confidence").map(value_as_f64).unwrap_or(0.0);
        let raw_pages = value.get("pages").and_then(|p| p.as_array());
        if raw_pages.is_none() && value.get("pages").is_some() {
            tracing::warn!("pages is not an array; treating extraction as pageless");
        }

        let pages: Vec<ExtractedPage> = raw_pages
            .map(|raw| {
                raw.iter()
                    .enumerate()
                    .map(|(idx, page)| parse_page(page, idx as u32 + 1))
                    .collect()
            })
            .unwrap_or_default();

        ExtractionResult {
            confidence,
            pages,
            pages_present: raw_pages.is_some(),
        }
    }

    /// True only when the AI returned `pages: []`. A missing or malformed
    /// `pages` is not a rejection; it just reduces to zero totals.
    pub fn is_empty(&self) -> bool {
        self.pages_present && self.pages.is_empty()
    }
}

fn parse_page(page: &Value, position: u32) -> ExtractedPage {
    let page_number = page
        .get("pageNumber")
        .and_then(|n| n.as_u64())
        .filter(|n| *n >= 1)
        .map(|n| n as u32)
        .unwrap_or(position);

    let rows = match page.get("tableData").and_then(|t| t.as_array()) {
        Some(rows) => rows
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .collect(),
        None => {
            if page.get("tableData").is_some() {
                tracing::warn!(page_number, "tableData is not an array; treating page as empty");
            }
            Vec::new()
        }
    };

    let summary_text = page
        .get("summary")
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_string();

    ExtractedPage {
        page_number,
        rows,
        summary_text,
    }
}

/// One named entity listed on an association/summary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationEntry {
    pub id: String,
    pub name: String,
    pub total_area: f64,
    pub confidence: f64,
    pub usage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// AI output for documents scanned in summary mode: `{ associations: [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryExtraction {
    pub associations: Vec<AssociationEntry>,
}

impl SummaryExtraction {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        let empty: Vec<Value> = vec![];
        let raw = value
            .get("associations")
            .and_then(|a| a.as_array())
            .unwrap_or(&empty);

        let associations = raw
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_object())
            .map(|(idx, entry)| {
                let text = |key: &str| -> Option<String> {
                    entry.get(key).and_then(|v| match v {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                };
                AssociationEntry {
                    id: text("id").unwrap_or_else(|| (idx + 1).to_string()),
                    name: text("name").unwrap_or_default(),
                    total_area: entry
                        .get("totalArea")
                        .map(value_as_f64)
                        .unwrap_or(0.0)
                        .max(0.0),
                    confidence: entry.get("confidence").map(value_as_f64).unwrap_or(0.0),
                    usage: text("usage").unwrap_or_default(),
                    notice: text("notice").filter(|s| !s.is_empty()),
                }
            })
            .collect();

        SummaryExtraction { associations }
    }
}

/// Numbers pass through; strings go through the same coercion as table cells.
fn value_as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_numeric(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_pages_and_rows() {
        let raw = json!({
            "confidence": 87,
            "pages": [
                { "pageNumber": 1, "tableData": [{ "Area": "10" }], "summary": "first" },
                { "pageNumber": 2, "tableData": [{ "Description": "Total", "Area": 125 }] }
            ]
        });
        let result = ExtractionResult::from_value(&raw);
        assert_eq!(result.confidence, 87.0);
        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.pages[0].summary_text, "first");
        assert_eq!(result.pages[1].page_number, 2);
        assert_eq!(result.pages[1].rows[0]["Area"], json!(125));
    }

    #[test]
    fn tolerates_missing_and_malformed_fields() {
        let raw = json!({
            "pages": [
                { "tableData": "not a table" },
                { "tableData": [1, "x", { "Area": "5" }] },
                "garbage"
            ]
        });
        let result = ExtractionResult::from_value(&raw);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.pages.len(), 3);
        assert!(result.pages[0].rows.is_empty());
        assert_eq!(result.pages[1].rows.len(), 1);
        assert_eq!(result.pages[1].page_number, 2);
        assert!(result.pages[2].rows.is_empty());
    }

    #[test]
    fn only_an_explicit_empty_array_is_empty() {
        let explicit = ExtractionResult::from_value(&json!({ "confidence": 40, "pages": [] }));
        assert!(explicit.is_empty());
        assert!(explicit.pages_present);

        let missing = ExtractionResult::from_value(&json!({ "confidence": 40 }));
        assert!(!missing.is_empty());
        assert!(missing.pages.is_empty());
        assert_eq!(missing.confidence, 40.0);

        let malformed = ExtractionResult::from_value(&json!({ "pages": "oops" }));
        assert!(!malformed.is_empty());
        assert!(!malformed.pages_present);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ExtractionResult::from_json_str("{not json").is_err());
    }

    #[test]
    fn row_keeps_column_order() {
        let result = ExtractionResult::from_json_str(
            r#"{"pages":[{"tableData":[{"b":1,"a":2,"c":3}]}]}"#,
        )
        .unwrap();
        let keys: Vec<&str> = result.pages[0].rows[0].keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn summary_extraction_coerces_areas() {
        let raw = json!({
            "associations": [
                { "id": "a1", "name": "North Farmers", "totalArea": "1,200.5 ha", "confidence": 90, "usage": "irrigation" },
                { "name": "South", "totalArea": 300, "usage": "grazing", "notice": "partial" },
                { "name": "Broken", "totalArea": "n/a" },
                42
            ]
        });
        let summary = SummaryExtraction::from_value(&raw);
        assert_eq!(summary.associations.len(), 3);
        assert_eq!(summary.associations[0].total_area, 1200.5);
        assert_eq!(summary.associations[1].id, "2");
        assert_eq!(summary.associations[1].notice.as_deref(), Some("partial"));
        assert_eq!(summary.associations[2].total_area, 0.0);
    }
}
