//! Tells the authoritative summary row of an extracted table apart from
//! subtotals and line items, using only the text of its cells.

use serde_json::Value;

use crate::types::ExtractedRow;

/// Substrings that disqualify a row from being the canonical total.
/// Checked as substrings, so they win over the narrower total match below.
const EXCLUDED_TOTAL_MARKERS: &[&str] = &[
    "subtotal",
    "sub total",
    "sub-total",
    "grand total",
    "final total",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Total,
    ExcludedTotal,
    Data,
}

/// Stringify a cell the way the AI output reads when rendered as text.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn is_total_label(text: &str) -> bool {
    text == "total" || text == "totals" || text.starts_with("total ") || text.ends_with(" total")
}

fn is_excluded_label(text: &str) -> bool {
    EXCLUDED_TOTAL_MARKERS.iter().any(|m| text.contains(m))
}

pub fn classify_row(row: &ExtractedRow) -> RowKind {
    let mut has_total = false;
    let mut has_excluded = false;
    for value in row.values() {
        let text = cell_text(value).to_lowercase();
        let text = text.trim();
        has_total |= is_total_label(text);
        has_excluded |= is_excluded_label(text);
    }

    if has_excluded {
        RowKind::ExcludedTotal
    } else if has_total {
        RowKind::Total
    } else {
        RowKind::Data
    }
}
