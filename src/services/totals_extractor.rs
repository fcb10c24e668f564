//! Reduces AI-extracted table rows to the three canonical area totals.
//!
//! Two passes over the page:
//! 1. strict: the first row classified as [`RowKind::Total`] supplies every field it has;
//! 2. fallback (only when strict recovered nothing): each field independently takes
//!    the first positive value found on any data or total row. Subtotal and
//!    grand-total rows stay excluded, so a page whose only summary line is a
//!    grand total reduces to zero.

use super::key_resolver::{resolve_field, AliasTable, CanonicalField};
use super::row_classifier::{classify_row, RowKind};
use crate::models::DocumentTotals;
use crate::types::{ExtractedPage, ExtractionResult};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AreaTotals {
    pub area: f64,
    pub irrigated_area: f64,
    pub planted_area: f64,
}

impl AreaTotals {
    fn set(&mut self, field: CanonicalField, value: f64) {
        match field {
            CanonicalField::Area => self.area = value,
            CanonicalField::IrrigatedArea => self.irrigated_area = value,
            CanonicalField::PlantedArea => self.planted_area = value,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.area == 0.0 && self.irrigated_area == 0.0 && self.planted_area == 0.0
    }
}

fn strict_pass(page: &ExtractedPage, table: &AliasTable) -> AreaTotals {
    let mut totals = AreaTotals::default();
    for (idx, row) in page.rows.iter().enumerate() {
        match classify_row(row) {
            RowKind::Total => {
                tracing::debug!(page = page.page_number, row = idx, "using total row");
                for field in CanonicalField::ALL {
                    if let Some(value) = resolve_field(row, field, table) {
                        totals.set(field, value);
                    }
                }
                break;
            }
            RowKind::ExcludedTotal => {
                tracing::debug!(page = page.page_number, row = idx, "skipping subtotal/grand total row");
            }
            RowKind::Data => {}
        }
    }
    totals
}

fn fallback_pass(page: &ExtractedPage, table: &AliasTable) -> AreaTotals {
    let mut totals = AreaTotals::default();
    for field in CanonicalField::ALL {
        let found = page
            .rows
            .iter()
            .filter(|row| classify_row(row) != RowKind::ExcludedTotal)
            .filter_map(|row| resolve_field(row, field, table))
            .find(|value| *value > 0.0);
        if let Some(value) = found {
            totals.set(field, value);
        }
    }
    totals
}

pub fn reduce_page(page: &ExtractedPage, table: &AliasTable) -> AreaTotals {
    let strict = strict_pass(page, table);
    if !strict.is_zero() {
        return strict;
    }
    let fallback = fallback_pass(page, table);
    if !fallback.is_zero() {
        tracing::debug!(page = page.page_number, "no total row matched; used fallback values");
    }
    fallback
}

/// Reduce the last page in extraction order; confidence passes through untouched.
pub fn reduce_document(result: &ExtractionResult, table: &AliasTable) -> DocumentTotals {
    let Some(last) = result.pages.last() else {
        tracing::warn!("extraction has no pages; totals default to zero");
        return DocumentTotals::zero(result.confidence);
    };
    let totals = reduce_page(last, table);
    DocumentTotals {
        total_area: totals.area.max(0.0),
        total_irrigated_area: totals.irrigated_area.max(0.0),
        total_planted_area: totals.planted_area.max(0.0),
        confidence: result.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExtractedRow;
    use serde_json::{json, Value};

    fn page(rows: Vec<Value>) -> ExtractedPage {
        ExtractedPage {
            page_number: 1,
            rows: rows
                .into_iter()
                .map(|r| r.as_object().cloned().unwrap())
                .collect::<Vec<ExtractedRow>>(),
            summary_text: String::new(),
        }
    }

    #[test]
    fn total_row_supplies_all_fields() {
        let p = page(vec![
            json!({ "Description": "Field 1", "Area": "60" }),
            json!({ "Description": "Total", "Area": "125", "Irrigated Area": "100", "Planted Area": "85" }),
        ]);
        let t = reduce_page(&p, &AliasTable::default());
        assert_eq!(t, AreaTotals { area: 125.0, irrigated_area: 100.0, planted_area: 85.0 });
    }

    #[test]
    fn grand_total_is_ignored_in_favour_of_total() {
        let p = page(vec![
            json!({ "Description": "Grand Total", "Area": "999" }),
            json!({ "Description": "Total", "Area": "50" }),
        ]);
        let t = reduce_page(&p, &AliasTable::default());
        assert_eq!(t.area, 50.0);
    }

    #[test]
    fn only_first_total_row_is_used() {
        let p = page(vec![
            json!({ "Description": "Total", "Area": "10" }),
            json!({ "Description": "Total", "Area": "20", "Irrigated": "5" }),
        ]);
        let t = reduce_page(&p, &AliasTable::default());
        assert_eq!(t, AreaTotals { area: 10.0, irrigated_area: 0.0, planted_area: 0.0 });
    }

    #[test]
    fn fallback_does_not_run_when_strict_found_something() {
        let p = page(vec![
            json!({ "Description": "Total", "Area": "50" }),
            json!({ "Description": "Canal", "Irrigated": "900" }),
        ]);
        let t = reduce_page(&p, &AliasTable::default());
        assert_eq!(t, AreaTotals { area: 50.0, irrigated_area: 0.0, planted_area: 0.0 });
    }

    #[test]
    fn fallback_resolves_fields_independently() {
        let p = page(vec![
            json!({ "Description": "Plot A", "Area": "0", "Planted": "n/a" }),
            json!({ "Description": "Plot B", "Area": "30" }),
            json!({ "Description": "Plot C", "Irrigated": "12", "Area": "99" }),
            json!({ "Description": "Plot D", "Planted Area": "7" }),
        ]);
        let t = reduce_page(&p, &AliasTable::default());
        assert_eq!(t, AreaTotals { area: 30.0, irrigated_area: 12.0, planted_area: 7.0 });
    }

    #[test]
    fn fallback_runs_when_total_row_has_only_zeros() {
        let p = page(vec![
            json!({ "Description": "Total", "Area": "0" }),
            json!({ "Description": "Plot", "Area": "14" }),
        ]);
        assert_eq!(reduce_page(&p, &AliasTable::default()).area, 14.0);
    }

    #[test]
    fn grand_total_only_page_stays_zero() {
        let p = page(vec![
            json!({ "Description": "Grand Total", "Area": "999" }),
            json!({ "Description": "Subtotal", "Irrigated": "40" }),
        ]);
        assert!(reduce_page(&p, &AliasTable::default()).is_zero());
    }

    #[test]
    fn reduction_is_idempotent() {
        let p = page(vec![
            json!({ "Description": "Plot", "Area": "3" }),
            json!({ "Description": "Sub-total", "Area": "3" }),
        ]);
        let table = AliasTable::default();
        assert_eq!(reduce_page(&p, &table), reduce_page(&p, &table));
    }

    #[test]
    fn document_uses_last_page_and_passes_confidence() {
        let result = ExtractionResult {
            confidence: 73.0,
            pages: vec![
                ExtractedPage {
                    page_number: 2,
                    ..page(vec![json!({ "Description": "Total", "Area": "5" })])
                },
                ExtractedPage {
                    page_number: 1,
                    ..page(vec![json!({ "Description": "Total", "Area": "8" })])
                },
            ],
            ..Default::default()
        };
        let totals = reduce_document(&result, &AliasTable::default());
        assert_eq!(totals.total_area, 8.0);
        assert_eq!(totals.confidence, 73.0);
    }

    #[test]
    fn empty_table_yields_zeros_with_confidence() {
        let result = ExtractionResult {
            confidence: 41.0,
            pages: vec![page(vec![])],
            ..Default::default()
        };
        let totals = reduce_document(&result, &AliasTable::default());
        assert!(totals.is_empty());
        assert_eq!(totals.confidence, 41.0);

        let none = reduce_document(&ExtractionResult::default(), &AliasTable::default());
        assert_eq!(none, DocumentTotals::zero(0.0));
    }

    #[test]
    fn negative_values_are_clamped() {
        let result = ExtractionResult {
            confidence: 10.0,
            pages: vec![page(vec![json!({ "Description": "Total", "Area": "-20", "Planted": "4" })])],
            ..Default::default()
        };
        let totals = reduce_document(&result, &AliasTable::default());
        assert_eq!(totals.total_area, 0.0);
        assert_eq!(totals.total_planted_area, 4.0);
    }
}
