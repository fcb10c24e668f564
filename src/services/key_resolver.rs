//! Maps free-form AI column names onto the three canonical area fields and
//! coerces the matching cell into a number.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::row_classifier::cell_text;
use crate::types::ExtractedRow;

const AREA_ALIASES: &[&str] = &[
    "area",
    "Area",
    "AREA",
    "total area",
    "Total Area",
    "TOTAL AREA",
    "total_area",
    "Total_Area",
    "TOTAL_AREA",
    "totalArea",
];

const IRRIGATED_AREA_ALIASES: &[&str] = &[
    "irrigated",
    "Irrigated",
    "IRRIGATED",
    "irrigated area",
    "Irrigated Area",
    "IRRIGATED AREA",
    "irrigated_area",
    "Irrigated_Area",
    "IRRIGATED_AREA",
    "irrigatedArea",
];

const PLANTED_AREA_ALIASES: &[&str] = &[
    "planted",
    "Planted",
    "PLANTED",
    "planted area",
    "Planted Area",
    "PLANTED AREA",
    "planted_area",
    "Planted_Area",
    "PLANTED_AREA",
    "plantedArea",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Area,
    IrrigatedArea,
    PlantedArea,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 3] = [
        CanonicalField::Area,
        CanonicalField::IrrigatedArea,
        CanonicalField::PlantedArea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Area => "area",
            CanonicalField::IrrigatedArea => "irrigatedArea",
            CanonicalField::PlantedArea => "plantedArea",
        }
    }
}

/// Ordered column-name aliases per canonical field. Earlier aliases win.
///
/// Lookup is exact: casing variants are listed explicitly rather than
/// matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    area: Vec<String>,
    irrigated_area: Vec<String>,
    planted_area: Vec<String>,
}

impl AliasTable {
    pub fn new(area: Vec<String>, irrigated_area: Vec<String>, planted_area: Vec<String>) -> Self {
        AliasTable {
            area,
            irrigated_area,
            planted_area,
        }
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        match field {
            CanonicalField::Area => &self.area,
            CanonicalField::IrrigatedArea => &self.irrigated_area,
            CanonicalField::PlantedArea => &self.planted_area,
        }
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        let owned = |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
        AliasTable::new(
            owned(AREA_ALIASES),
            owned(IRRIGATED_AREA_ALIASES),
            owned(PLANTED_AREA_ALIASES),
        )
    }
}

fn non_numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9.\-]").expect("valid regex"))
}

fn float_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)").expect("valid regex"))
}

/// Strip everything but digits, `.` and `-`, then read the longest leading float.
///
/// `"1,250.5 ha"` -> `1250.5`, `"12.5.1"` -> `12.5`, `"n/a"` -> `None`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned = non_numeric_re().replace_all(raw, "");
    let prefix = float_prefix_re().find(&cleaned)?;
    prefix.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Empty strings, zero, `false` and `null` count as absent cells.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First alias (in table order) present on the row whose value parses as a number.
pub fn resolve_field(row: &ExtractedRow, field: CanonicalField, table: &AliasTable) -> Option<f64> {
    for alias in table.aliases(field) {
        let Some(value) = row.get(alias.as_str()) else {
            continue;
        };
        if !is_present(value) {
            continue;
        }
        if let Some(n) = parse_numeric(&cell_text(value)) {
            return Some(n);
        }
        tracing::debug!(field = field.as_str(), alias = %alias, "alias value is not numeric; trying next alias");
    }
    None
}
