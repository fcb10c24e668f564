use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::AddAssign;

/// Canonical totals persisted against one document. Zero means "not found".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    pub total_area: f64,
    pub total_irrigated_area: f64,
    pub total_planted_area: f64,
    pub confidence: f64,
}

impl DocumentTotals {
    pub fn zero(confidence: f64) -> Self {
        DocumentTotals {
            confidence,
            ..Default::default()
        }
    }

    /// No area field was recovered.
    pub fn is_empty(&self) -> bool {
        self.total_area == 0.0 && self.total_irrigated_area == 0.0 && self.total_planted_area == 0.0
    }
}

/// Cached roll-up of a folder's subtree. Recomputable, never authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderTotals {
    pub total_area: f64,
    pub total_irrigated_area: f64,
    pub total_planted_area: f64,
}

impl FolderTotals {
    pub fn new(total_area: f64, total_irrigated_area: f64, total_planted_area: f64) -> Self {
        FolderTotals {
            total_area,
            total_irrigated_area,
            total_planted_area,
        }
    }
}

impl AddAssign for FolderTotals {
    fn add_assign(&mut self, rhs: FolderTotals) {
        self.total_area += rhs.total_area;
        self.total_irrigated_area += rhs.total_irrigated_area;
        self.total_planted_area += rhs.total_planted_area;
    }
}

impl AddAssign<&DocumentTotals> for FolderTotals {
    fn add_assign(&mut self, rhs: &DocumentTotals) {
        self.total_area += rhs.total_area;
        self.total_irrigated_area += rhs.total_irrigated_area;
        self.total_planted_area += rhs.total_planted_area;
    }
}

impl Sum for FolderTotals {
    fn sum<I: Iterator<Item = FolderTotals>>(iter: I) -> Self {
        let mut acc = FolderTotals::default();
        for t in iter {
            acc += t;
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_keeps_confidence() {
        let t = DocumentTotals::zero(12.5);
        assert!(t.is_empty());
        assert_eq!(t.confidence, 12.5);
    }

    #[test]
    fn folder_totals_accumulate_documents_and_children() {
        let mut sum = FolderTotals::default();
        sum += &DocumentTotals {
            total_area: 10.0,
            total_irrigated_area: 4.0,
            total_planted_area: 2.0,
            confidence: 99.0,
        };
        sum += FolderTotals::new(1.0, 1.0, 1.0);
        assert_eq!(sum, FolderTotals::new(11.0, 5.0, 3.0));

        let total: FolderTotals = vec![sum, FolderTotals::new(9.0, 0.0, 0.0)].into_iter().sum();
        assert_eq!(total.total_area, 20.0);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(FolderTotals::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(json["totalIrrigatedArea"], 2.0);
        assert_eq!(json["totalPlantedArea"], 3.0);
    }
}
