use serde::{Deserialize, Serialize};
use std::fmt;

use super::DocumentTotals;

/// Lifecycle state of an uploaded document, stored as its kebab-case name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    Pending,
    Processing,
    Scanned,
    /// Scanned in association/summary mode; contributes association areas only.
    SummaryScanned,
    Failed,
    Other(String),
}

impl DocumentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Scanned => "scanned",
            DocumentStatus::SummaryScanned => "summary-scanned",
            DocumentStatus::Failed => "failed",
            DocumentStatus::Other(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "pending" => DocumentStatus::Pending,
            "processing" => DocumentStatus::Processing,
            "scanned" => DocumentStatus::Scanned,
            "summary-scanned" => DocumentStatus::SummaryScanned,
            "failed" => DocumentStatus::Failed,
            other => DocumentStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DocumentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DocumentStatus::parse(&s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryAssociation {
    pub id: String,
    pub name: String,
    pub total_area: f64,
    pub confidence: f64,
    pub usage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub folder_id: Option<i64>,
    pub file_name: String,
    pub status: DocumentStatus,
    /// Absent until the first successful scan.
    pub totals: Option<DocumentTotals>,
    #[serde(default)]
    pub associations: Vec<SummaryAssociation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_known_and_unknown() {
        for s in ["pending", "processing", "scanned", "summary-scanned", "failed"] {
            assert_eq!(DocumentStatus::parse(s).as_str(), s);
        }
        let other = DocumentStatus::parse("archived");
        assert_eq!(other, DocumentStatus::Other("archived".to_string()));
        assert_eq!(other.to_string(), "archived");
    }

    #[test]
    fn status_serializes_as_string() {
        let json = serde_json::to_string(&DocumentStatus::SummaryScanned).unwrap();
        assert_eq!(json, "\"summary-scanned\"");
        let back: DocumentStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DocumentStatus::SummaryScanned);
    }
}
