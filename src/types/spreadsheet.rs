//! Contact spreadsheet (import run) types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::types::import::{DuplicateContact, RowError};
use crate::types::template::ColumnMapping;

/// Import run status
///
/// `completed` and `failed` are terminal. A spreadsheet is never
/// reprocessed in place; a re-run uploads a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "spreadsheet_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SpreadsheetStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl SpreadsheetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpreadsheetStatus::Uploaded => "uploaded",
            SpreadsheetStatus::Processing => "processing",
            SpreadsheetStatus::Completed => "completed",
            SpreadsheetStatus::Failed => "failed",
        }
    }
}

/// One upload-and-process cycle.
///
/// The full outcome is embedded in the record (error and duplicate lists
/// inline, plus a snapshot of the column mapping the run used) so a
/// historical report stays self-contained even after the template or the
/// created contacts are edited or deleted. The raw file content is stored
/// on the row too but deliberately kept out of this struct; handlers fetch
/// it separately when processing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactSpreadsheet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_file_name: String,
    /// Data rows in the file at upload time
    pub contact_count: i32,
    pub upload_date: DateTime<Utc>,
    /// Decoded file size in bytes
    pub file_size: i64,
    pub status: SpreadsheetStatus,

    // Run outcome, populated by the orchestrator. Duplicate and
    // DNC-suppressed counts are tracked separately; they are distinct skip
    // reasons and must not be conflated in the report.
    pub processed_count: Option<i32>,
    pub duplicate_count: Option<i32>,
    pub dnc_suppressed_count: Option<i32>,
    pub processing_errors: Option<Json<Vec<RowError>>>,
    pub duplicate_contacts: Option<Json<Vec<DuplicateContact>>>,

    // Snapshot of the mapping/DNC configuration the run used
    pub column_mapping_snapshot: Option<Json<ColumnMapping>>,
    pub dnc_column: Option<String>,
    pub dnc_value: Option<String>,

    /// Top-level message when status is `failed`
    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactSpreadsheet {
    /// Skipped rows as reported to callers: duplicates plus DNC-suppressed.
    pub fn skipped_count(&self) -> i32 {
        self.duplicate_count.unwrap_or(0) + self.dnc_suppressed_count.unwrap_or(0)
    }
}

/// Request to register an uploaded spreadsheet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSpreadsheetRequest {
    pub file_name: String,
    /// Base64-encoded file bytes
    pub file_content: String,
}

/// Request to fetch or delete a spreadsheet by id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetIdRequest {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SpreadsheetStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert_eq!(SpreadsheetStatus::Uploaded.as_str(), "uploaded");
    }

    #[test]
    fn test_skipped_count_sums_both_skip_reasons() {
        let sheet = ContactSpreadsheet {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            original_file_name: "leads.csv".to_string(),
            contact_count: 10,
            upload_date: Utc::now(),
            file_size: 128,
            status: SpreadsheetStatus::Completed,
            processed_count: Some(6),
            duplicate_count: Some(3),
            dnc_suppressed_count: Some(1),
            processing_errors: None,
            duplicate_contacts: None,
            column_mapping_snapshot: None,
            dnc_column: None,
            dnc_value: None,
            failure_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(sheet.skipped_count(), 4);
    }
}
