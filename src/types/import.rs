//! Spreadsheet import pipeline types

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::template::{ColumnMapping, ContactField};

/// Import pipeline errors.
///
/// Only the variants below abort a run. Row-level problems (bad phone,
/// failed insert for one row) are captured as [`RowError`] entries in the
/// run report and never propagate as errors.
#[derive(Debug, Error)]
pub enum ImportError {
    /// File cannot be decoded or parsed at all; the run fails.
    #[error("file content is not readable: {0}")]
    MalformedInput(String),

    /// Mapping invariant violated; rejected before any row is processed.
    #[error("invalid column mapping: {0}")]
    TemplateValidation(String),

    /// Referenced spreadsheet or template does not exist for this user.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A run for this spreadsheet id is already in flight.
    #[error("spreadsheet is already being processed")]
    AlreadyRunning,

    /// The spreadsheet already reached a terminal status; re-running it in
    /// place would silently rewrite a historical report.
    #[error("spreadsheet has already been processed")]
    AlreadyProcessed,

    /// The store itself is unreachable. Distinct from a single row's
    /// insert failing, which is folded into the report.
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl ImportError {
    /// Error code for the NATS error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::MalformedInput(_) => "MALFORMED_INPUT",
            ImportError::TemplateValidation(_) => "INVALID_MAPPING",
            ImportError::NotFound(_) => "NOT_FOUND",
            ImportError::AlreadyRunning => "ALREADY_PROCESSING",
            ImportError::AlreadyProcessed => "ALREADY_PROCESSED",
            ImportError::Persistence(_) => "DATABASE_ERROR",
        }
    }
}

/// Parsed CSV content: header row plus a rectangular matrix of cells.
///
/// `total_rows` counts every data row in the file, including rows dropped
/// from `rows` by a preview cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

/// A row-level failure, recorded in the run report with the offending
/// zero-based data row index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

/// Why a row was skipped by the deduplication engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateReason {
    #[serde(rename = "already exists in contacts")]
    AlreadyExists,
    #[serde(rename = "duplicate within uploaded file")]
    WithinFile,
}

impl DuplicateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateReason::AlreadyExists => "already exists in contacts",
            DuplicateReason::WithinFile => "duplicate within uploaded file",
        }
    }
}

/// A skipped duplicate row as it appears in the run report. Name fields are
/// the *skipped* row's, not the kept row's, so the report shows what was
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateContact {
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub reason: DuplicateReason,
}

/// A row that survived normalization: normalized phone plus whatever mapped
/// fields were present. Carries its source row index for error reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateContact {
    pub row: usize,
    pub phone: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub property_address: Option<String>,
    pub property_city: Option<String>,
    pub property_state: Option<String>,
    pub property_zip: Option<String>,
    pub parcel_county: Option<String>,
    pub parcel_state: Option<String>,
    pub parcel_acres: Option<String>,
    pub apn: Option<String>,
    pub mailing_address: Option<String>,
    pub mailing_city: Option<String>,
    pub mailing_state: Option<String>,
    pub mailing_zip: Option<String>,
}

impl CandidateContact {
    /// Assign a non-phone field resolved by the normalizer.
    pub fn set_field(&mut self, field: ContactField, value: String) {
        let slot = match field {
            ContactField::FirstName => &mut self.first_name,
            ContactField::LastName => &mut self.last_name,
            ContactField::Email => &mut self.email,
            ContactField::PropertyAddress => &mut self.property_address,
            ContactField::PropertyCity => &mut self.property_city,
            ContactField::PropertyState => &mut self.property_state,
            ContactField::PropertyZip => &mut self.property_zip,
            ContactField::ParcelCounty => &mut self.parcel_county,
            ContactField::ParcelState => &mut self.parcel_state,
            ContactField::ParcelAcres => &mut self.parcel_acres,
            ContactField::Apn => &mut self.apn,
            ContactField::MailingAddress => &mut self.mailing_address,
            ContactField::MailingCity => &mut self.mailing_city,
            ContactField::MailingState => &mut self.mailing_state,
            ContactField::MailingZip => &mut self.mailing_zip,
            // The phone goes through normalize_phone, never through here.
            ContactField::Phone => return,
        };
        *slot = Some(value);
    }

    /// Duplicate-report record for this candidate.
    pub fn duplicate_record(&self, reason: DuplicateReason) -> DuplicateContact {
        DuplicateContact {
            phone: self.phone.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            reason,
        }
    }
}

/// Request for `csv.preview`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvPreviewRequest {
    /// Base64-encoded file bytes
    pub file_content: String,
    /// Rows to return; defaults to 10. `totalRows` always reflects the
    /// whole file.
    pub preview_rows: Option<usize>,
}

/// Request for `spreadsheet.process`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpreadsheetRequest {
    pub spreadsheet_id: Uuid,
    /// Saved template to take the mapping (and DNC config) from
    #[serde(default)]
    pub template_id: Option<Uuid>,
    /// Inline mapping; required when no template is given
    #[serde(default)]
    pub column_mapping: Option<ColumnMapping>,
    /// Overrides the template's DNC column when present
    #[serde(default)]
    pub dnc_column: Option<String>,
    #[serde(default)]
    pub dnc_value: Option<String>,
}

/// Summary returned to the caller once a run completes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpreadsheetResponse {
    /// Contacts created
    pub processed: i32,
    /// Duplicates plus DNC-suppressed rows
    pub skipped: i32,
    /// Row-level errors, formatted with their row index
    pub errors: Vec<String>,
    pub duplicate_contacts: Vec<DuplicateContact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_reason_serializes_as_report_text() {
        let json = serde_json::to_string(&DuplicateReason::AlreadyExists).unwrap();
        assert_eq!(json, "\"already exists in contacts\"");
        let json = serde_json::to_string(&DuplicateReason::WithinFile).unwrap();
        assert_eq!(json, "\"duplicate within uploaded file\"");
    }

    #[test]
    fn test_row_error_display_includes_index() {
        let err = RowError::new(4, "invalid or missing phone number");
        assert_eq!(err.to_string(), "row 4: invalid or missing phone number");
    }

    #[test]
    fn test_duplicate_contact_omits_absent_names() {
        let dup = DuplicateContact {
            phone: "5551111".to_string(),
            first_name: None,
            last_name: None,
            reason: DuplicateReason::WithinFile,
        };
        let json = serde_json::to_string(&dup).unwrap();
        assert!(!json.contains("firstName"));
        assert!(json.contains("duplicate within uploaded file"));
    }

    #[test]
    fn test_candidate_set_field_ignores_phone() {
        let mut candidate = CandidateContact::default();
        candidate.set_field(ContactField::Phone, "999".to_string());
        assert!(candidate.phone.is_empty());
        candidate.set_field(ContactField::FirstName, "Ann".to_string());
        assert_eq!(candidate.first_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn test_import_error_codes() {
        assert_eq!(
            ImportError::TemplateValidation("x".into()).code(),
            "INVALID_MAPPING"
        );
        assert_eq!(ImportError::AlreadyRunning.code(), "ALREADY_PROCESSING");
    }
}
