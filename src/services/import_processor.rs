//! Spreadsheet import orchestrator
//!
//! Drives parse → normalize → DNC filter → dedup → persist over one
//! uploaded spreadsheet, accumulating created contacts, skipped duplicates,
//! suppressed rows and row-level errors without ever aborting the run for a
//! single bad row. The run report is written back onto the spreadsheet
//! record so it stays self-contained.

use std::collections::HashSet;

use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::queries;
use crate::services::active_runs::ACTIVE_RUNS;
use crate::services::{csv, dedup, dnc, normalize};
use crate::types::{
    CandidateContact, ColumnMapping, DuplicateContact, ImportError, ParsedCsv,
    ProcessSpreadsheetRequest, ProcessSpreadsheetResponse, RowError, SpreadsheetStatus,
};

/// Outcome of the in-memory stages of a run, before persistence.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub total_rows: usize,
    pub to_create: Vec<CandidateContact>,
    pub duplicates: Vec<DuplicateContact>,
    pub dnc_suppressed: i32,
    pub row_errors: Vec<RowError>,
}

/// Run the pure stages of the pipeline over parsed rows.
///
/// Every data row lands in exactly one bucket: created-candidate,
/// duplicate, DNC-suppressed, or row error. A DNC-flagged row is still
/// normalized so its phone can be logged, but it never reaches dedup and
/// never appears among the duplicates; a row whose phone fails
/// normalization is an error regardless of its DNC cell.
pub fn run_pipeline(
    parsed: &ParsedCsv,
    mapping: &ColumnMapping,
    dnc_column: Option<&str>,
    dnc_value: Option<&str>,
    existing: &HashSet<String>,
) -> PipelineOutcome {
    let mut candidates = Vec::new();
    let mut row_errors = Vec::new();
    let mut dnc_suppressed = 0i32;

    for (index, row) in parsed.rows.iter().enumerate() {
        match normalize::normalize_row(index, row, &parsed.headers, mapping) {
            Ok(candidate) => {
                if dnc::is_do_not_contact(row, &parsed.headers, dnc_column, dnc_value) {
                    debug!(
                        "row {} suppressed as do-not-contact ({})",
                        index, candidate.phone
                    );
                    dnc_suppressed += 1;
                } else {
                    candidates.push(candidate);
                }
            }
            Err(err) => row_errors.push(err),
        }
    }

    let dedup::DedupOutcome {
        to_create,
        duplicates,
    } = dedup::partition(candidates, existing);

    PipelineOutcome {
        total_rows: parsed.rows.len(),
        to_create,
        duplicates,
        dnc_suppressed,
        row_errors,
    }
}

/// Import orchestrator bound to the contact store.
pub struct ContactImportProcessor {
    pool: PgPool,
}

impl ContactImportProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Process one uploaded spreadsheet to completion.
    ///
    /// State machine: `uploaded → processing → completed | failed`. The run
    /// is rejected up front when the mapping is invalid, the spreadsheet is
    /// unknown, or another run for the same id is active or already
    /// finished. Once rows are being evaluated the run always reaches
    /// `completed` — individual bad rows are recorded, never fatal; only an
    /// unreadable file or an unreachable store yields `failed`.
    pub async fn process(
        &self,
        user_id: Uuid,
        request: &ProcessSpreadsheetRequest,
    ) -> Result<ProcessSpreadsheetResponse, ImportError> {
        let (mapping, dnc_column, dnc_value) = self.resolve_mapping(user_id, request).await?;
        mapping.validate()?;

        // In-process single-flight claim, released when the guard drops.
        let _guard = ACTIVE_RUNS
            .claim(request.spreadsheet_id)
            .ok_or(ImportError::AlreadyRunning)?;

        // Conditional uploaded → processing transition. Writes the mapping
        // snapshot in the same statement so history survives template edits.
        let file_content = match queries::spreadsheet::begin_processing(
            &self.pool,
            user_id,
            request.spreadsheet_id,
            &mapping,
            dnc_column.as_deref(),
            dnc_value.as_deref(),
        )
        .await?
        {
            Some(content) => content,
            None => {
                let status =
                    queries::spreadsheet::get_status(&self.pool, user_id, request.spreadsheet_id)
                        .await?;
                return Err(match status {
                    None => ImportError::NotFound("spreadsheet"),
                    Some(SpreadsheetStatus::Processing) => ImportError::AlreadyRunning,
                    Some(_) => ImportError::AlreadyProcessed,
                });
            }
        };

        let parsed = match csv::parse_csv(&file_content, None) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.fail_run(request.spreadsheet_id, &err.to_string()).await;
                return Err(err);
            }
        };

        // Snapshot of the user's persisted phones, taken once at run start.
        // Contacts committed by other runs mid-flight are not re-read.
        let existing = match queries::contact::list_phones(&self.pool, user_id).await {
            Ok(phones) => phones
                .iter()
                .map(|phone| dedup::dedup_key(phone).to_string())
                .collect::<HashSet<String>>(),
            Err(err) => {
                self.fail_run(request.spreadsheet_id, "contact store unreachable")
                    .await;
                return Err(err.into());
            }
        };

        let outcome = run_pipeline(
            &parsed,
            &mapping,
            dnc_column.as_deref(),
            dnc_value.as_deref(),
            &existing,
        );

        // Per-row persistence: one row's failed insert becomes a report
        // entry and the run moves on to the next row.
        let mut processed = 0i32;
        let mut row_errors = outcome.row_errors;
        for candidate in &outcome.to_create {
            match queries::contact::create_from_candidate(&self.pool, user_id, candidate).await {
                Ok(_) => processed += 1,
                Err(err) => {
                    warn!(
                        "spreadsheet {} row {}: contact insert failed: {}",
                        request.spreadsheet_id, candidate.row, err
                    );
                    row_errors.push(RowError::new(
                        candidate.row,
                        format!("could not save contact: {}", err),
                    ));
                }
            }
        }
        row_errors.sort_by_key(|e| e.row);

        let duplicate_count = outcome.duplicates.len() as i32;
        queries::spreadsheet::complete_run(
            &self.pool,
            request.spreadsheet_id,
            processed,
            duplicate_count,
            outcome.dnc_suppressed,
            &row_errors,
            &outcome.duplicates,
        )
        .await?;

        info!(
            "Spreadsheet {} import completed: {} created, {} duplicates, {} dnc-suppressed, {} row errors",
            request.spreadsheet_id,
            processed,
            duplicate_count,
            outcome.dnc_suppressed,
            row_errors.len()
        );

        Ok(ProcessSpreadsheetResponse {
            processed,
            skipped: duplicate_count + outcome.dnc_suppressed,
            errors: row_errors.iter().map(|e| e.to_string()).collect(),
            duplicate_contacts: outcome.duplicates,
        })
    }

    /// Resolve the mapping and DNC configuration for a run. A template is
    /// read once here and snapshotted; request-level values override it.
    async fn resolve_mapping(
        &self,
        user_id: Uuid,
        request: &ProcessSpreadsheetRequest,
    ) -> Result<(ColumnMapping, Option<String>, Option<String>), ImportError> {
        match request.template_id {
            Some(template_id) => {
                let template = queries::template::get_template(&self.pool, user_id, template_id)
                    .await?
                    .ok_or(ImportError::NotFound("template"))?;
                let mapping = request
                    .column_mapping
                    .clone()
                    .unwrap_or_else(|| template.column_mapping.0.clone());
                let dnc_column = request.dnc_column.clone().or(template.dnc_column);
                let dnc_value = request.dnc_value.clone().or(template.dnc_value);
                Ok((mapping, dnc_column, dnc_value))
            }
            None => {
                let mapping = request.column_mapping.clone().ok_or_else(|| {
                    ImportError::TemplateValidation(
                        "either a column mapping or a template id is required".to_string(),
                    )
                })?;
                Ok((
                    mapping,
                    request.dnc_column.clone(),
                    request.dnc_value.clone(),
                ))
            }
        }
    }

    /// Best-effort `processing → failed` transition with a top-level reason.
    async fn fail_run(&self, spreadsheet_id: Uuid, reason: &str) {
        if let Err(err) =
            queries::spreadsheet::mark_failed(&self.pool, spreadsheet_id, reason).await
        {
            warn!(
                "could not mark spreadsheet {} as failed: {}",
                spreadsheet_id, err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContactField, DuplicateReason};
    use std::collections::HashMap;

    fn mapping(pairs: &[(&str, ContactField)]) -> ColumnMapping {
        ColumnMapping(
            pairs
                .iter()
                .map(|(column, field)| (column.to_string(), *field))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn parse(text: &str) -> ParsedCsv {
        csv::parse_csv(text, None).unwrap()
    }

    #[test]
    fn test_dnc_row_skipped_and_duplicate_within_file_reported() {
        // Template {Phone→phone, First→firstName}, DNC column "DNC" value "Y";
        // rows: Ann twice (second is the in-file duplicate), Bob flagged DNC.
        let parsed = parse("Phone,First,DNC\n555-1111,Ann,N\n555-1111,Ann,N\n555-2222,Bob,Y\n");
        let m = mapping(&[
            ("Phone", ContactField::Phone),
            ("First", ContactField::FirstName),
        ]);
        let outcome = run_pipeline(&parsed, &m, Some("DNC"), Some("Y"), &HashSet::new());

        assert_eq!(outcome.to_create.len(), 1);
        assert_eq!(outcome.to_create[0].first_name.as_deref(), Some("Ann"));
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.duplicates[0].phone, "5551111");
        assert_eq!(outcome.duplicates[0].first_name.as_deref(), Some("Ann"));
        assert_eq!(outcome.duplicates[0].reason, DuplicateReason::WithinFile);
        assert_eq!(outcome.dnc_suppressed, 1);
        assert!(outcome.row_errors.is_empty());
    }

    #[test]
    fn test_every_row_lands_in_exactly_one_bucket() {
        let parsed = parse("Phone,DNC\n5551111,\n5551111,\nabc,\n5552222,Y\n5553333,\n");
        let m = mapping(&[("Phone", ContactField::Phone)]);
        let existing: HashSet<String> = ["5553333".to_string()].into_iter().collect();
        let outcome = run_pipeline(&parsed, &m, Some("DNC"), Some("Y"), &existing);

        let accounted = outcome.to_create.len()
            + outcome.duplicates.len()
            + outcome.dnc_suppressed as usize
            + outcome.row_errors.len();
        assert_eq!(accounted, outcome.total_rows);
        assert_eq!(outcome.total_rows, 5);
        assert_eq!(outcome.to_create.len(), 1);
        assert_eq!(outcome.duplicates.len(), 2);
        assert_eq!(outcome.dnc_suppressed, 1);
        assert_eq!(outcome.row_errors.len(), 1);
    }

    #[test]
    fn test_bad_phone_row_contributes_only_an_error() {
        let parsed = parse("Phone\nabc\n");
        let m = mapping(&[("Phone", ContactField::Phone)]);
        let outcome = run_pipeline(&parsed, &m, None, None, &HashSet::new());
        assert!(outcome.to_create.is_empty());
        assert!(outcome.duplicates.is_empty());
        assert_eq!(outcome.row_errors.len(), 1);
        assert_eq!(outcome.row_errors[0].row, 0);
    }

    #[test]
    fn test_dnc_row_never_reported_as_duplicate() {
        // Second row duplicates the first but is DNC-flagged: it must be
        // suppressed, not listed as a duplicate.
        let parsed = parse("Phone,DNC\n5551111,N\n5551111,Y\n");
        let m = mapping(&[("Phone", ContactField::Phone)]);
        let outcome = run_pipeline(&parsed, &m, Some("DNC"), Some("Y"), &HashSet::new());
        assert_eq!(outcome.to_create.len(), 1);
        assert!(outcome.duplicates.is_empty());
        assert_eq!(outcome.dnc_suppressed, 1);
    }

    #[test]
    fn test_second_run_over_same_store_creates_nothing() {
        let parsed = parse("Phone\n5551111\n5552222\n");
        let m = mapping(&[("Phone", ContactField::Phone)]);

        let first = run_pipeline(&parsed, &m, None, None, &HashSet::new());
        assert_eq!(first.to_create.len(), 2);

        // Simulate the store after the first run committed.
        let existing: HashSet<String> = first
            .to_create
            .iter()
            .map(|c| dedup::dedup_key(&c.phone).to_string())
            .collect();

        let second = run_pipeline(&parsed, &m, None, None, &existing);
        assert!(second.to_create.is_empty());
        assert_eq!(second.duplicates.len(), 2);
        assert!(second
            .duplicates
            .iter()
            .all(|d| d.reason == DuplicateReason::AlreadyExists));
    }

    #[test]
    fn test_formatted_and_bare_phones_collide() {
        let parsed = parse("Phone\n+1 234-567-8900\n12345678900\n");
        let m = mapping(&[("Phone", ContactField::Phone)]);
        let outcome = run_pipeline(&parsed, &m, None, None, &HashSet::new());
        assert_eq!(outcome.to_create.len(), 1);
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.duplicates[0].reason, DuplicateReason::WithinFile);
    }

    #[test]
    fn test_file_with_zero_valid_rows_still_completes_cleanly() {
        let parsed = parse("Phone\nabc\n\n");
        let m = mapping(&[("Phone", ContactField::Phone)]);
        let outcome = run_pipeline(&parsed, &m, None, None, &HashSet::new());
        assert_eq!(outcome.total_rows, 1);
        assert!(outcome.to_create.is_empty());
        assert_eq!(outcome.row_errors.len(), 1);
    }
}
