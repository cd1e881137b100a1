//! Contact spreadsheet database queries

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::import::{DuplicateContact, RowError};
use crate::types::spreadsheet::{ContactSpreadsheet, SpreadsheetStatus};
use crate::types::template::ColumnMapping;

// Everything except file_content, which is only fetched by the processor.
const SPREADSHEET_COLUMNS: &str = r#"
    id, user_id, original_file_name, contact_count, upload_date, file_size, status,
    processed_count, duplicate_count, dnc_suppressed_count,
    processing_errors, duplicate_contacts,
    column_mapping_snapshot, dnc_column, dnc_value,
    failure_reason, created_at, updated_at
"#;

/// Register an uploaded spreadsheet in `uploaded` status
pub async fn create_spreadsheet(
    pool: &PgPool,
    user_id: Uuid,
    file_name: &str,
    file_content: &str,
    contact_count: i32,
    file_size: i64,
) -> sqlx::Result<ContactSpreadsheet> {
    sqlx::query_as::<_, ContactSpreadsheet>(&format!(
        r#"
        INSERT INTO contact_spreadsheets (
            id, user_id, original_file_name, file_content, contact_count,
            upload_date, file_size, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, NOW(), $6, 'uploaded', NOW(), NOW())
        RETURNING {SPREADSHEET_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(file_name)
    .bind(file_content)
    .bind(contact_count)
    .bind(file_size)
    .fetch_one(pool)
    .await
}

/// Get spreadsheet by ID
pub async fn get_spreadsheet(
    pool: &PgPool,
    user_id: Uuid,
    spreadsheet_id: Uuid,
) -> sqlx::Result<Option<ContactSpreadsheet>> {
    sqlx::query_as::<_, ContactSpreadsheet>(&format!(
        r#"SELECT {SPREADSHEET_COLUMNS} FROM contact_spreadsheets WHERE id = $1 AND user_id = $2"#
    ))
    .bind(spreadsheet_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Current status of a spreadsheet, if it exists for this user
pub async fn get_status(
    pool: &PgPool,
    user_id: Uuid,
    spreadsheet_id: Uuid,
) -> sqlx::Result<Option<SpreadsheetStatus>> {
    sqlx::query_scalar(
        r#"SELECT status FROM contact_spreadsheets WHERE id = $1 AND user_id = $2"#,
    )
    .bind(spreadsheet_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// List spreadsheets for a user, newest first
pub async fn list_spreadsheets(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<ContactSpreadsheet>> {
    sqlx::query_as::<_, ContactSpreadsheet>(&format!(
        r#"
        SELECT {SPREADSHEET_COLUMNS}
        FROM contact_spreadsheets
        WHERE user_id = $1
        ORDER BY upload_date DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Count spreadsheets for a user
pub async fn count_spreadsheets(pool: &PgPool, user_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM contact_spreadsheets WHERE user_id = $1"#)
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Conditionally transition `uploaded → processing`, recording the mapping
/// and DNC snapshot the run will use.
///
/// Returns the raw file content when the transition happened, `None` when
/// the spreadsheet is missing, belongs to someone else, or is not in
/// `uploaded` status — the single UPDATE makes a retried process request
/// lose the race instead of double-running.
pub async fn begin_processing(
    pool: &PgPool,
    user_id: Uuid,
    spreadsheet_id: Uuid,
    mapping: &ColumnMapping,
    dnc_column: Option<&str>,
    dnc_value: Option<&str>,
) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar(
        r#"
        UPDATE contact_spreadsheets
        SET status = 'processing',
            column_mapping_snapshot = $4,
            dnc_column = $5,
            dnc_value = $6,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND status = $3
        RETURNING file_content
        "#,
    )
    .bind(spreadsheet_id)
    .bind(user_id)
    .bind(SpreadsheetStatus::Uploaded)
    .bind(Json(mapping))
    .bind(dnc_column)
    .bind(dnc_value)
    .fetch_optional(pool)
    .await
}

/// Terminal `processing → completed` transition embedding the full run
/// report on the record.
pub async fn complete_run(
    pool: &PgPool,
    spreadsheet_id: Uuid,
    processed_count: i32,
    duplicate_count: i32,
    dnc_suppressed_count: i32,
    processing_errors: &[RowError],
    duplicate_contacts: &[DuplicateContact],
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE contact_spreadsheets
        SET status = 'completed',
            processed_count = $2,
            duplicate_count = $3,
            dnc_suppressed_count = $4,
            processing_errors = $5,
            duplicate_contacts = $6,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(spreadsheet_id)
    .bind(processed_count)
    .bind(duplicate_count)
    .bind(dnc_suppressed_count)
    .bind(Json(processing_errors))
    .bind(Json(duplicate_contacts))
    .execute(pool)
    .await?;

    Ok(())
}

/// Terminal `processing → failed` transition for pipeline-level faults
pub async fn mark_failed(
    pool: &PgPool,
    spreadsheet_id: Uuid,
    reason: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE contact_spreadsheets
        SET status = 'failed',
            failure_reason = $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(spreadsheet_id)
    .bind(reason)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a spreadsheet unless a run is in flight on it. Returns whether a
/// row was removed.
pub async fn delete_spreadsheet(
    pool: &PgPool,
    user_id: Uuid,
    spreadsheet_id: Uuid,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"DELETE FROM contact_spreadsheets WHERE id = $1 AND user_id = $2 AND status <> 'processing'"#,
    )
    .bind(spreadsheet_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
