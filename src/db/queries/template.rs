//! Contact template database queries

use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::template::{ContactTemplate, CreateTemplateRequest, UpdateTemplateRequest};

const TEMPLATE_COLUMNS: &str =
    "id, user_id, name, column_mapping, dnc_column, dnc_value, created_at, updated_at";

/// Create a new template. The mapping is expected to be validated by the
/// caller before it gets here.
pub async fn create_template(
    pool: &PgPool,
    user_id: Uuid,
    req: &CreateTemplateRequest,
) -> sqlx::Result<ContactTemplate> {
    sqlx::query_as::<_, ContactTemplate>(&format!(
        r#"
        INSERT INTO contact_templates (
            id, user_id, name, column_mapping, dnc_column, dnc_value, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
        RETURNING {TEMPLATE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&req.name)
    .bind(Json(&req.column_mapping))
    .bind(&req.dnc_column)
    .bind(&req.dnc_value)
    .fetch_one(pool)
    .await
}

/// Get template by ID
pub async fn get_template(
    pool: &PgPool,
    user_id: Uuid,
    template_id: Uuid,
) -> sqlx::Result<Option<ContactTemplate>> {
    sqlx::query_as::<_, ContactTemplate>(&format!(
        r#"SELECT {TEMPLATE_COLUMNS} FROM contact_templates WHERE id = $1 AND user_id = $2"#
    ))
    .bind(template_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// List templates for a user
pub async fn list_templates(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<ContactTemplate>> {
    sqlx::query_as::<_, ContactTemplate>(&format!(
        r#"
        SELECT {TEMPLATE_COLUMNS}
        FROM contact_templates
        WHERE user_id = $1
        ORDER BY name ASC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Count templates for a user
pub async fn count_templates(pool: &PgPool, user_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM contact_templates WHERE user_id = $1"#)
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Update a template. Unsupplied fields keep their current values.
pub async fn update_template(
    pool: &PgPool,
    user_id: Uuid,
    req: &UpdateTemplateRequest,
) -> sqlx::Result<Option<ContactTemplate>> {
    sqlx::query_as::<_, ContactTemplate>(&format!(
        r#"
        UPDATE contact_templates
        SET
            name = COALESCE($3, name),
            column_mapping = COALESCE($4, column_mapping),
            dnc_column = COALESCE($5, dnc_column),
            dnc_value = COALESCE($6, dnc_value),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING {TEMPLATE_COLUMNS}
        "#
    ))
    .bind(req.id)
    .bind(user_id)
    .bind(&req.name)
    .bind(req.column_mapping.as_ref().map(Json))
    .bind(&req.dnc_column)
    .bind(&req.dnc_value)
    .fetch_optional(pool)
    .await
}

/// Delete a template. Returns whether a row was removed.
pub async fn delete_template(
    pool: &PgPool,
    user_id: Uuid,
    template_id: Uuid,
) -> sqlx::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM contact_templates WHERE id = $1 AND user_id = $2"#)
        .bind(template_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
