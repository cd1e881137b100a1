//! Contact database queries

use sqlx::PgPool;
use uuid::Uuid;

use crate::types::contact::{Contact, CreateContactRequest, UpdateContactRequest};
use crate::types::import::CandidateContact;

const CONTACT_COLUMNS: &str = r#"
    id, user_id, phone, first_name, last_name, email,
    property_address, property_city, property_state, property_zip,
    parcel_county, parcel_state, parcel_acres, apn,
    mailing_address, mailing_city, mailing_state, mailing_zip,
    dnc, dnc_updated_at, created_at, updated_at
"#;

/// True when the error is the (user_id, phone) unique index firing
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}

/// Create a contact from an explicit request (single-contact API)
pub async fn create_contact(
    pool: &PgPool,
    user_id: Uuid,
    req: &CreateContactRequest,
) -> sqlx::Result<Contact> {
    let contact = sqlx::query_as::<_, Contact>(&format!(
        r#"
        INSERT INTO contacts (
            id, user_id, phone, first_name, last_name, email,
            property_address, property_city, property_state, property_zip,
            parcel_county, parcel_state, parcel_acres, apn,
            mailing_address, mailing_city, mailing_state, mailing_zip,
            dnc, dnc_updated_at, created_at, updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6,
            $7, $8, $9, $10,
            $11, $12, $13, $14,
            $15, $16, $17, $18,
            $19, CASE WHEN $19::boolean IS NULL THEN NULL ELSE NOW() END, NOW(), NOW()
        )
        RETURNING {CONTACT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&req.phone)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.property_address)
    .bind(&req.property_city)
    .bind(&req.property_state)
    .bind(&req.property_zip)
    .bind(&req.parcel_county)
    .bind(&req.parcel_state)
    .bind(&req.parcel_acres)
    .bind(&req.apn)
    .bind(&req.mailing_address)
    .bind(&req.mailing_city)
    .bind(&req.mailing_state)
    .bind(&req.mailing_zip)
    .bind(req.dnc)
    .fetch_one(pool)
    .await?;

    Ok(contact)
}

/// Create a contact from a normalized import candidate
pub async fn create_from_candidate(
    pool: &PgPool,
    user_id: Uuid,
    candidate: &CandidateContact,
) -> sqlx::Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO contacts (
            id, user_id, phone, first_name, last_name, email,
            property_address, property_city, property_state, property_zip,
            parcel_county, parcel_state, parcel_acres, apn,
            mailing_address, mailing_city, mailing_state, mailing_zip,
            created_at, updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6,
            $7, $8, $9, $10,
            $11, $12, $13, $14,
            $15, $16, $17, $18,
            NOW(), NOW()
        )
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&candidate.phone)
    .bind(&candidate.first_name)
    .bind(&candidate.last_name)
    .bind(&candidate.email)
    .bind(&candidate.property_address)
    .bind(&candidate.property_city)
    .bind(&candidate.property_state)
    .bind(&candidate.property_zip)
    .bind(&candidate.parcel_county)
    .bind(&candidate.parcel_state)
    .bind(&candidate.parcel_acres)
    .bind(&candidate.apn)
    .bind(&candidate.mailing_address)
    .bind(&candidate.mailing_city)
    .bind(&candidate.mailing_state)
    .bind(&candidate.mailing_zip)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Every phone persisted for a user.
///
/// Read once at the start of an import run; the run works against this
/// snapshot for its whole lifetime.
pub async fn list_phones(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar(r#"SELECT phone FROM contacts WHERE user_id = $1"#)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Get contact by ID
pub async fn get_contact(
    pool: &PgPool,
    user_id: Uuid,
    contact_id: Uuid,
) -> sqlx::Result<Option<Contact>> {
    sqlx::query_as::<_, Contact>(&format!(
        r#"SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1 AND user_id = $2"#
    ))
    .bind(contact_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// List contacts for a user, optionally filtered by a search term over
/// phone and name fields
pub async fn list_contacts(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
    search: Option<&str>,
) -> sqlx::Result<Vec<Contact>> {
    let pattern = search.map(|s| format!("%{}%", s));

    sqlx::query_as::<_, Contact>(&format!(
        r#"
        SELECT {CONTACT_COLUMNS}
        FROM contacts
        WHERE user_id = $1
          AND ($2::text IS NULL
               OR phone ILIKE $2
               OR first_name ILIKE $2
               OR last_name ILIKE $2
               OR email ILIKE $2)
        ORDER BY created_at DESC, id
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(user_id)
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Count contacts for a user with the same filter as [`list_contacts`]
pub async fn count_contacts(
    pool: &PgPool,
    user_id: Uuid,
    search: Option<&str>,
) -> sqlx::Result<i64> {
    let pattern = search.map(|s| format!("%{}%", s));

    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM contacts
        WHERE user_id = $1
          AND ($2::text IS NULL
               OR phone ILIKE $2
               OR first_name ILIKE $2
               OR last_name ILIKE $2
               OR email ILIKE $2)
        "#,
    )
    .bind(user_id)
    .bind(pattern)
    .fetch_one(pool)
    .await
}

/// Update a contact. Unsupplied fields keep their current values; a
/// supplied `dnc` also stamps `dnc_updated_at`.
pub async fn update_contact(
    pool: &PgPool,
    user_id: Uuid,
    req: &UpdateContactRequest,
) -> sqlx::Result<Option<Contact>> {
    sqlx::query_as::<_, Contact>(&format!(
        r#"
        UPDATE contacts
        SET
            phone = COALESCE($3, phone),
            first_name = COALESCE($4, first_name),
            last_name = COALESCE($5, last_name),
            email = COALESCE($6, email),
            property_address = COALESCE($7, property_address),
            property_city = COALESCE($8, property_city),
            property_state = COALESCE($9, property_state),
            property_zip = COALESCE($10, property_zip),
            parcel_county = COALESCE($11, parcel_county),
            parcel_state = COALESCE($12, parcel_state),
            parcel_acres = COALESCE($13, parcel_acres),
            apn = COALESCE($14, apn),
            mailing_address = COALESCE($15, mailing_address),
            mailing_city = COALESCE($16, mailing_city),
            mailing_state = COALESCE($17, mailing_state),
            mailing_zip = COALESCE($18, mailing_zip),
            dnc = COALESCE($19, dnc),
            dnc_updated_at = CASE WHEN $19::boolean IS NOT NULL THEN NOW() ELSE dnc_updated_at END,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING {CONTACT_COLUMNS}
        "#
    ))
    .bind(req.id)
    .bind(user_id)
    .bind(&req.phone)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.property_address)
    .bind(&req.property_city)
    .bind(&req.property_state)
    .bind(&req.property_zip)
    .bind(&req.parcel_county)
    .bind(&req.parcel_state)
    .bind(&req.parcel_acres)
    .bind(&req.apn)
    .bind(&req.mailing_address)
    .bind(&req.mailing_city)
    .bind(&req.mailing_state)
    .bind(&req.mailing_zip)
    .bind(req.dnc)
    .fetch_optional(pool)
    .await
}

/// Delete a contact. Returns whether a row was removed.
pub async fn delete_contact(pool: &PgPool, user_id: Uuid, contact_id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM contacts WHERE id = $1 AND user_id = $2"#)
        .bind(contact_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete several contacts at once. Returns the number removed.
pub async fn delete_contacts_bulk(
    pool: &PgPool,
    user_id: Uuid,
    ids: &[Uuid],
) -> sqlx::Result<u64> {
    let result = sqlx::query(r#"DELETE FROM contacts WHERE user_id = $1 AND id = ANY($2)"#)
        .bind(user_id)
        .bind(ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
