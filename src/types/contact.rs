//! Contact types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Contact entity
///
/// Optional fields stay `None` when never supplied, so an unset field is
/// distinguishable from one explicitly set to an empty string, which matters
/// for partial updates. `dnc` is tri-state; `None` means never determined.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Normalized phone number (digits, optional leading `+`)
    pub phone: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,

    // Property address
    pub property_address: Option<String>,
    pub property_city: Option<String>,
    pub property_state: Option<String>,
    pub property_zip: Option<String>,

    // Parcel data
    pub parcel_county: Option<String>,
    pub parcel_state: Option<String>,
    pub parcel_acres: Option<String>,
    pub apn: Option<String>,

    // Mailing address
    pub mailing_address: Option<String>,
    pub mailing_city: Option<String>,
    pub mailing_state: Option<String>,
    pub mailing_zip: Option<String>,

    pub dnc: Option<bool>,
    pub dnc_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a contact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
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
    pub dnc: Option<bool>,
}

/// Request to update a contact
///
/// When `dnc` is present, `dnc_updated_at` is stamped with the update time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    pub id: Uuid,
    pub phone: Option<String>,
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
    pub dnc: Option<bool>,
}

/// Request to fetch or delete a contact by id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactIdRequest {
    pub id: Uuid,
}

/// Request to delete several contacts at once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteContactsRequest {
    pub ids: Vec<Uuid>,
}

/// Response for bulk deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteContactsResponse {
    pub deleted: u64,
}
