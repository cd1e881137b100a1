//! Contact template types (reusable column mappings)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::import::ImportError;

/// Closed set of contact fields a spreadsheet column may map onto.
///
/// Mapping targets are an enum rather than free-form strings so a typo in a
/// template is rejected at creation time instead of silently producing a
/// contact with an unmapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactField {
    FirstName,
    LastName,
    Phone,
    Email,
    PropertyAddress,
    PropertyCity,
    PropertyState,
    PropertyZip,
    ParcelCounty,
    ParcelState,
    ParcelAcres,
    Apn,
    MailingAddress,
    MailingCity,
    MailingState,
    MailingZip,
}

impl ContactField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactField::FirstName => "firstName",
            ContactField::LastName => "lastName",
            ContactField::Phone => "phone",
            ContactField::Email => "email",
            ContactField::PropertyAddress => "propertyAddress",
            ContactField::PropertyCity => "propertyCity",
            ContactField::PropertyState => "propertyState",
            ContactField::PropertyZip => "propertyZip",
            ContactField::ParcelCounty => "parcelCounty",
            ContactField::ParcelState => "parcelState",
            ContactField::ParcelAcres => "parcelAcres",
            ContactField::Apn => "apn",
            ContactField::MailingAddress => "mailingAddress",
            ContactField::MailingCity => "mailingCity",
            ContactField::MailingState => "mailingState",
            ContactField::MailingZip => "mailingZip",
        }
    }
}

/// Mapping from source spreadsheet column name to contact field.
///
/// Source column names are unique by construction (map keys); target
/// uniqueness and the mandatory `phone` target are checked by [`validate`].
///
/// [`validate`]: ColumnMapping::validate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(pub HashMap<String, ContactField>);

impl ColumnMapping {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContactField)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Source column mapped to `phone`, if any.
    pub fn phone_column(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, field)| **field == ContactField::Phone)
            .map(|(column, _)| column.as_str())
    }

    /// Check the mapping invariants: every target field appears at most
    /// once, and `phone` appears exactly once.
    pub fn validate(&self) -> Result<(), ImportError> {
        let mut seen: Vec<ContactField> = Vec::with_capacity(self.0.len());
        for (column, field) in &self.0 {
            if seen.contains(field) {
                return Err(ImportError::TemplateValidation(format!(
                    "field '{}' is mapped by more than one column (including '{}')",
                    field.as_str(),
                    column
                )));
            }
            seen.push(*field);
        }
        if !seen.contains(&ContactField::Phone) {
            return Err(ImportError::TemplateValidation(
                "mapping must include a 'phone' column".to_string(),
            ));
        }
        Ok(())
    }
}

/// Contact template entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub column_mapping: sqlx::types::Json<ColumnMapping>,
    pub dnc_column: Option<String>,
    pub dnc_value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    pub column_mapping: ColumnMapping,
    pub dnc_column: Option<String>,
    pub dnc_value: Option<String>,
}

/// Request to update a template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateRequest {
    pub id: Uuid,
    pub name: Option<String>,
    pub column_mapping: Option<ColumnMapping>,
    pub dnc_column: Option<String>,
    pub dnc_value: Option<String>,
}

/// Request to fetch or delete a template by id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateIdRequest {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, ContactField)]) -> ColumnMapping {
        ColumnMapping(
            pairs
                .iter()
                .map(|(column, field)| (column.to_string(), *field))
                .collect(),
        )
    }

    #[test]
    fn test_contact_field_serializes_camel_case() {
        let json = serde_json::to_string(&ContactField::PropertyAddress).unwrap();
        assert_eq!(json, "\"propertyAddress\"");
        let field: ContactField = serde_json::from_str("\"parcelAcres\"").unwrap();
        assert_eq!(field, ContactField::ParcelAcres);
    }

    #[test]
    fn test_unknown_field_rejected_at_deserialization() {
        let result: Result<ContactField, _> = serde_json::from_str("\"phoen\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_column_mapping_deserializes_from_json_object() {
        let mapping: ColumnMapping =
            serde_json::from_str(r#"{"Phone Number":"phone","First":"firstName"}"#).unwrap();
        assert_eq!(mapping.phone_column(), Some("Phone Number"));
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_phone_target() {
        let m = mapping(&[("First", ContactField::FirstName)]);
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_targets() {
        let m = mapping(&[
            ("Phone", ContactField::Phone),
            ("Cell", ContactField::Phone),
        ]);
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_full_mapping() {
        let m = mapping(&[
            ("Phone", ContactField::Phone),
            ("First", ContactField::FirstName),
            ("Last", ContactField::LastName),
            ("Mail City", ContactField::MailingCity),
        ]);
        assert!(m.validate().is_ok());
    }
}
