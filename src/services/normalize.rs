//! Row normalization: raw spreadsheet row → candidate contact

use crate::types::{CandidateContact, ColumnMapping, ContactField, RowError};

/// Message used for every phone-level row failure, so the report stays
/// uniform whether the cell was empty, unmapped, or garbage.
pub const INVALID_PHONE: &str = "invalid or missing phone number";

/// Normalize a raw phone cell.
///
/// Surrounding whitespace is stripped and formatting punctuation (spaces,
/// dashes, dots, parentheses) collapsed; a leading `+` is preserved. The
/// result must match `^\+?\d{1,14}$` or the value is rejected.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut normalized = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        match c {
            '+' if i == 0 => normalized.push('+'),
            '0'..='9' => normalized.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }

    let digits = normalized.strip_prefix('+').unwrap_or(&normalized);
    if digits.is_empty() || digits.len() > 14 {
        return None;
    }

    Some(normalized)
}

/// Apply a column mapping to one raw row.
///
/// Mapped cells are trimmed and copied verbatim; empty or absent cells
/// leave the target field unset (`None`) so unset stays distinguishable
/// from empty. A row whose phone cell is empty, unmapped, or fails the
/// format check is rejected with a [`RowError`] and never reaches dedup.
pub fn normalize_row(
    index: usize,
    row: &[String],
    headers: &[String],
    mapping: &ColumnMapping,
) -> Result<CandidateContact, RowError> {
    let cell_for = |column: &str| -> Option<&str> {
        headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
    };

    let mut candidate = CandidateContact {
        row: index,
        ..Default::default()
    };

    for (column, field) in mapping.iter() {
        if *field == ContactField::Phone {
            continue;
        }
        if let Some(value) = cell_for(column) {
            if !value.is_empty() {
                candidate.set_field(*field, value.to_string());
            }
        }
    }

    let phone_cell = mapping
        .phone_column()
        .and_then(cell_for)
        .unwrap_or_default();
    candidate.phone =
        normalize_phone(phone_cell).ok_or_else(|| RowError::new(index, INVALID_PHONE))?;

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn mapping(pairs: &[(&str, ContactField)]) -> ColumnMapping {
        ColumnMapping(
            pairs
                .iter()
                .map(|(column, field)| (column.to_string(), *field))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_normalize_phone_strips_formatting() {
        assert_eq!(
            normalize_phone("+1 (234) 567-8900").as_deref(),
            Some("+12345678900")
        );
        assert_eq!(normalize_phone("555.123.4567").as_deref(), Some("5551234567"));
        assert_eq!(normalize_phone("  5551111 ").as_deref(), Some("5551111"));
    }

    #[test]
    fn test_normalize_phone_rejects_garbage() {
        assert_eq!(normalize_phone("abc"), None);
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("   "), None);
        assert_eq!(normalize_phone("+"), None);
        // Plus only valid in leading position
        assert_eq!(normalize_phone("12+34"), None);
        // 15 digits exceeds the cap
        assert_eq!(normalize_phone("123456789012345"), None);
        assert_eq!(normalize_phone("12345678901234").as_deref(), Some("12345678901234"));
    }

    #[test]
    fn test_normalize_row_maps_fields() {
        let m = mapping(&[
            ("Phone", ContactField::Phone),
            ("First", ContactField::FirstName),
            ("County", ContactField::ParcelCounty),
        ]);
        let headers = row(&["Phone", "First", "County"]);
        let candidate =
            normalize_row(0, &row(&["555-1111", " Ann ", "Lee"]), &headers, &m).unwrap();
        assert_eq!(candidate.phone, "5551111");
        assert_eq!(candidate.first_name.as_deref(), Some("Ann"));
        assert_eq!(candidate.parcel_county.as_deref(), Some("Lee"));
    }

    #[test]
    fn test_empty_cell_stays_unset() {
        let m = mapping(&[
            ("Phone", ContactField::Phone),
            ("First", ContactField::FirstName),
        ]);
        let headers = row(&["Phone", "First"]);
        let candidate = normalize_row(0, &row(&["5551111", "  "]), &headers, &m).unwrap();
        assert_eq!(candidate.first_name, None);
    }

    #[test]
    fn test_bad_phone_is_row_error_with_index() {
        let m = mapping(&[("Phone", ContactField::Phone)]);
        let headers = row(&["Phone"]);
        let err = normalize_row(7, &row(&["abc"]), &headers, &m).unwrap_err();
        assert_eq!(err.row, 7);
        assert_eq!(err.message, INVALID_PHONE);
    }

    #[test]
    fn test_missing_phone_column_is_row_error() {
        let m = mapping(&[("Phone", ContactField::Phone)]);
        let headers = row(&["Telephone"]);
        assert!(normalize_row(0, &row(&["5551111"]), &headers, &m).is_err());
    }

    #[test]
    fn test_unmapped_columns_ignored() {
        let m = mapping(&[("Phone", ContactField::Phone)]);
        let headers = row(&["Phone", "Unrelated"]);
        let candidate = normalize_row(0, &row(&["5551111", "junk"]), &headers, &m).unwrap();
        assert_eq!(candidate.first_name, None);
        assert_eq!(candidate.phone, "5551111");
    }
}
