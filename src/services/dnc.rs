//! Do-not-contact row filtering

/// Decide whether a raw row is marked do-not-contact.
///
/// With no `dnc_column` configured, nothing is ever suppressed. With a
/// column but no `dnc_value`, any non-empty cell marks the row ("column is
/// populated" semantics). With both, the trimmed cell must equal the value
/// case-insensitively.
pub fn is_do_not_contact(
    row: &[String],
    headers: &[String],
    dnc_column: Option<&str>,
    dnc_value: Option<&str>,
) -> bool {
    let Some(column) = dnc_column else {
        return false;
    };
    let Some(index) = headers.iter().position(|h| h == column) else {
        return false;
    };
    let cell = row.get(index).map(|s| s.trim()).unwrap_or("");

    match dnc_value {
        Some(value) => cell.eq_ignore_ascii_case(value.trim()),
        None => !cell.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_no_column_configured_never_suppresses() {
        let headers = row(&["Phone", "DNC"]);
        assert!(!is_do_not_contact(&row(&["5551111", "Y"]), &headers, None, None));
    }

    #[test]
    fn test_value_match_is_case_insensitive() {
        let headers = row(&["Phone", "DNC"]);
        assert!(is_do_not_contact(
            &row(&["5551111", "y"]),
            &headers,
            Some("DNC"),
            Some("Y")
        ));
        assert!(!is_do_not_contact(
            &row(&["5551111", "N"]),
            &headers,
            Some("DNC"),
            Some("Y")
        ));
    }

    #[test]
    fn test_cell_whitespace_trimmed_before_match() {
        let headers = row(&["Phone", "DNC"]);
        assert!(is_do_not_contact(
            &row(&["5551111", " Y "]),
            &headers,
            Some("DNC"),
            Some("Y")
        ));
    }

    #[test]
    fn test_no_value_means_populated_column_suppresses() {
        let headers = row(&["Phone", "DNC"]);
        assert!(is_do_not_contact(
            &row(&["5551111", "anything"]),
            &headers,
            Some("DNC"),
            None
        ));
        assert!(!is_do_not_contact(
            &row(&["5551111", "  "]),
            &headers,
            Some("DNC"),
            None
        ));
    }

    #[test]
    fn test_missing_column_in_file_never_suppresses() {
        let headers = row(&["Phone"]);
        assert!(!is_do_not_contact(
            &row(&["5551111"]),
            &headers,
            Some("DNC"),
            Some("Y")
        ));
    }
}
