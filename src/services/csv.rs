//! CSV parsing for spreadsheet uploads
//!
//! Purely syntactic: raw file text in, header row plus a rectangular string
//! matrix out. No knowledge of contact fields or mappings.

use crate::types::{ImportError, ParsedCsv};

/// Parse raw bytes as CSV text.
///
/// Fails with [`ImportError::MalformedInput`] only when the bytes are not
/// valid UTF-8 (after stripping an optional BOM); anything that decodes as
/// text is handed to [`parse_csv`].
pub fn parse_csv_bytes(bytes: &[u8], preview_rows: Option<usize>) -> Result<ParsedCsv, ImportError> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ImportError::MalformedInput(format!("not valid UTF-8 text: {}", e)))?;
    parse_csv(text, preview_rows)
}

/// Parse CSV text into headers and rows.
///
/// Tolerates quoted fields containing commas or embedded newlines (the csv
/// crate handles quoting), a trailing blank line, and inconsistent row
/// lengths: short rows are padded with empty strings and long rows are
/// truncated to the header width, so no caller ever sees a ragged matrix.
///
/// `preview_rows` caps the returned `rows`; `total_rows` still counts the
/// whole file.
pub fn parse_csv(text: &str, preview_rows: Option<usize>) -> Result<ParsedCsv, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::MalformedInput(format!("cannot read header row: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut total_rows = 0usize;

    for record in reader.records() {
        let record =
            record.map_err(|e| ImportError::MalformedInput(format!("cannot parse row: {}", e)))?;

        // Skip fully blank records (trailing newline at end of file).
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        total_rows += 1;

        if let Some(cap) = preview_rows {
            if rows.len() >= cap {
                continue;
            }
        }

        let mut row: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
        // Pads short rows, truncates long ones.
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(ParsedCsv {
        headers,
        rows,
        total_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_headers_and_rows() {
        let parsed = parse_csv("Phone,First\n5551111,Ann\n5552222,Bob\n", None).unwrap();
        assert_eq!(parsed.headers, vec!["Phone", "First"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.total_rows, 2);
        assert_eq!(parsed.rows[0], vec!["5551111", "Ann"]);
    }

    #[test]
    fn test_quoted_field_with_comma_and_newline() {
        let parsed = parse_csv(
            "Phone,Address\n5551111,\"12 Main St, Apt 4\"\n5552222,\"Line one\nLine two\"\n",
            None,
        )
        .unwrap();
        assert_eq!(parsed.rows[0][1], "12 Main St, Apt 4");
        assert_eq!(parsed.rows[1][1], "Line one\nLine two");
        assert_eq!(parsed.total_rows, 2);
    }

    #[test]
    fn test_short_row_padded_long_row_truncated() {
        let parsed = parse_csv("A,B,C\n1\n1,2,3,4\n", None).unwrap();
        assert_eq!(parsed.rows[0], vec!["1", "", ""]);
        assert_eq!(parsed.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_trailing_blank_line_ignored() {
        let parsed = parse_csv("Phone\n5551111\n\n", None).unwrap();
        assert_eq!(parsed.total_rows, 1);
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn test_preview_cap_keeps_total_count() {
        let parsed = parse_csv("Phone\n1\n2\n3\n4\n", Some(2)).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.total_rows, 4);
    }

    #[test]
    fn test_headers_only_file_is_empty_not_error() {
        let parsed = parse_csv("Phone,First\n", None).unwrap();
        assert_eq!(parsed.total_rows, 0);
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_malformed_input() {
        let result = parse_csv_bytes(&[0x50, 0xff, 0xfe, 0x00], None);
        assert!(matches!(result, Err(ImportError::MalformedInput(_))));
    }

    #[test]
    fn test_bom_is_stripped_from_first_header() {
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend_from_slice(b"Phone\n5551111\n");
        let parsed = parse_csv_bytes(&bytes, None).unwrap();
        assert_eq!(parsed.headers, vec!["Phone"]);
    }
}
