//! Spreadsheet-safe CSV export.
//!
//! # Responsibilities
//! - Neutralize cells that spreadsheet software would run as formulas
//! - Serialize comment rows with standard CSV quoting
//!
//! # Design Decisions
//! - Only user-supplied text is sanitized; ids and server timestamps are not
//! - Quoting and escaping are delegated to the `csv` crate writer

use std::borrow::Cow;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column header of the comments export.
pub const EXPORT_HEADER: [&str; 4] = ["id", "created_at", "name", "comment"];

/// Errors while writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV flush error: {0}")]
    Io(#[from] io::Error),
}

/// One exported comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub id: i64,
    pub created_at: String,
    pub name: String,
    pub comment: String,
}

/// Leading characters skipped when looking for a formula trigger.
const LEADING_BLANKS: [char; 6] = [' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Prefix `'` when the first character after ASCII blanks (space, tab, CR,
/// LF, NUL, VT) is `= + - @`.
///
/// The original value, leading blanks included, is kept after the
/// apostrophe.
pub fn sanitize_cell(value: &str) -> Cow<'_, str> {
    match value.trim_start_matches(LEADING_BLANKS).chars().next() {
        Some('=' | '+' | '-' | '@') => Cow::Owned(format!("'{value}")),
        _ => Cow::Borrowed(value),
    }
}

/// Write the header and one sanitized record per row.
pub fn write_comments_csv<'a, W, I>(writer: W, rows: I) -> Result<W, ExportError>
where
    W: io::Write,
    I: IntoIterator<Item = &'a ExportRow>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADER)?;

    let mut written = 0usize;
    for row in rows {
        let id = row.id.to_string();
        let name = sanitize_cell(&row.name);
        let comment = sanitize_cell(&row.comment);
        wtr.write_record([id.as_str(), row.created_at.as_str(), &*name, &*comment])?;
        written += 1;
    }

    tracing::debug!(rows = written, "Comments exported");
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| ExportError::Io(io::Error::new(e.error().kind(), e.error().to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str, comment: &str) -> ExportRow {
        ExportRow {
            id,
            created_at: "2024-05-01T10:00:00+00:00".into(),
            name: name.into(),
            comment: comment.into(),
        }
    }

    #[test]
    fn test_formula_prefixes_are_neutralized() {
        assert_eq!(sanitize_cell("=cmd|'/C calc'!A1"), "'=cmd|'/C calc'!A1");
        assert_eq!(sanitize_cell("+1"), "'+1");
        assert_eq!(sanitize_cell("@SUM(A1)"), "'@SUM(A1)");
        assert_eq!(sanitize_cell("  -1+1"), "'  -1+1");
        assert_eq!(sanitize_cell("\t=1"), "'\t=1");
        assert_eq!(sanitize_cell("\0=1+1"), "'\0=1+1");
        assert_eq!(sanitize_cell("\x0B\r\n@x"), "'\x0B\r\n@x");
    }

    #[test]
    fn test_only_ascii_blanks_are_skipped() {
        // NBSP and other Unicode spaces are content, not padding.
        for value in ["\u{a0}=1", "\u{2003}+1"] {
            assert!(matches!(sanitize_cell(value), Cow::Borrowed(_)), "{value:?}");
        }
    }

    #[test]
    fn test_safe_values_are_borrowed_unchanged() {
        for value in ["normal text", "", "   ", "a=b", "1-2", "'=already"] {
            assert!(matches!(sanitize_cell(value), Cow::Borrowed(v) if v == value));
        }
    }

    #[test]
    fn test_export_quotes_and_sanitizes() {
        let rows = vec![
            row(2, "=HYPERLINK(\"x\")", "hello, \"world\"\nsecond line"),
            row(1, "alice", "@risk"),
        ];
        let out = write_comments_csv(Vec::new(), &rows).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,created_at,name,comment"));
        assert!(text.contains("\"'=HYPERLINK(\"\"x\"\")\""));
        assert!(text.contains("\"hello, \"\"world\"\"\nsecond line\""));
        assert!(text.contains(",alice,'@risk\n"));
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let rows: Vec<ExportRow> = Vec::new();
        let out = write_comments_csv(Vec::new(), &rows).unwrap();
        assert_eq!(out, b"id,created_at,name,comment\n");
    }
}
