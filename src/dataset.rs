//! Dataset loading and column-shape validation.
//!
//! A [`Dataset`] is the fully materialised, ordered set of [`RawRow`]s read
//! from one input file. The column layout is confirmed against
//! [`REQUIRED_COLUMNS`] before any row is decoded, so every row can be held in
//! a named-field struct rather than a column-keyed map.

use std::{fmt, fs::File, io::Read, path::Path};

use encoding_rs::Encoding;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::ReconError, io_utils};

pub const ID_COLUMN: &str = "ID";
pub const NAME_COLUMN: &str = "Name";
pub const DATE_COLUMN: &str = "Date";
pub const AMOUNT_COLUMN: &str = "Amount";

pub const REQUIRED_COLUMNS: [&str; 4] = [ID_COLUMN, NAME_COLUMN, DATE_COLUMN, AMOUNT_COLUMN];

/// Which side of the reconciliation a dataset or row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetLabel {
    Source,
    Target,
}

impl fmt::Display for DatasetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLabel::Source => f.write_str("source"),
            DatasetLabel::Target => f.write_str("target"),
        }
    }
}

/// One data line as read, before validation. Empty cells are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 0-based index among the data rows of the file.
    pub position: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub amount: Option<String>,
}

impl RawRow {
    pub fn from_cells(position: usize, id: &str, name: &str, date: &str, amount: &str) -> Self {
        Self {
            position,
            id: cell(id),
            name: cell(name),
            date: cell(date),
            amount: cell(amount),
        }
    }

    /// 1-based position used in user-facing messages.
    pub fn display_position(&self) -> usize {
        self.position + 1
    }
}

fn cell(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Header indices of the required columns within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub id: usize,
    pub name: usize,
    pub date: usize,
    pub amount: usize,
}

/// Confirms that `headers` holds exactly the required column set.
///
/// Missing columns are reported first, in schema order. Any header outside
/// the schema, or a repeated required header, is reported as unexpected.
pub fn check_columns(headers: &[String], label: DatasetLabel) -> Result<ColumnLayout, ReconError> {
    let position_of = |name: &str| headers.iter().position(|h| h.trim() == name);

    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|required| position_of(**required).is_none())
        .map(|required| required.to_string())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(ReconError::MissingColumns {
            label,
            columns: missing,
        });
    }

    let mut seen = Vec::with_capacity(headers.len());
    let mut unexpected = Vec::new();
    for header in headers {
        let trimmed = header.trim();
        if !REQUIRED_COLUMNS.contains(&trimmed) || seen.contains(&trimmed) {
            unexpected.push(trimmed.to_string());
        }
        seen.push(trimmed);
    }
    if !unexpected.is_empty() {
        return Err(ReconError::UnexpectedColumns {
            label,
            columns: unexpected,
        });
    }

    Ok(ColumnLayout {
        id: position_of(ID_COLUMN).unwrap_or_default(),
        name: position_of(NAME_COLUMN).unwrap_or_default(),
        date: position_of(DATE_COLUMN).unwrap_or_default(),
        amount: position_of(AMOUNT_COLUMN).unwrap_or_default(),
    })
}

/// Rows of one input file in file order. Which side a dataset plays is
/// decided by its argument position in [`crate::reconcile`]; `label` on the
/// loaders only names the file in error messages.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<RawRow>,
}

impl Dataset {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Opens and loads a dataset file. The extension must be `.csv` or `.tsv`.
    pub fn from_path(
        path: &Path,
        label: DatasetLabel,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self, ReconError> {
        if !io_utils::has_allowed_extension(path) {
            return Err(ReconError::UnsupportedExtension {
                label,
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).map_err(|source| ReconError::Io {
            label,
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Loading {label} dataset from {path:?} (delimiter '{}', encoding {})",
            io_utils::printable_delimiter(delimiter),
            encoding.name()
        );
        Self::from_reader(file, label, delimiter, encoding).map_err(|err| match err {
            ReconError::Io { label, source, .. } => ReconError::Io {
                label,
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Loads a dataset from any byte stream. The whole input is buffered.
    pub fn from_reader<R: Read>(
        mut reader: R,
        label: DatasetLabel,
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self, ReconError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| ReconError::Io {
                label,
                path: "-".into(),
                source,
            })?;
        if bytes.is_empty() {
            return Err(ReconError::EmptyInput { label });
        }

        let mut csv_reader = io_utils::open_csv_reader(bytes.as_slice(), delimiter);
        let header_record = csv_reader
            .byte_headers()
            .map_err(|source| ReconError::Read {
                label,
                line: 1,
                source,
            })?
            .clone();
        let headers = io_utils::decode_record(&header_record, encoding).ok_or(
            ReconError::Decode {
                label,
                line: 1,
                encoding: encoding.name(),
            },
        )?;
        let layout = check_columns(&headers, label)?;

        let mut rows = Vec::new();
        for (position, record) in csv_reader.byte_records().enumerate() {
            let line = position as u64 + 2;
            let record = record.map_err(|source| ReconError::Read {
                label,
                line,
                source,
            })?;
            if record.len() > headers.len() {
                return Err(ReconError::RowTooLong {
                    label,
                    line,
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            let decoded = io_utils::decode_record(&record, encoding).ok_or(ReconError::Decode {
                label,
                line,
                encoding: encoding.name(),
            })?;
            // Short rows read as empty trailing cells.
            let field = |idx: usize| decoded.get(idx).map(String::as_str).unwrap_or("");
            rows.push(RawRow::from_cells(
                position,
                field(layout.id),
                field(layout.name),
                field(layout.date),
                field(layout.amount),
            ));
        }
        debug!("Loaded {} {label} row(s)", rows.len());
        Ok(Self { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn check_columns_accepts_any_order() {
        let layout = check_columns(
            &headers(&["Amount", "Date", "ID", "Name"]),
            DatasetLabel::Source,
        )
        .expect("valid layout");
        assert_eq!(
            layout,
            ColumnLayout {
                id: 2,
                name: 3,
                date: 1,
                amount: 0
            }
        );
    }

    #[test]
    fn check_columns_lists_missing_in_schema_order() {
        let err = check_columns(&headers(&["Name", "Date", "data"]), DatasetLabel::Source)
            .expect_err("missing columns");
        assert_eq!(err.to_string(), "Missing columns: ID, Amount, in source file");
    }

    #[test]
    fn check_columns_rejects_extra_and_repeated_headers() {
        let err = check_columns(
            &headers(&["ID", "Name", "Date", "Amount", "Memo"]),
            DatasetLabel::Target,
        )
        .expect_err("extra column");
        assert_eq!(err.to_string(), "Unexpected columns: Memo, in target file");

        let err = check_columns(
            &headers(&["ID", "Name", "Date", "Amount", "Name"]),
            DatasetLabel::Target,
        )
        .expect_err("repeated column");
        assert!(matches!(err, ReconError::UnexpectedColumns { .. }));
    }

    #[test]
    fn from_reader_keeps_raw_cells_and_marks_empty_ones() {
        let data = "ID,Name,Date,Amount\n1,  John Doe ,2023-01-01,100\n2,,2023-01-02,\n";
        let dataset = Dataset::from_reader(data.as_bytes(), DatasetLabel::Source, b',', UTF_8)
            .expect("load dataset");
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[0].name.as_deref(), Some("  John Doe "));
        assert_eq!(dataset.rows()[1].name, None);
        assert_eq!(dataset.rows()[1].amount, None);
        assert_eq!(dataset.rows()[1].display_position(), 2);
    }

    #[test]
    fn from_reader_rejects_empty_input() {
        let err = Dataset::from_reader(&b""[..], DatasetLabel::Target, b',', UTF_8)
            .expect_err("empty input");
        assert_eq!(err.to_string(), "The submitted target file is empty.");
    }

    #[test]
    fn from_reader_accepts_header_only_input() {
        let dataset = Dataset::from_reader(
            &b"ID,Name,Date,Amount\n"[..],
            DatasetLabel::Source,
            b',',
            UTF_8,
        )
        .expect("header-only dataset");
        assert!(dataset.is_empty());
    }

    #[test]
    fn from_reader_decodes_legacy_encodings() {
        let data = b"ID;Name;Date;Amount\n1;Jos\xe9;2023-01-01;5\n";
        let dataset = Dataset::from_reader(&data[..], DatasetLabel::Source, b';', WINDOWS_1252)
            .expect("decode windows-1252");
        assert_eq!(dataset.rows()[0].name.as_deref(), Some("José"));
    }

    #[test]
    fn from_reader_pads_short_rows_with_empty_cells() {
        let data = "ID,Name,Date,Amount\n1,John,2023-01-01\n";
        let dataset = Dataset::from_reader(data.as_bytes(), DatasetLabel::Source, b',', UTF_8)
            .expect("short row loads");
        assert_eq!(dataset.rows()[0].date.as_deref(), Some("2023-01-01"));
        assert_eq!(dataset.rows()[0].amount, None);
    }

    #[test]
    fn from_reader_rejects_rows_wider_than_header() {
        let data = "ID,Name,Date,Amount\n1,John,2023-01-01,5\n2,Jane,2023-01-02,6,extra\n";
        let err = Dataset::from_reader(data.as_bytes(), DatasetLabel::Target, b',', UTF_8)
            .expect_err("wide row");
        assert_eq!(
            err.to_string(),
            "Expected 4 fields in target file at line 3, saw 5"
        );
    }
}
