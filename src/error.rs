//! Error taxonomy for loading, validating and reconciling datasets.
//!
//! Every defect the engine can detect is fatal to the run, so there is a
//! single error type and no warning tier. Messages are part of the
//! user-facing contract and are asserted verbatim by the test suite.

use std::{io, path::PathBuf};

use itertools::Itertools;
use thiserror::Error;

use crate::dataset::DatasetLabel;

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("The submitted {label} file is empty.")]
    EmptyInput { label: DatasetLabel },

    #[error(
        "Unsupported file extension for {label} file {path:?}. Allowed extensions are: .csv, .tsv"
    )]
    UnsupportedExtension { label: DatasetLabel, path: PathBuf },

    #[error("Unsupported return file format. Allowed return file formats are: csv, html, json")]
    UnsupportedFormat { requested: String },

    #[error("Missing columns: {}, in {label} file", .columns.iter().join(", "))]
    MissingColumns {
        label: DatasetLabel,
        columns: Vec<String>,
    },

    #[error("Unexpected columns: {}, in {label} file", .columns.iter().join(", "))]
    UnexpectedColumns {
        label: DatasetLabel,
        columns: Vec<String>,
    },

    #[error("ID value empty in {label} file for row in position {position}")]
    EmptyId { label: DatasetLabel, position: usize },

    #[error("{field} value empty in {label} file for row with ID {id}")]
    EmptyField {
        label: DatasetLabel,
        field: &'static str,
        id: String,
    },

    #[error("invalid ID type for row in position {position} in {label} file")]
    InvalidId { label: DatasetLabel, position: usize },

    #[error("invalid date input in {label} file {value} from row with ID {id}")]
    InvalidDate {
        label: DatasetLabel,
        value: String,
        id: String,
    },

    #[error("invalid amount input in {label} file {value} from row with ID {id}")]
    InvalidAmount {
        label: DatasetLabel,
        value: String,
        id: String,
    },

    #[error("duplicate ID {id} in {label} file at positions {first} and {duplicate}")]
    DuplicateId {
        label: DatasetLabel,
        id: i64,
        first: usize,
        duplicate: usize,
    },

    #[error("reconciliation cancelled")]
    Cancelled,

    #[error("Reading {label} file at line {line}: {source}")]
    Read {
        label: DatasetLabel,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Expected {expected} fields in {label} file at line {line}, saw {found}")]
    RowTooLong {
        label: DatasetLabel,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Failed to decode {label} file at line {line} with encoding {encoding}")]
    Decode {
        label: DatasetLabel,
        line: u64,
        encoding: &'static str,
    },

    #[error("Opening {label} file {path:?}")]
    Io {
        label: DatasetLabel,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReconError {
    /// True for defects in a file's column layout, as opposed to row content.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ReconError::MissingColumns { .. } | ReconError::UnexpectedColumns { .. }
        )
    }

    /// The dataset the error was raised for, when it is tied to one.
    pub fn label(&self) -> Option<DatasetLabel> {
        match self {
            ReconError::EmptyInput { label }
            | ReconError::UnsupportedExtension { label, .. }
            | ReconError::MissingColumns { label, .. }
            | ReconError::UnexpectedColumns { label, .. }
            | ReconError::EmptyId { label, .. }
            | ReconError::EmptyField { label, .. }
            | ReconError::InvalidId { label, .. }
            | ReconError::InvalidDate { label, .. }
            | ReconError::InvalidAmount { label, .. }
            | ReconError::DuplicateId { label, .. }
            | ReconError::Read { label, .. }
            | ReconError::RowTooLong { label, .. }
            | ReconError::Decode { label, .. }
            | ReconError::Io { label, .. } => Some(*label),
            ReconError::UnsupportedFormat { .. } | ReconError::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_message_lists_every_column() {
        let err = ReconError::MissingColumns {
            label: DatasetLabel::Source,
            columns: vec!["ID".to_string(), "Amount".to_string()],
        };
        assert_eq!(err.to_string(), "Missing columns: ID, Amount, in source file");
        assert!(err.is_structural());
        assert_eq!(err.label(), Some(DatasetLabel::Source));
    }

    #[test]
    fn row_errors_are_not_structural() {
        let err = ReconError::InvalidId {
            label: DatasetLabel::Target,
            position: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid ID type for row in position 3 in target file"
        );
        assert!(!err.is_structural());
    }

    #[test]
    fn cancelled_has_no_label() {
        assert_eq!(ReconError::Cancelled.label(), None);
    }
}
