//! Analysis error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The header row has no column with the required name.
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    /// The input has no header row at all.
    #[error("input contains no data")]
    EmptyInput,

    /// A data row has more fields than the header; `row` is 1-based, header excluded.
    #[error("row {row} has {fields} fields, header has {expected}")]
    TooManyFields {
        row: usize,
        fields: usize,
        expected: usize,
    },

    #[error("invalid csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The sentiment model failed on a row; `row` is 1-based, header excluded.
    #[error("failed to score row {row}: {reason}")]
    Scoring { row: usize, reason: String },

    #[error("failed to render chart {path}: {reason}")]
    Chart { path: PathBuf, reason: String },

    #[error("failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },
}

impl AnalysisError {
    /// True when the uploaded data itself is malformed.
    pub fn is_data_format(&self) -> bool {
        match self {
            AnalysisError::MissingColumn { .. }
            | AnalysisError::EmptyInput
            | AnalysisError::TooManyFields { .. } => true,
            AnalysisError::Csv(err) => !matches!(err.kind(), csv::ErrorKind::Io(_)),
            _ => false,
        }
    }
}
