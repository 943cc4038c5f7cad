use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors produced by the CSV trace backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An existing chain file's header disagrees with the current
    /// variable configuration. The file is left untouched.
    #[error("chain file '{path}' has different column names than the current variable set")]
    SchemaMismatch { path: PathBuf },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index {idx} out of range for chain with {len} draws")]
    IndexOutOfRange { idx: isize, len: usize },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("variable '{name}' has {got} values but its shape requires {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("column '{0}' missing from chain file")]
    MissingColumn(String),

    #[error("malformed flat column name '{0}'")]
    MalformedColumnName(String),

    #[error("could not parse '{value}' as a number (row {row}, column '{column}')")]
    ParseValue {
        value: String,
        row: usize,
        column: String,
    },

    /// `record` or `close` was called on a writer that has no open
    /// chain file.
    #[error("chain writer is not open (call setup first)")]
    NotOpen,

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
