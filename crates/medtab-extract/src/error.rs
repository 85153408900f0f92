use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("header line has no column separators (need two or more spaces between names): '{header}'")]
    MalformedHeader { header: String },

    #[error("row {row} has {found} cells but the header has {expected}")]
    Schema {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("header has {found} columns, more than the limit of {limit}")]
    TooManyColumns { found: usize, limit: usize },

    #[error("table has {lines} lines, more than the limit of {limit}")]
    LimitExceeded { lines: usize, limit: usize },

    #[error("unknown column: '{0}'")]
    UnknownColumn(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}
