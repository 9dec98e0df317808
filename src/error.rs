//! Error types for dump conversion.
//!
//! Structural violations are fatal for the statement (and the run) they occur
//! in; I/O failures are propagated unchanged to the driver.

use std::path::PathBuf;
use thiserror::Error;

/// A structural violation found while tokenizing an INSERT payload.
///
/// `pos` is the byte offset inside the payload where the violation was seen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("nested '(' at offset {pos}")]
    NestedParen { pos: usize },

    #[error("no matching '(' for ')' at offset {pos}")]
    UnmatchedParen { pos: usize },

    #[error("illegal quote outside a record at offset {pos}")]
    IllegalQuote { pos: usize },

    #[error("illegal double quote outside a record at offset {pos}")]
    IllegalDoubleQuote { pos: usize },

    #[error("illegal escape character outside a quoted value at offset {pos}")]
    IllegalEscape { pos: usize },

    #[error("unexpected character {ch:?} outside a record at offset {pos}")]
    IllegalChar { pos: usize, ch: char },

    #[error("record has {found} fields, expected {expected} (offset {pos})")]
    ArityMismatch {
        pos: usize,
        expected: usize,
        found: usize,
    },

    #[error("illegal line termination (in record) at offset {pos}")]
    UnterminatedRecord { pos: usize },

    #[error("illegal line termination (line continued) at offset {pos}")]
    LineContinued { pos: usize },

    #[error("illegal line termination (without ';')")]
    MissingTerminator,
}

/// Errors raised by the conversion engine.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input is not in the expected dump dialect.
    #[error("table `{table}`, line {line}: {violation}")]
    Structural {
        table: String,
        line: u64,
        violation: Violation,
    },

    /// Opening, writing or closing an output file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the dump failed.
    #[error("failed to read dump: {0}")]
    Read(#[from] std::io::Error),

    /// A table name that cannot be used as an output file name.
    #[error("table name `{table}` cannot be used as a file name")]
    InvalidTableName { table: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error is a structural violation of the dump dialect.
    pub fn is_structural(&self) -> bool {
        matches!(self, ConvertError::Structural { .. })
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            ConvertError::Structural { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
