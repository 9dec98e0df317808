//! Column type classification.
//!
//! Maps a MySQL column type token (as written in `CREATE TABLE`) onto one of
//! the four warehouse column types:
//! - Integer types (INT, BIGINT, TINYINT)
//! - Float types (FLOAT, DOUBLE)
//! - Date/time types (DATE, DATETIME, TIME, TIMESTAMP)
//! - Everything else as STRING

use once_cell::sync::Lazy;
use regex::Regex;

/// Warehouse column type written to `<table>.schema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputType {
    Integer,
    Float,
    Timestamp,
    String,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Integer => "INTEGER",
            OutputType::Float => "FLOAT",
            OutputType::Timestamp => "TIMESTAMP",
            OutputType::String => "STRING",
        }
    }
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INTEGER" => Ok(OutputType::Integer),
            "FLOAT" => Ok(OutputType::Float),
            "TIMESTAMP" => Ok(OutputType::Timestamp),
            "STRING" => Ok(OutputType::String),
            _ => Err(format!(
                "Unknown column type: {}. Valid options: INTEGER, FLOAT, TIMESTAMP, STRING",
                s
            )),
        }
    }
}

// tinyint(1) is a MySQL boolean; it stays INTEGER until the schema is reconciled downstream.
static RE_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(int|bigint|tinyint)").unwrap());
static RE_FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(float|double)").unwrap());
static RE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(date|time)").unwrap());

/// Classify a source column type token. Total: unknown tokens become STRING.
pub fn classify(source_type: &str) -> OutputType {
    if RE_INTEGER.is_match(source_type) {
        OutputType::Integer
    } else if RE_FLOAT.is_match(source_type) {
        OutputType::Float
    } else if RE_TIMESTAMP.is_match(source_type) {
        OutputType::Timestamp
    } else {
        OutputType::String
    }
}
