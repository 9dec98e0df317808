//! CREATE TABLE column extraction.
//!
//! After the scanner recognizes a `CREATE TABLE \`name\` (` header, the
//! extractor pulls the following lines up to the closing `) ...;` line and
//! writes one `name<TAB>TYPE` line per column definition. Keys, constraints
//! and anything else that is not a column are skipped.

use crate::error::{ConvertError, Result};
use crate::scanner::LineReader;
use crate::sink::OutputSink;
use crate::types::{classify, OutputType};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::warn;

static COLUMN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  `(.+)` ([^,A-Z]+)( .+|,)$").unwrap());

static END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\).*;$").unwrap());

/// A column definition parsed from a CREATE TABLE body line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub source_type: String,
}

impl ColumnDef {
    pub fn output_type(&self) -> OutputType {
        classify(&self.source_type)
    }
}

/// Parse one body line. Returns `None` for keys, constraints and other
/// non-column lines.
pub fn parse_column_line(line: &[u8]) -> Option<ColumnDef> {
    let caps = COLUMN_RE.captures(line)?;
    Some(ColumnDef {
        name: String::from_utf8_lossy(&caps[1]).into_owned(),
        source_type: String::from_utf8_lossy(&caps[2]).into_owned(),
    })
}

/// True for the `) ENGINE=...;` line that closes a CREATE TABLE block.
pub fn is_end_marker(line: &[u8]) -> bool {
    END_RE.is_match(line)
}

/// Outcome of extracting one CREATE TABLE block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaSummary {
    pub columns: usize,
    /// False when the input ended before the closing line.
    pub terminated: bool,
}

/// Consume the body of a CREATE TABLE block from `lines`, writing schema
/// lines to `sink`. The sink is left open.
pub fn extract<R: Read>(lines: &mut LineReader<R>, sink: &mut OutputSink) -> Result<SchemaSummary> {
    let mut summary = SchemaSummary::default();
    let mut line = Vec::new();

    while lines.next_line(&mut line)? {
        if is_end_marker(&line) {
            summary.terminated = true;
            return Ok(summary);
        }
        let Some(column) = parse_column_line(&line) else {
            continue;
        };
        let out = format!("{}\t{}", column.name, column.output_type());
        sink.write_line(out.as_bytes())?;
        summary.columns += 1;
    }

    warn!(
        "input ended inside a CREATE TABLE block (line {})",
        lines.line_number()
    );
    Ok(summary)
}

/// One `name<TAB>TYPE` entry of a schema file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub field_type: OutputType,
}

/// Read a `<table>.schema` file back.
pub fn read_schema_file(path: &Path) -> Result<Vec<SchemaField>> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    let mut fields = Vec::new();

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| ConvertError::io(path, e))?;
        if line.is_empty() {
            continue;
        }
        let (name, field_type) = line.split_once('\t').ok_or_else(|| {
            ConvertError::Config(format!("{}:{}: missing tab separator", path.display(), i + 1))
        })?;
        let field_type = field_type
            .parse::<OutputType>()
            .map_err(|e| ConvertError::Config(format!("{}:{}: {}", path.display(), i + 1, e)))?;
        fields.push(SchemaField {
            name: name.to_string(),
            field_type,
        });
    }

    Ok(fields)
}
