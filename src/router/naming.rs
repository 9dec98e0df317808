//! Output file naming.
//!
//! Schema files are `<table>.schema`; record chunks are `<table>.<NNN>.csv`
//! with an optional `.gz` suffix. The uploader finds chunks by listing the
//! directory, so these names are a contract.

use crate::sink::COMPRESSED_EXTENSION;
use regex::Regex;
use std::fs;
use std::path::Path;

pub const SCHEMA_EXTENSION: &str = "schema";

pub fn schema_file_name(table: &str) -> String {
    format!("{}.{}", table, SCHEMA_EXTENSION)
}

pub fn chunk_file_name(table: &str, index: u32, compress: bool) -> String {
    if compress {
        format!("{}.{:03}.csv.{}", table, index, COMPRESSED_EXTENSION)
    } else {
        format!("{}.{:03}.csv", table, index)
    }
}

/// Pattern matching every chunk file of `table`; group 1 is the chunk index.
pub fn chunk_file_pattern(table: &str) -> Regex {
    let pattern = format!(
        r"^{}\.([0-9]+)\.csv(\.{})?$",
        regex::escape(table),
        COMPRESSED_EXTENSION
    );
    // Escaped literal plus a fixed suffix always compiles.
    Regex::new(&pattern).unwrap()
}

/// Chunk indices of `table` present in `dir`, sorted ascending.
pub fn list_chunks(dir: &Path, table: &str) -> std::io::Result<Vec<u32>> {
    let pattern = chunk_file_pattern(table);
    let mut indices = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(caps) = pattern.captures(name) {
            if let Ok(index) = caps[1].parse::<u32>() {
                indices.push(index);
            }
        }
    }

    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

/// True when chunk `000` of `table` exists in `dir`, i.e. the table has fresh
/// output that has not been uploaded yet.
pub fn first_chunk_exists(dir: &Path, table: &str) -> std::io::Result<bool> {
    Ok(list_chunks(dir, table)?.first() == Some(&0))
}

/// Table names that have a schema file in `dir`, sorted.
pub fn list_schema_tables(dir: &Path) -> std::io::Result<Vec<String>> {
    let suffix = format!(".{}", SCHEMA_EXTENSION);
    let mut tables = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(table) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_suffix(suffix.as_str()))
        {
            if !table.is_empty() {
                tables.push(table.to_string());
            }
        }
    }

    tables.sort();
    Ok(tables)
}
