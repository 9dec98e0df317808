//! Chunk routing for record output.
//!
//! The dump is grouped by table, so only one record file is open at a time.
//! [`ChunkRouter`] owns that file and rotates it when the table changes or the
//! chunk grows past the configured size.

mod naming;

pub use naming::{
    chunk_file_name, chunk_file_pattern, first_chunk_exists, list_chunks, list_schema_tables,
    schema_file_name, SCHEMA_EXTENSION,
};

use crate::error::{ConvertError, Result};
use crate::sink::OutputSink;
use ahash::{AHashMap, AHashSet};
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Default chunk size ceiling (128 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 0x800_0000;

/// Allow/deny filter over table names.
///
/// A table is skipped iff it does not match `allow` or it matches `deny`.
/// Both patterns must match the whole table name.
#[derive(Debug, Clone)]
pub struct SkipPolicy {
    allow: Regex,
    deny: Regex,
}

impl SkipPolicy {
    pub fn new(allow: &str, deny: &str) -> Result<Self> {
        Ok(Self {
            allow: compile_anchored(allow)?,
            deny: compile_anchored(deny)?,
        })
    }

    pub fn is_skipped(&self, table: &str) -> bool {
        !self.allow.is_match(table) || self.deny.is_match(table)
    }
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self {
            allow: Regex::new("^(?:.+)$").unwrap(),
            deny: Regex::new("^(?:)$").unwrap(),
        }
    }
}

/// Reject table names that would not stay a single file inside the output
/// directory.
fn check_table_name(table: &str) -> Result<()> {
    let invalid = table.is_empty()
        || table == "."
        || table == ".."
        || table.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ConvertError::InvalidTableName {
            table: table.to_string(),
        });
    }
    Ok(())
}

fn compile_anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| ConvertError::Config(format!("invalid table pattern '{}': {}", pattern, e)))
}

/// Output state of the table currently being written.
#[derive(Debug)]
pub struct TableOutputState {
    table: String,
    sink: OutputSink,
    bytes_written: u64,
    chunk_index: u32,
    arity: Option<usize>,
    skipped: bool,
}

impl TableOutputState {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn sink_mut(&mut self) -> &mut OutputSink {
        &mut self.sink
    }

    /// Field count fixed by the table's first tuple.
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn arity_mut(&mut self) -> &mut Option<usize> {
        &mut self.arity
    }

    /// Estimated bytes routed to the current chunk.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn chunk_index(&self) -> u32 {
        self.chunk_index
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }
}

pub struct ChunkRouter {
    output_dir: PathBuf,
    chunk_size: u64,
    compress: bool,
    policy: SkipPolicy,
    current: Option<TableOutputState>,
    skip_cache: AHashMap<String, bool>,
    finished_tables: AHashSet<String>,
    chunks_opened: u64,
}

impl ChunkRouter {
    pub fn new(output_dir: PathBuf, policy: SkipPolicy) -> Self {
        Self {
            output_dir,
            chunk_size: DEFAULT_CHUNK_SIZE,
            compress: false,
            policy,
            current: None,
            skip_cache: AHashMap::new(),
            finished_tables: AHashSet::new(),
            chunks_opened: 0,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Skip decision for `table`, computed once and cached.
    pub fn is_skipped(&mut self, table: &str) -> bool {
        if let Some(&skipped) = self.skip_cache.get(table) {
            return skipped;
        }
        let skipped = self.policy.is_skipped(table);
        self.skip_cache.insert(table.to_string(), skipped);
        skipped
    }

    /// Open the schema sink for `table`: a file, or a discarding sink when the
    /// table is skipped.
    pub fn schema_sink(&mut self, table: &str) -> Result<OutputSink> {
        if self.is_skipped(table) {
            debug!("skipping schema: {}", table);
            return Ok(OutputSink::discard());
        }
        check_table_name(table)?;
        debug!("retrieving schema: {}", table);
        let path = self.output_dir.join(schema_file_name(table));
        OutputSink::create(&path, false)
    }

    /// Route a statement of `len` bytes for `table`, rotating the open chunk
    /// when needed, and return the table's output state.
    pub fn sink_for(&mut self, table: &str, len: u64) -> Result<&mut TableOutputState> {
        let next = match self.current.take() {
            Some(mut state) if state.table == table => {
                if state.bytes_written > 0 && state.bytes_written + len > self.chunk_size {
                    close_sink(std::mem::replace(&mut state.sink, OutputSink::discard()))?;
                    state.chunk_index += 1;
                    state.sink = self.open_chunk(table, state.chunk_index, state.skipped)?;
                    state.bytes_written = len;
                } else {
                    state.bytes_written += len;
                }
                state
            }
            previous => {
                if let Some(previous) = previous {
                    self.finished_tables.insert(previous.table.clone());
                    close_sink(previous.sink)?;
                }
                if self.finished_tables.contains(table) {
                    warn!(
                        "table `{}` appears again after other tables; chunk 000 will be rewritten",
                        table
                    );
                }

                let skipped = self.is_skipped(table);
                if skipped {
                    debug!("skipping records: {}", table);
                } else {
                    check_table_name(table)?;
                    debug!("retrieving records: {}", table);
                }
                TableOutputState {
                    table: table.to_string(),
                    sink: self.open_chunk(table, 0, skipped)?,
                    bytes_written: len,
                    chunk_index: 0,
                    arity: None,
                    skipped,
                }
            }
        };

        Ok(self.current.insert(next))
    }

    fn open_chunk(&mut self, table: &str, index: u32, skipped: bool) -> Result<OutputSink> {
        if skipped {
            return Ok(OutputSink::discard());
        }
        let path = self
            .output_dir
            .join(chunk_file_name(table, index, self.compress));
        debug!("opening chunk {}", path.display());
        let sink = OutputSink::create(&path, self.compress)?;
        self.chunks_opened += 1;
        Ok(sink)
    }

    pub fn current(&self) -> Option<&TableOutputState> {
        self.current.as_ref()
    }

    /// Number of record files created so far.
    pub fn chunks_opened(&self) -> u64 {
        self.chunks_opened
    }

    /// Close the open record sink, if any. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        match self.current.take() {
            Some(state) => {
                self.finished_tables.insert(state.table);
                close_sink(state.sink)
            }
            None => Ok(()),
        }
    }
}

fn close_sink(sink: OutputSink) -> Result<()> {
    if let Some(path) = sink.path() {
        debug!("closing {} ({} bytes)", path.display(), sink.bytes_written());
    }
    sink.close()
}
