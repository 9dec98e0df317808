//! Dump scanner: the top-level conversion driver for one input.
//!
//! Reads the dump line by line. `CREATE TABLE` headers hand the following
//! lines to the schema extractor; `INSERT INTO ... VALUES` lines are routed
//! to the current record chunk and tokenized. Every other line is ignored.

mod compression;
mod reader;

pub use compression::Compression;
pub use reader::{determine_buffer_size, LineReader, SMALL_BUFFER_SIZE};

use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::progress::ProgressReader;
use crate::router::ChunkRouter;
use crate::schema;
use crate::tokenizer::TupleTokenizer;
use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static CREATE_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^CREATE TABLE `([^`]+)` \($").unwrap());

static INSERT_INTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^INSERT INTO `([^`]+)` VALUES ").unwrap());

/// Classification of one dump line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    CreateTable(Cow<'a, str>),
    Insert {
        table: Cow<'a, str>,
        payload: &'a [u8],
    },
    Unrecognized,
}

pub fn classify_line(line: &[u8]) -> Statement<'_> {
    if let Some(caps) = CREATE_TABLE_RE.captures(line) {
        if let Some(name) = caps.get(1) {
            return Statement::CreateTable(String::from_utf8_lossy(name.as_bytes()));
        }
    }
    if let Some(caps) = INSERT_INTO_RE.captures(line) {
        if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
            let payload = &line[whole.end()..];
            if !payload.is_empty() {
                return Statement::Insert {
                    table: String::from_utf8_lossy(name.as_bytes()),
                    payload,
                };
            }
        }
    }
    Statement::Unrecognized
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    /// Tables seen, in dump order.
    pub tables: Vec<String>,
    pub schemas_written: usize,
    /// CREATE TABLE blocks cut off by the end of the input.
    pub unterminated_schemas: usize,
    pub tables_skipped: usize,
    pub statements: u64,
    /// Records written to chunk files; skipped tables are not counted.
    pub records: u64,
    pub chunks_opened: u64,
    pub bytes_read: u64,
}

impl ScanStats {
    pub fn merge(&mut self, other: ScanStats) {
        for table in other.tables {
            if !self.tables.contains(&table) {
                self.tables.push(table);
            }
        }
        self.schemas_written += other.schemas_written;
        self.unterminated_schemas += other.unterminated_schemas;
        self.tables_skipped += other.tables_skipped;
        self.statements += other.statements;
        self.records += other.records;
        self.chunks_opened += other.chunks_opened;
        self.bytes_read += other.bytes_read;
    }
}

pub struct DumpScanner {
    router: ChunkRouter,
    tokenizer: TupleTokenizer,
    progress_fn: Option<Box<dyn Fn(u64)>>,
}

impl DumpScanner {
    pub fn new(router: ChunkRouter) -> Self {
        Self {
            router,
            tokenizer: TupleTokenizer::new(),
            progress_fn: None,
        }
    }

    /// Build a scanner writing into `output_dir` with the given settings.
    pub fn from_config(output_dir: PathBuf, config: &ConvertConfig) -> Result<Self> {
        let router = ChunkRouter::new(output_dir, config.skip_policy()?)
            .with_chunk_size(config.chunk_size)
            .with_compression(config.compress);
        Ok(Self::new(router)
            .with_tokenizer(TupleTokenizer::new().with_strip_ip_suffix(config.strip_ip_suffix)))
    }

    pub fn with_tokenizer(mut self, tokenizer: TupleTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_progress<F: Fn(u64) + 'static>(mut self, f: F) -> Self {
        self.progress_fn = Some(Box::new(f));
        self
    }

    /// Scan a dump file, decompressing it according to its extension.
    pub fn scan_file(&mut self, path: &Path) -> Result<ScanStats> {
        let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
        let file_size = file.metadata().map_err(|e| ConvertError::io(path, e))?.len();
        let buffer_size = determine_buffer_size(file_size);
        let compression = Compression::from_path(path);
        if compression != Compression::None {
            debug!("{}: {} compressed input", path.display(), compression);
        }

        let reader: Box<dyn Read> = if let Some(cb) = self.progress_fn.take() {
            Box::new(ProgressReader::new(file, cb))
        } else {
            Box::new(file)
        };
        let reader = compression
            .wrap_reader(reader)
            .map_err(|e| ConvertError::io(path, e))?;

        let stats = self.scan(reader, buffer_size)?;
        info!(
            "{}: {} tables, {} records in {} chunks",
            path.display(),
            stats.tables.len(),
            stats.records,
            stats.chunks_opened
        );
        Ok(stats)
    }

    /// Scan a dump stream. The open record chunk is closed on every exit,
    /// including a structural violation in the middle of a statement.
    pub fn scan<R: Read>(&mut self, reader: R, buffer_size: usize) -> Result<ScanStats> {
        let mut lines = LineReader::new(reader, buffer_size);
        let mut stats = ScanStats::default();
        let chunks_before = self.router.chunks_opened();

        let scanned = self.scan_lines(&mut lines, &mut stats);
        let closed = self.router.close();
        scanned?;
        closed?;

        stats.chunks_opened = self.router.chunks_opened() - chunks_before;
        stats.bytes_read = lines.bytes_read();
        Ok(stats)
    }

    fn scan_lines<R: Read>(
        &mut self,
        lines: &mut LineReader<R>,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let mut seen: AHashSet<String> = AHashSet::new();
        let mut line = Vec::new();
        let mut out = Vec::new();

        while lines.next_line(&mut line)? {
            match classify_line(&line) {
                Statement::CreateTable(table) => {
                    let table = table.into_owned();
                    let mut sink = self.router.schema_sink(&table)?;
                    let skipped = sink.is_discard();
                    let extracted = schema::extract(lines, &mut sink);
                    let closed = sink.close();
                    let summary = extracted?;
                    closed?;

                    if seen.insert(table.clone()) {
                        if skipped {
                            stats.tables_skipped += 1;
                        }
                        stats.tables.push(table);
                    }
                    if !skipped {
                        stats.schemas_written += 1;
                    }
                    if !summary.terminated {
                        stats.unterminated_schemas += 1;
                    }
                }
                Statement::Insert { table, payload } => {
                    let state = self.router.sink_for(&table, payload.len() as u64)?;
                    out.clear();
                    let records = self
                        .tokenizer
                        .tokenize(payload, state.arity_mut(), &mut out)
                        .map_err(|violation| ConvertError::Structural {
                            table: table.to_string(),
                            line: lines.line_number(),
                            violation,
                        })?;
                    state.sink_mut().write_raw(&out)?;

                    if seen.insert(table.to_string()) {
                        if state.is_skipped() {
                            stats.tables_skipped += 1;
                        }
                        stats.tables.push(table.into_owned());
                    }
                    stats.statements += 1;
                    if !state.is_skipped() {
                        stats.records += records as u64;
                    }
                }
                Statement::Unrecognized => {}
            }
        }

        Ok(())
    }
}
