//! Output sinks for schema and record files.
//!
//! An [`OutputSink`] is either backed by a file (optionally gzip-compressed)
//! or discards everything written to it. Callers never branch on which one
//! they hold.

use crate::error::{ConvertError, Result};
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const WRITER_BUFFER_SIZE: usize = 256 * 1024;

/// File extension appended to compressed chunk files.
pub const COMPRESSED_EXTENSION: &str = "gz";

enum Encoder {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Encoder {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Encoder::Plain(w) => w,
            Encoder::Gzip(w) => w,
        }
    }

    fn finish(self) -> std::io::Result<()> {
        match self {
            Encoder::Plain(mut w) => w.flush(),
            Encoder::Gzip(w) => w.finish()?.flush(),
        }
    }
}

pub struct FileSink {
    path: PathBuf,
    encoder: Encoder,
    bytes_written: u64,
}

impl FileSink {
    pub fn create(path: &Path, compress: bool) -> Result<Self> {
        let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
        let writer = BufWriter::with_capacity(WRITER_BUFFER_SIZE, file);
        let encoder = if compress {
            Encoder::Gzip(GzEncoder::new(writer, flate2::Compression::default()))
        } else {
            Encoder::Plain(writer)
        };

        Ok(Self {
            path: path.to_path_buf(),
            encoder,
            bytes_written: 0,
        })
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.encoder
            .writer()
            .write_all(bytes)
            .map_err(|e| ConvertError::io(&self.path, e))?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Uncompressed bytes handed to this sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// Destination for produced text, real or discarding.
pub enum OutputSink {
    File(FileSink),
    Discard,
}

impl OutputSink {
    pub fn create(path: &Path, compress: bool) -> Result<Self> {
        Ok(OutputSink::File(FileSink::create(path, compress)?))
    }

    pub fn discard() -> Self {
        OutputSink::Discard
    }

    /// Write `text` followed by a newline.
    pub fn write_line(&mut self, text: &[u8]) -> Result<()> {
        self.write_raw(text)?;
        self.write_raw(b"\n")
    }

    pub fn write_raw(&mut self, text: &[u8]) -> Result<()> {
        match self {
            OutputSink::File(sink) => sink.write_all(text),
            OutputSink::Discard => Ok(()),
        }
    }

    /// Flush and release the underlying file. Consumes the sink so it can only
    /// be closed once.
    pub fn close(self) -> Result<()> {
        match self {
            OutputSink::File(sink) => {
                let FileSink { path, encoder, .. } = sink;
                encoder.finish().map_err(|e| ConvertError::io(path, e))
            }
            OutputSink::Discard => Ok(()),
        }
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, OutputSink::Discard)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputSink::File(sink) => Some(sink.path()),
            OutputSink::Discard => None,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        match self {
            OutputSink::File(sink) => sink.bytes_written(),
            OutputSink::Discard => 0,
        }
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputSink::File(sink) => write!(f, "File({})", sink.path.display()),
            OutputSink::Discard => write!(f, "Discard"),
        }
    }
}
