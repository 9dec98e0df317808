use std::io::{BufRead, BufReader, Read};

pub const SMALL_BUFFER_SIZE: usize = 64 * 1024;
pub const MEDIUM_BUFFER_SIZE: usize = 256 * 1024;

/// Line-oriented reader over a dump stream.
///
/// Lines are returned without their `\n` / `\r\n` terminator. The reader
/// tracks the 1-based number of the last line returned.
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    line_number: u64,
    bytes_read: u64,
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R, buffer_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, reader),
            line_number: 0,
            bytes_read: 0,
        }
    }

    /// Read the next line into `buf`, replacing its contents. Returns `false`
    /// at end of input.
    pub fn next_line(&mut self, buf: &mut Vec<u8>) -> std::io::Result<bool> {
        buf.clear();
        let n = self.reader.read_until(b'\n', buf)?;
        if n == 0 {
            return Ok(false);
        }
        self.bytes_read += n as u64;
        self.line_number += 1;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(true)
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

pub fn determine_buffer_size(file_size: u64) -> usize {
    if file_size > 1024 * 1024 * 1024 {
        MEDIUM_BUFFER_SIZE
    } else {
        SMALL_BUFFER_SIZE
    }
}
