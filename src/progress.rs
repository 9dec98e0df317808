//! Byte-based progress reporting for dump scans.

use std::io::Read;

/// A reader wrapper that reports the running total of bytes read.
///
/// Wraps the raw (possibly compressed) input file, so totals are comparable
/// to the file size shown by a progress bar.
pub struct ProgressReader<R: Read> {
    reader: R,
    callback: Box<dyn Fn(u64)>,
    bytes_read: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new<F>(reader: R, callback: F) -> Self
    where
        F: Fn(u64) + 'static,
    {
        Self {
            reader,
            callback: Box::new(callback),
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.bytes_read += n as u64;
        (self.callback)(self.bytes_read);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_progress_reader_reports_totals() {
        let seen = Rc::new(Cell::new(0u64));
        let seen_cb = Rc::clone(&seen);
        let data = vec![b'x'; 10_000];
        let mut reader = ProgressReader::new(&data[..], move |n| seen_cb.set(n));

        let mut sink = Vec::new();
        reader.read_to_end(&mut sink).unwrap();

        assert_eq!(sink.len(), 10_000);
        assert_eq!(reader.bytes_read(), 10_000);
        assert_eq!(seen.get(), 10_000);
    }
}
