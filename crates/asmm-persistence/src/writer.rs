//! Buffered JSON Lines writer for report records.
//!
//! Uses append mode, so re-running into the same file never truncates
//! earlier output. Each line is independent; an interrupted write only
//! affects the last line.

use crate::error::PersistenceResult;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// JSON Lines writer for any serializable record type.
pub struct JsonLinesWriter<T: Serialize> {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Buffer of pending records.
    buffer: Vec<T>,
    /// Maximum buffer size before flush.
    max_buffer_size: usize,
    records_written: usize,
}

impl<T: Serialize> JsonLinesWriter<T> {
    /// Open `path` for appending, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>, max_buffer_size: usize) -> PersistenceResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Opening JSON Lines writer (append mode)");

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            buffer: Vec::with_capacity(max_buffer_size),
            max_buffer_size: max_buffer_size.max(1),
            records_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records flushed to disk so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Add a record to the buffer, flushing when full.
    pub fn add_record(&mut self, record: T) -> PersistenceResult<()> {
        self.buffer.push(record);

        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }

        Ok(())
    }

    /// Write all buffered records and flush the file.
    pub fn flush(&mut self) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let record_count = self.buffer.len();
        for record in self.buffer.drain(..) {
            let json = serde_json::to_string(&record)?;
            writeln!(self.writer, "{}", json)?;
        }
        self.writer.flush()?;
        self.records_written += record_count;

        debug!(
            path = %self.path.display(),
            records = record_count,
            "Flushed records to JSON Lines"
        );
        Ok(())
    }

    /// Flush pending records and report the total.
    pub fn close(mut self) -> PersistenceResult<usize> {
        self.flush()?;
        info!(
            path = %self.path.display(),
            records = self.records_written,
            "Closed JSON Lines writer"
        );
        Ok(self.records_written)
    }
}

impl<T: Serialize> Drop for JsonLinesWriter<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, path = %self.path.display(), "Failed to flush buffer on drop");
        }
    }
}
