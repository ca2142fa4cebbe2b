//! Append-only trace file writer.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::dump::{BatchEncoder, DumpError, EncodeStats, PageBatch};

/// The output artifact of one dump conversion.
///
/// Opening truncates: a run that was interrupted leaves an invalid file,
/// and the retry starts over rather than appending to it.
pub struct TraceStore {
    path: PathBuf,
    file: File,
    batches: u64,
    bytes: u64,
}

impl TraceStore {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            batches: 0,
            bytes: 0,
        })
    }

    /// Encode a batch and append it.
    ///
    /// The batch is encoded in memory first, so an encoding error writes
    /// nothing and earlier batches stay valid.
    pub fn append_batch(
        &mut self,
        batch: PageBatch,
        encoder: &mut dyn BatchEncoder,
    ) -> Result<EncodeStats, DumpError> {
        let last_page = batch.last_page();
        let mut buf = Vec::new();
        let stats = encoder.encode_batch(batch, &mut buf)?;

        self.file.write_all(&buf)?;
        self.file.flush()?;
        self.batches += 1;
        self.bytes += buf.len() as u64;
        debug!(path = %self.path.display(), last_page, bytes = buf.len(), "Appended batch");
        Ok(stats)
    }

    /// Flush to disk and close.
    pub fn finish(self) -> std::io::Result<()> {
        self.file.sync_all()
    }

    /// Path of the trace file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Batches appended so far.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Bytes appended so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}
