use crate::models::{ListingRecord, SearchTarget, Signature, CSV_HEADERS};
use crate::progress::ProgressCheckpoint;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Durable, append-only destination for accepted records.
pub trait RecordSink {
    fn append(&mut self, records: &[ListingRecord]) -> Result<()>;
}

/// Appends rows to a CSV file, writing the header only into a fresh file.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, records: &[ListingRecord]) -> Result<()> {
        let fresh = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open output file: {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if fresh {
            writer.write_record(CSV_HEADERS)?;
        }
        for record in records {
            writer.write_record(record.to_csv_record())?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to write to output file: {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory buffer of accepted records, deduplicated by signature and
/// flushed to a [`RecordSink`] every `batch_size` acceptances.
pub struct AccumulationStore<S: RecordSink> {
    sink: S,
    buffer: Vec<ListingRecord>,
    seen: HashSet<Signature>,
    batch_size: usize,
    checkpoint: ProgressCheckpoint,
}

impl<S: RecordSink> AccumulationStore<S> {
    pub fn new(sink: S, batch_size: usize) -> Self {
        Self::resuming(sink, batch_size, ProgressCheckpoint::default())
    }

    /// A store that already knows what the durable file holds. Signatures in
    /// the checkpoint count as seen.
    pub fn resuming(sink: S, batch_size: usize, checkpoint: ProgressCheckpoint) -> Self {
        Self {
            sink,
            buffer: Vec::new(),
            seen: checkpoint.signatures().clone(),
            batch_size: batch_size.max(1),
            checkpoint,
        }
    }

    /// Accept `record` unless its signature was seen before.
    ///
    /// Returns `Ok(false)` for duplicates. Errors only come from the
    /// automatic flush and mean the output is unwritable.
    pub fn add(&mut self, record: ListingRecord) -> Result<bool> {
        if !self.seen.insert(record.signature()) {
            return Ok(false);
        }

        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(true)
    }

    /// Write every buffered record and empty the buffer.
    ///
    /// The buffer is kept intact if the sink fails. Returns the number of
    /// records written.
    pub fn flush(&mut self) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        self.sink.append(&self.buffer)?;

        let written = self.buffer.len();
        for record in self.buffer.drain(..) {
            self.checkpoint.record(record.target(), record.signature());
        }
        log::debug!("Flushed {} listings ({} total on disk)", written, self.checkpoint.total());
        Ok(written)
    }

    /// Listings captured for a target, written or still buffered.
    pub fn captured(&self, target: &SearchTarget) -> usize {
        self.checkpoint.captured(target)
            + self
                .buffer
                .iter()
                .filter(|r| r.business_type == target.category && r.city == target.city && r.state == target.state)
                .count()
    }

    pub fn captured_in_category(&self, category: &str) -> usize {
        self.checkpoint.captured_in_category(category)
            + self.buffer.iter().filter(|r| r.business_type == category).count()
    }

    pub fn total_captured(&self) -> usize {
        self.checkpoint.total() + self.buffer.len()
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn checkpoint(&self) -> &ProgressCheckpoint {
        &self.checkpoint
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
