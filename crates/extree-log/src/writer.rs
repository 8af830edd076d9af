//! Batched, append-only writer for the tree log.
//!
//! Records are buffered in memory and committed as one checksummed segment
//! when `batch_size` records are pending, when the owner forces a commit
//! (the persistent tree does so on every dump), and on drop.

use extree_core::RunId;

use crate::codec::{self, Codec};
use crate::error::{Error, Result};
use crate::record::{LogBatch, LogRecord};
use crate::segment;
use crate::storage::LogStorage;

pub struct PersistenceWriter {
    storage: Box<dyn LogStorage>,
    path: String,
    codec: Codec,
    run: RunId,
    batch_size: usize,
    pending: Vec<LogRecord>,
    next_seq: u64,
    committed_records: u64,
}

impl PersistenceWriter {
    /// Create (or truncate) the log at `path`. A fresh run always starts
    /// from an empty log.
    pub fn create(
        storage: Box<dyn LogStorage>,
        path: impl Into<String>,
        codec: Codec,
        batch_size: usize,
    ) -> Result<Self> {
        let path = path.into();
        storage.create(&path)?;
        let run = RunId::new_v4();
        tracing::debug!(%path, %run, ?codec, batch_size, "opened tree log");
        Ok(Self {
            storage,
            path,
            codec,
            run,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            next_seq: 0,
            committed_records: 0,
        })
    }

    /// Queue one record, committing if the batch is full.
    pub fn write(&mut self, record: LogRecord) -> Result<()> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.batch_commit(true)?;
        }
        Ok(())
    }

    /// Commit pending records as one segment. Without `force`, only a full
    /// batch is committed.
    ///
    /// Pending records are consumed even when the append fails; the failure
    /// is returned and the log continues with the next batch.
    pub fn batch_commit(&mut self, force: bool) -> Result<()> {
        if self.pending.is_empty() || (!force && self.pending.len() < self.batch_size) {
            return Ok(());
        }

        let batch = LogBatch {
            run: self.run,
            seq: self.next_seq,
            records: std::mem::take(&mut self.pending),
        };
        let count = batch.records.len() as u64;

        let uncompressed =
            serde_json::to_vec(&batch).map_err(|e| Error::Codec(format!("json serialize: {e}")))?;
        let compressed = codec::compress(self.codec, &uncompressed)?;
        let frame = segment::encode_frame(self.codec, uncompressed.len() as u64, &compressed);

        self.storage.append(&self.path, &frame)?;

        self.next_seq += 1;
        self.committed_records += count;
        tracing::debug!(
            path = %self.path,
            seq = batch.seq,
            records = count,
            bytes = frame.len(),
            "committed tree log batch"
        );
        Ok(())
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn committed_records(&self) -> u64 {
        self.committed_records
    }
}

impl Drop for PersistenceWriter {
    fn drop(&mut self) {
        if let Err(e) = self.batch_commit(true) {
            tracing::error!(path = %self.path, error = %e, "failed to commit tree log on close");
        }
    }
}
