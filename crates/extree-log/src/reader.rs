//! Read a tree log back into its ordered record stream.

use extree_core::RunId;

use crate::codec;
use crate::error::{Error, Result};
use crate::record::{LogBatch, LogRecord};
use crate::segment::{self, SegmentHeader, CHECKSUM_LEN, HEADER_LEN, MAX_PAYLOAD};
use crate::storage::LogStorage;

/// Everything recovered from one log file.
#[derive(Debug, Clone, Default)]
pub struct LogContents {
    /// Run that wrote the log; `None` for an empty log.
    pub run: Option<RunId>,
    pub batches: u64,
    pub records: Vec<LogRecord>,
}

/// Read and validate every segment in `path`.
///
/// Fails on a truncated or corrupt segment, a checksum mismatch, a batch
/// from a different run, or a gap in batch sequence numbers.
pub fn read_log(storage: &dyn LogStorage, path: &str) -> Result<LogContents> {
    let size = storage.size(path)?;
    let mut contents = LogContents::default();
    let mut offset = 0u64;

    while offset < size {
        let header_bytes = storage.read_range(path, offset, HEADER_LEN)?;
        if header_bytes.len() < HEADER_LEN {
            return Err(Error::Corrupt(format!("truncated header at offset {offset}")));
        }
        let header = SegmentHeader::from_bytes(&header_bytes)?;
        header.validate_sizes(MAX_PAYLOAD)?;

        let body_len = header.compressed_len as usize + CHECKSUM_LEN;
        let body = storage.read_range(path, offset + HEADER_LEN as u64, body_len)?;
        if body.len() < body_len {
            return Err(Error::Corrupt(format!("truncated segment at offset {offset}")));
        }
        let (payload, checksum) = body.split_at(header.compressed_len as usize);
        if !segment::verify_checksum(&header_bytes, payload, checksum) {
            return Err(Error::ChecksumMismatch { offset });
        }

        let uncompressed = codec::decompress(header.codec, payload)?;
        let batch: LogBatch = serde_json::from_slice(&uncompressed)
            .map_err(|e| Error::Codec(format!("json deserialize: {e}")))?;

        match contents.run {
            None => contents.run = Some(batch.run),
            Some(run) if run != batch.run => {
                return Err(Error::Corrupt(format!(
                    "batch {} belongs to run {}, expected {}",
                    batch.seq, batch.run, run
                )));
            }
            Some(_) => {}
        }
        if batch.seq != contents.batches {
            return Err(Error::Corrupt(format!(
                "expected batch {}, found {}",
                contents.batches, batch.seq
            )));
        }

        contents.batches += 1;
        contents.records.extend(batch.records);
        offset += (HEADER_LEN + body_len) as u64;
    }

    tracing::debug!(
        path,
        batches = contents.batches,
        records = contents.records.len(),
        "read tree log"
    );
    Ok(contents)
}
