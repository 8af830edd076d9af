//! Streaming snapshot writer: one compact JSON document per line.

use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::snapshot::Snapshot;

pub struct SnapshotStream<W: Write> {
    writer: BufWriter<W>,
    lines: u64,
}

impl<W: Write> SnapshotStream<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            lines: 0,
        }
    }

    /// Write the whole snapshot as one line and flush.
    pub fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let line = serde_json::to_string(snapshot)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::Error::Io(e.into_error()))
    }
}
