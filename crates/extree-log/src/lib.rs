#![forbid(unsafe_code)]
//! extree-log: the append-only execution-tree log.
//!
//! The persistent tree hands every branch and termination to a
//! [`PersistenceWriter`], which buffers records and commits them in
//! checksummed segments. [`read_log`] validates a log back into the ordered
//! record stream and [`ReplayedTree`] rebuilds the tree from that stream
//! alone.
//!
//! Storage is abstracted behind [`LogStorage`] so tests can run against
//! [`MemoryStorage`] instead of the file system.

pub mod codec;
pub mod error;
pub mod reader;
pub mod record;
pub mod replay;
pub mod segment;
pub mod storage;
pub mod writer;

pub use codec::Codec;
pub use reader::{read_log, LogContents};
pub use record::{LogBatch, LogRecord};
pub use replay::{ReplayStats, ReplayedTree};
pub use storage::{FsStorage, LogStorage, MemoryStorage};
pub use writer::PersistenceWriter;
