//! Storage adapters for the tree log.
//!
//! - `fs`: local filesystem (default).
//! - `memory`: HashMap-backed storage for tests.

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Abstract append-only storage for log segments.
pub trait LogStorage: Send + Sync {
    /// Create `path` empty, truncating any previous content. Creates parent
    /// directories if needed.
    fn create(&self, path: &str) -> Result<()>;

    /// Append bytes to `path` and make them durable before returning.
    fn append(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read a byte range from a path. Returns fewer than `len` bytes only at
    /// end of file.
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Size of a path in bytes.
    fn size(&self, path: &str) -> Result<u64>;

    /// Delete a path. Idempotent (no error if path doesn't exist).
    fn delete(&self, path: &str) -> Result<()>;
}
