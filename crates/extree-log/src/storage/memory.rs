//! In-memory storage backend for testing.
//!
//! Clones share the same underlying map, so a test can hand one clone to a
//! writer and read the log back through another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::LogStorage;
use crate::error::{Error, Result};

/// Thread-safe in-memory storage using a HashMap.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".into()))
    }

    /// Check if a path exists
    pub fn contains(&self, path: &str) -> bool {
        self.lock().map(|d| d.contains_key(path)).unwrap_or(false)
    }

    /// Raw bytes stored at `path`.
    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().ok().and_then(|d| d.get(path).cloned())
    }

    /// Overwrite the bytes at `path` (used by tests to simulate corruption).
    pub fn insert(&self, path: &str, bytes: Vec<u8>) {
        if let Ok(mut d) = self.lock() {
            d.insert(path.to_string(), bytes);
        }
    }
}

impl LogStorage for MemoryStorage {
    fn create(&self, path: &str) -> Result<()> {
        self.lock()?.insert(path.to_string(), Vec::new());
        Ok(())
    }

    fn append(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut data = self.lock()?;
        let buf = data
            .get_mut(path)
            .ok_or_else(|| Error::Storage(format!("path not found: {path}")))?;
        buf.extend_from_slice(bytes);
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let data = self.lock()?;
        let bytes = data
            .get(path)
            .ok_or_else(|| Error::Storage(format!("path not found: {path}")))?;

        let start = offset as usize;
        if start > bytes.len() {
            return Err(Error::Storage(format!(
                "offset {} exceeds size {}",
                offset,
                bytes.len()
            )));
        }
        let end = start.saturating_add(len).min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }

    fn size(&self, path: &str) -> Result<u64> {
        let data = self.lock()?;
        data.get(path)
            .map(|b| b.len() as u64)
            .ok_or_else(|| Error::Storage(format!("path not found: {path}")))
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.lock()?.remove(path);
        Ok(())
    }
}
