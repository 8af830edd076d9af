use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::LogStorage;
use crate::error::{Error, Result};

/// Local filesystem storage (rooted at the host filesystem).
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl LogStorage for FsStorage {
    fn create(&self, path: &str) -> Result<()> {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Storage(format!("mkparent: {e}")))?;
        }
        File::create(p).map_err(|e| Error::Storage(format!("create {path}: {e}")))?;
        Ok(())
    }

    fn append(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(Path::new(path))
            .map_err(|e| Error::Storage(format!("open {path}: {e}")))?;
        f.write_all(bytes)
            .map_err(|e| Error::Storage(format!("write: {e}")))?;
        f.flush()
            .map_err(|e| Error::Storage(format!("flush: {e}")))?;
        f.sync_data()
            .map_err(|e| Error::Storage(format!("sync: {e}")))?;
        Ok(())
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut f =
            File::open(Path::new(path)).map_err(|e| Error::Storage(format!("open {path}: {e}")))?;
        f.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::Storage(format!("seek: {e}")))?;
        let mut buf = Vec::with_capacity(len);
        f.take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| Error::Storage(format!("read: {e}")))?;
        Ok(buf)
    }

    fn size(&self, path: &str) -> Result<u64> {
        let meta = fs::metadata(Path::new(path))
            .map_err(|e| Error::Storage(format!("size {path}: {e}")))?;
        Ok(meta.len())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let p = Path::new(path);
        if p.exists() {
            fs::remove_file(p).map_err(|e| Error::Storage(format!("delete: {e}")))?;
        }
        Ok(())
    }
}
