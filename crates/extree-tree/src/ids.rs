//! Tag-bit allocation for searchers.

use extree_core::{Error, Result};

use crate::tagged::{TagMask, TAG_WIDTH};

/// Hands out one tag bit per registered searcher.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    registered: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The k-th call returns `1 << (k - 1)`. Registering more searchers
    /// than [`TAG_WIDTH`] fails; callers treat that as fatal.
    pub fn next_id(&mut self) -> Result<TagMask> {
        if self.registered >= TAG_WIDTH {
            return Err(Error::TagWidthExceeded { width: TAG_WIDTH });
        }
        let id: TagMask = 1 << self.registered;
        self.registered += 1;
        Ok(id)
    }

    pub fn registered(&self) -> u32 {
        self.registered
    }
}
