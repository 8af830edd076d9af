//! Child edge: a node handle paired with a searcher tag mask.

use extree_core::NodeKey;

/// One bit per registered searcher.
pub type TagMask = u8;

/// Maximum number of searchers that can tag edges at once.
pub const TAG_WIDTH: u32 = TagMask::BITS;

/// An owning edge to a child node plus the searchers whose cursor runs
/// through it. A null edge carries no meaningful tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaggedRef {
    ptr: Option<NodeKey>,
    tag: TagMask,
}

impl TaggedRef {
    pub const fn null() -> Self {
        Self { ptr: None, tag: 0 }
    }

    /// Untagged edge to `ptr`.
    pub const fn new(ptr: NodeKey) -> Self {
        Self {
            ptr: Some(ptr),
            tag: 0,
        }
    }

    pub const fn with_tag(ptr: NodeKey, tag: TagMask) -> Self {
        Self {
            ptr: Some(ptr),
            tag,
        }
    }

    pub const fn pointer(&self) -> Option<NodeKey> {
        self.ptr
    }

    pub const fn tag(&self) -> TagMask {
        self.tag
    }

    pub fn set_tag(&mut self, tag: TagMask) {
        self.tag = tag;
    }

    pub const fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// True when the edge is non-null and carries any bit of `mask`.
    pub const fn is_marked(&self, mask: TagMask) -> bool {
        self.ptr.is_some() && self.tag & mask != 0
    }

    pub fn points_to(&self, key: NodeKey) -> bool {
        self.ptr == Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_edge_is_untagged() {
        let k = NodeKey::new(3, 1);
        let e = TaggedRef::new(k);
        assert_eq!(e.pointer(), Some(k));
        assert_eq!(e.tag(), 0);
        assert!(!e.is_null());
        assert!(TaggedRef::null().is_null());
    }

    #[test]
    fn null_edge_is_never_marked() {
        let mut e = TaggedRef::null();
        e.set_tag(0xff);
        assert!(!e.is_marked(0x01));

        let e = TaggedRef::with_tag(NodeKey::new(0, 0), 0b0100);
        assert!(e.is_marked(0b0100));
        assert!(!e.is_marked(0b0001));
    }
}
