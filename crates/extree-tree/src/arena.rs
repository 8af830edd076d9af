//! Generational slot arena owning every live tree node.
//!
//! Freed slots go on a free list and are reused with a bumped generation,
//! so a stale [`NodeKey`] never resolves to a later node.

use extree_core::NodeKey;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub struct NodeArena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> NodeKey {
        self.len += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.value = Some(value);
            return NodeKey::new(idx, slot.generation);
        }
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        NodeKey::new(idx, 0)
    }

    pub fn get(&self, key: NodeKey) -> Option<&T> {
        self.slots
            .get(key.slot() as usize)
            .filter(|s| s.generation == key.generation())
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut T> {
        self.slots
            .get_mut(key.slot() as usize)
            .filter(|s| s.generation == key.generation())
            .and_then(|s| s.value.as_mut())
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<T> {
        let slot = self.slots.get_mut(key.slot() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(key.slot());
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value
                .as_ref()
                .map(|v| (NodeKey::new(i as u32, s.generation), v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut arena = NodeArena::new();
        let a = arena.insert("a");
        assert_eq!(arena.remove(a), Some("a"));
        let b = arena.insert("b");

        assert_eq!(a.slot(), b.slot());
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b), Some(&"b"));
    }

    #[test]
    fn double_remove_is_harmless() {
        let mut arena = NodeArena::new();
        let a = arena.insert(1u32);
        let _ = arena.insert(2u32);
        assert!(arena.remove(a).is_some());
        assert!(arena.remove(a).is_none());
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.iter().count(), 1);
    }
}
