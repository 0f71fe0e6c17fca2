use alloc::vec::Vec;
use core::fmt;
use core::mem;
use core::ops::{Index, IndexMut};

use log::debug;

/// A handle to an occupied slot within a [`NodeArena`].
///
/// Handles are plain indices: they carry no ownership and stay valid until
/// the slot they name is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

enum Slot<T> {
    Occupied(T),
    /// Vacant slot, linked to the next vacant slot (if any).
    Vacant(Option<NodeId>),
}

/// A growable table of nodes addressed by [`NodeId`].
///
/// Removed slots are threaded onto a free list and handed out again by
/// later insertions, so the backing storage only grows when every slot is
/// in use.
pub struct NodeArena<T> {
    slots: Vec<Slot<T>>,
    free: Option<NodeId>,
    len: usize,
}

impl<T> NodeArena<T> {
    pub fn new() -> NodeArena<T> {
        NodeArena {
            slots: Vec::new(),
            free: None,
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> NodeArena<T> {
        NodeArena {
            slots: Vec::with_capacity(capacity),
            free: None,
            len: 0,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots that can be occupied without reallocating.
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn insert(&mut self, value: T) -> NodeId {
        self.len += 1;

        if let Some(id) = self.free {
            let slot = &mut self.slots[id.0];
            self.free = match slot {
                Slot::Vacant(next) => *next,
                Slot::Occupied(_) => panic!("free list points at occupied slot {}", id),
            };

            *slot = Slot::Occupied(value);
            debug!("reusing arena slot {}", id);
            return id;
        }

        let id = NodeId(self.slots.len());
        self.slots.push(Slot::Occupied(value));
        id
    }

    /// Frees the slot named by `id` and returns its contents.
    ///
    /// Panics if `id` does not name an occupied slot.
    pub fn remove(&mut self, id: NodeId) -> T {
        let len = self.slots.len();
        let slot = match self.slots.get_mut(id.0) {
            Some(slot) => slot,
            None => panic!(
                "node handle out of bounds (the len is {} but the index is {})",
                len, id.0
            ),
        };

        match mem::replace(slot, Slot::Vacant(self.free)) {
            Slot::Occupied(value) => {
                self.free = Some(id);
                self.len -= 1;
                value
            }
            Slot::Vacant(next) => {
                *slot = Slot::Vacant(next);
                panic!("attempt to remove vacant slot {}", id)
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.slots.get_mut(id.0) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Borrow two distinct occupied slots mutably at the same time.
    pub fn pair_mut(&mut self, a: NodeId, b: NodeId) -> (&mut T, &mut T) {
        assert_ne!(a, b, "pair_mut called with the same handle twice");

        let (lo, hi) = if a.0 < b.0 { (a, b) } else { (b, a) };
        let (head, tail) = self.slots.split_at_mut(hi.0);

        let lo_ref = match &mut head[lo.0] {
            Slot::Occupied(value) => value,
            Slot::Vacant(_) => panic!("stale node handle {}", lo),
        };

        let hi_ref = match tail.first_mut() {
            Some(Slot::Occupied(value)) => value,
            _ => panic!("stale node handle {}", hi),
        };

        if a.0 < b.0 {
            (lo_ref, hi_ref)
        } else {
            (hi_ref, lo_ref)
        }
    }

    /// Drops every occupied slot and releases the free list.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free = None;
        self.len = 0;
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        NodeArena::new()
    }
}

impl<T> Index<NodeId> for NodeArena<T> {
    type Output = T;

    fn index(&self, id: NodeId) -> &T {
        match self.slots.get(id.0) {
            Some(Slot::Occupied(value)) => value,
            Some(Slot::Vacant(_)) => panic!("stale node handle {}", id),
            None => panic!(
                "node handle out of bounds (the len is {} but the index is {})",
                self.slots.len(),
                id.0
            ),
        }
    }
}

impl<T> IndexMut<NodeId> for NodeArena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        let len = self.slots.len();
        match self.slots.get_mut(id.0) {
            Some(Slot::Occupied(value)) => value,
            Some(Slot::Vacant(_)) => panic!("stale node handle {}", id),
            None => panic!(
                "node handle out of bounds (the len is {} but the index is {})",
                len, id.0
            ),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeArena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
                Slot::Occupied(value) => Some((NodeId(i), value)),
                Slot::Vacant(_) => None,
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeArena, NodeId};
    use std::prelude::v1::*;
    use std::collections::HashMap;
    use quickcheck::TestResult;

    #[test]
    fn test_insert_get() {
        let mut arena = NodeArena::new();
        let a = arena.insert(1u64);
        let b = arena.insert(2u64);

        assert_ne!(a, b);
        assert_eq!(arena[a], 1);
        assert_eq!(arena[b], 2);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_remove_reuses_slot() {
        let mut arena = NodeArena::new();
        let a = arena.insert("a");
        let _b = arena.insert("b");

        assert_eq!(arena.remove(a), "a");
        assert!(arena.get(a).is_none());
        assert_eq!(arena.len(), 1);

        let c = arena.insert("c");
        assert_eq!(c, a);
        assert_eq!(arena[c], "c");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut arena = NodeArena::new();
        let ids: Vec<NodeId> = (0..4u32).map(|i| arena.insert(i)).collect();

        arena.remove(ids[1]);
        arena.remove(ids[3]);

        assert_eq!(arena.insert(10), ids[3]);
        assert_eq!(arena.insert(11), ids[1]);
        assert_eq!(arena.insert(12), NodeId(4));
    }

    #[test]
    fn test_pair_mut() {
        let mut arena = NodeArena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);

        {
            let (x, y) = arena.pair_mut(b, a);
            core::mem::swap(x, y);
        }

        assert_eq!(arena[a], 2);
        assert_eq!(arena[b], 1);
    }

    #[test]
    #[should_panic(expected = "stale node handle")]
    fn test_stale_handle_panics() {
        let mut arena = NodeArena::new();
        let a = arena.insert(1);
        arena.remove(a);
        let _ = arena[a];
    }

    #[test]
    #[should_panic(expected = "attempt to remove vacant slot")]
    fn test_double_remove_panics() {
        let mut arena = NodeArena::new();
        let a = arena.insert(1);
        arena.remove(a);
        arena.remove(a);
    }

    #[cfg_attr(miri, ignore)]
    #[quickcheck]
    fn quickcheck_model(ops: Vec<(bool, u32)>) -> TestResult {
        let mut arena = NodeArena::new();
        let mut model: HashMap<NodeId, u32> = HashMap::new();
        let mut live: Vec<NodeId> = Vec::new();

        for (insert, v) in ops {
            if insert || live.is_empty() {
                let id = arena.insert(v);
                if model.insert(id, v).is_some() {
                    return TestResult::failed();
                }
                live.push(id);
            } else {
                let id = live.swap_remove(v as usize % live.len());
                if Some(arena.remove(id)) != model.remove(&id) {
                    return TestResult::failed();
                }
            }

            if arena.len() != model.len() {
                return TestResult::failed();
            }
        }

        TestResult::from_bool(model.iter().all(|(id, v)| arena.get(*id) == Some(v)))
    }
}
