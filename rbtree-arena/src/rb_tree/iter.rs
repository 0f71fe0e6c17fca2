use core::iter::FusedIterator;

use super::RBTree;
use crate::arena::NodeId;

/// In-order iterator over the entries of an [`RBTree`].
///
/// Walks the tree with successor/predecessor steps from both ends, so each
/// step costs O(1) amortized.
pub struct Iter<'a, K, V> {
    tree: &'a RBTree<K, V>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(tree: &'a RBTree<K, V>) -> Iter<'a, K, V> {
        Iter {
            tree,
            front: tree.first_node(),
            back: tree.last_node(),
            remaining: tree.len(),
        }
    }

    fn finish_step(&mut self, next_front: Option<NodeId>, next_back: Option<NodeId>) {
        self.remaining -= 1;
        if self.remaining == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.front = next_front;
            self.back = next_back;
        }
    }
}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree: &'a RBTree<K, V> = self.tree;
        let id = self.front?;

        self.finish_step(tree.successor(id), self.back);
        Some(tree.entry_at(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let tree: &'a RBTree<K, V> = self.tree;
        let id = self.back?;

        self.finish_step(self.front, tree.predecessor(id));
        Some(tree.entry_at(id))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

impl<'a, K, V> IntoIterator for &'a RBTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning in-order iterator; each step unlinks the smallest (or largest)
/// remaining entry.
pub struct IntoIter<K, V> {
    tree: RBTree<K, V>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.tree.pop_last()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K, V> IntoIterator for RBTree<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { tree: self }
    }
}
