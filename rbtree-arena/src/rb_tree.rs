use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::mem::swap;

use log::{debug, trace};

use crate::arena::{NodeArena, NodeId};
use crate::node::{Color, Side, TreeNode};

mod iter;
mod validate;

pub use iter::{IntoIter, Iter};
pub use validate::InvariantError;

/// An ordered map implemented as a red-black tree.
///
/// Nodes live in a [`NodeArena`] and refer to each other through
/// [`NodeId`] handles, so parent back-links are plain indices rather than
/// owning pointers. Removing a key frees exactly one arena slot, which is
/// reused by the next insertion.
pub struct RBTree<K, V> {
    nodes: NodeArena<TreeNode<K, V>>,
    root: Option<NodeId>,
}

impl<K, V> RBTree<K, V> {
    pub fn new() -> RBTree<K, V> {
        RBTree {
            nodes: NodeArena::new(),
            root: None,
        }
    }

    /// Creates an empty tree that can hold `capacity` entries before its
    /// node storage has to grow.
    pub fn with_capacity(capacity: usize) -> RBTree<K, V> {
        RBTree {
            nodes: NodeArena::with_capacity(capacity),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    /// Handle of the root node, if the tree is non-empty.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Look at a node by handle. Returns `None` for stale handles.
    pub fn node(&self, id: NodeId) -> Option<&TreeNode<K, V>> {
        self.nodes.get(id)
    }

    /// Number of edges on the longest path from the root down to a leaf.
    /// Both the empty tree and a single node have height 0.
    pub fn height(&self) -> usize {
        self.subtree_height(self.root).saturating_sub(1)
    }

    fn subtree_height(&self, link: Option<NodeId>) -> usize {
        link.map_or(0, |id| {
            let node = &self.nodes[id];
            1 + self.subtree_height(node.left).max(self.subtree_height(node.right))
        })
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|id| &self.nodes[id].val)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(move |id| &mut self.nodes[id].val)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|id| self.entry_at(id))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Removes `key` from the tree, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|id| self.remove_node(id))
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.first_node().map(|id| self.entry_at(id))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.last_node().map(|id| self.entry_at(id))
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.first_node().map(|id| self.remove_node(id))
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.last_node().map(|id| self.remove_node(id))
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    fn entry_at(&self, id: NodeId) -> (&K, &V) {
        let node = &self.nodes[id];
        (&node.key, &node.val)
    }

    fn first_node(&self) -> Option<NodeId> {
        self.root.map(|root| self.outermost(root, Side::Left))
    }

    fn last_node(&self) -> Option<NodeId> {
        self.root.map(|root| self.outermost(root, Side::Right))
    }

    fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cur = self.root;
        while let Some(id) = cur {
            let node = &self.nodes[id];
            cur = match key.cmp(node.key.borrow()) {
                Ordering::Equal => return Some(id),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }

        None
    }

    /// Follow `side` links from `id` until there are none left.
    fn outermost(&self, mut id: NodeId, side: Side) -> NodeId {
        while let Some(next) = self.nodes[id].child(side) {
            id = next;
        }

        id
    }

    /// In-order neighbour of `id` in direction `side`.
    fn step(&self, id: NodeId, side: Side) -> Option<NodeId> {
        if let Some(child) = self.nodes[id].child(side) {
            return Some(self.outermost(child, side.opposite()));
        }

        let mut cur = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].child(side) != Some(cur) {
                break;
            }

            cur = p;
            parent = self.nodes[p].parent;
        }

        parent
    }

    fn successor(&self, id: NodeId) -> Option<NodeId> {
        self.step(id, Side::Right)
    }

    fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        self.step(id, Side::Left)
    }

    /* Absent children count as black. */
    fn is_red(&self, link: Option<NodeId>) -> bool {
        link.map_or(false, |id| self.nodes[id].is_red())
    }

    fn set_color(&mut self, id: NodeId, color: Color) {
        self.nodes[id].color = color;
    }

    fn side_of(&self, parent: NodeId, child: NodeId) -> Side {
        let p = &self.nodes[parent];
        if p.left == Some(child) {
            Side::Left
        } else {
            debug_assert_eq!(p.right, Some(child), "{} is not a child of {}", child, parent);
            Side::Right
        }
    }

    /// Re-point the link that used to lead to `old` (a child slot of
    /// `parent`, or the root) at `new`. Does not touch `new`'s parent link.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            Some(p) => {
                let side = self.side_of(p, old);
                *self.nodes[p].child_mut(side) = new;
            }
            None => self.root = new,
        }
    }

    /// Rotate the subtree at `p` toward `toward`: the child on the opposite
    /// side is promoted into `p`'s position and `p` becomes its child on
    /// `toward`. Rotating toward `Left` is a left rotation.
    ///
    /// Colors are left alone. Panics if the promoted child does not exist.
    fn rotate(&mut self, p: NodeId, toward: Side) {
        let away = toward.opposite();
        let pivot = expect_link(self.nodes[p].child(away), "rotation pivot", p);
        trace!("rotate {} {} (promoting {})", p, toward, pivot);

        let inner = self.nodes[pivot].child(toward);
        *self.nodes[p].child_mut(away) = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(p);
        }

        let gp = self.nodes[p].parent;
        self.nodes[pivot].parent = gp;
        self.replace_child(gp, p, Some(pivot));

        *self.nodes[pivot].child_mut(toward) = Some(p);
        self.nodes[p].parent = Some(pivot);
    }

    fn repair_insert(&mut self, mut node: NodeId) {
        loop {
            if let Some(root) = self.root {
                self.set_color(root, Color::Black);
            }

            let parent = match self.nodes[node].parent {
                Some(p) if self.nodes[p].is_red() => p,
                _ => return,
            };

            /* A red parent is never the root, so the grandparent exists. */
            let gp = expect_link(self.nodes[parent].parent, "grandparent", node);
            let parent_side = self.side_of(gp, parent);
            let uncle = self.nodes[gp].child(parent_side.opposite());

            if self.is_red(uncle) {
                trace!("insert {}: red uncle, recolor and move up to {}", node, gp);
                self.set_color(parent, Color::Black);
                if let Some(uncle) = uncle {
                    self.set_color(uncle, Color::Black);
                }
                self.set_color(gp, Color::Red);
                node = gp;
            } else if self.side_of(parent, node) == parent_side {
                trace!("insert {}: black uncle, {}-{} case", node, parent_side, parent_side);
                self.set_color(parent, Color::Black);
                self.set_color(gp, Color::Red);
                self.rotate(gp, parent_side.opposite());
                return;
            } else {
                trace!("insert {}: black uncle, {}-{} case", node, parent_side, parent_side.opposite());
                self.rotate(parent, parent_side);
                node = parent;
            }
        }
    }

    fn swap_data(&mut self, a: NodeId, b: NodeId) {
        let (a, b) = self.nodes.pair_mut(a, b);
        swap(&mut a.key, &mut b.key);
        swap(&mut a.val, &mut b.val);
    }

    /// Unlink `id` from the tree and free its slot, returning the entry that
    /// was stored at `id` when this was called.
    fn remove_node(&mut self, mut id: NodeId) -> (K, V) {
        while self.nodes[id].has_both_children() {
            let successor = expect_link(self.successor(id), "successor", id);
            self.swap_data(id, successor);
            id = successor;
        }

        let (replacement, parent, color) = {
            let node = &self.nodes[id];
            (node.left.or(node.right), node.parent, node.color)
        };

        if let Some(replacement) = replacement {
            self.nodes[replacement].parent = parent;
            self.replace_child(parent, id, Some(replacement));

            let node = &mut self.nodes[id];
            node.parent = None;
            node.left = None;
            node.right = None;

            if color == Color::Black {
                self.repair_delete(replacement);
            }
        } else if parent.is_none() {
            debug!("removing last node {}", id);
            self.root = None;
        } else {
            if color == Color::Black {
                self.repair_delete(id);
            }

            /* Fix-up may have rotated `id` under a different parent. */
            if let Some(p) = self.nodes[id].parent.take() {
                let side = self.side_of(p, id);
                *self.nodes[p].child_mut(side) = None;
            }
        }

        let node = self.nodes.remove(id);
        (node.key, node.val)
    }

    fn repair_delete(&mut self, mut node: NodeId) {
        while Some(node) != self.root && !self.nodes[node].is_red() {
            let parent = expect_link(self.nodes[node].parent, "parent", node);
            let side = self.side_of(parent, node);
            let far = side.opposite();
            let mut bro = expect_link(self.nodes[parent].child(far), "sibling", node);

            if self.nodes[bro].is_red() {
                trace!("delete {}: red sibling {}, rotate {} {}", node, bro, parent, side);
                self.set_color(bro, Color::Black);
                self.set_color(parent, Color::Red);
                self.rotate(parent, side);
                bro = expect_link(self.nodes[parent].child(far), "sibling", node);
            }

            let near_nephew = self.nodes[bro].child(side);
            let far_nephew = self.nodes[bro].child(far);

            if !self.is_red(near_nephew) && !self.is_red(far_nephew) {
                trace!("delete {}: sibling {} cannot lend, move up to {}", node, bro, parent);
                self.set_color(bro, Color::Red);
                node = parent;
                continue;
            }

            if !self.is_red(far_nephew) {
                trace!("delete {}: near nephew is red, rotate {} {}", node, bro, far);
                let near_nephew = expect_link(near_nephew, "near nephew", node);
                self.set_color(near_nephew, Color::Black);
                self.set_color(bro, Color::Red);
                self.rotate(bro, far);
                bro = expect_link(self.nodes[parent].child(far), "sibling", node);
            }

            trace!("delete {}: sibling {} lends, rotate {} {}", node, bro, parent, side);
            let parent_color = self.nodes[parent].color;
            self.set_color(bro, parent_color);
            self.set_color(parent, Color::Black);
            let far_nephew = expect_link(self.nodes[bro].child(far), "far nephew", node);
            self.set_color(far_nephew, Color::Black);
            self.rotate(parent, side);

            node = expect_link(self.root, "root", node);
        }

        self.set_color(node, Color::Black);
    }
}

impl<K: Ord, V> RBTree<K, V> {
    /// Inserts a key-value pair into the tree.
    ///
    /// If the key was already present its value is replaced in place and
    /// the old value is returned; the tree's shape is not changed.
    pub fn insert(&mut self, key: K, mut value: V) -> Option<V> {
        let mut parent = None;
        let mut side = Side::Left;
        let mut cur = self.root;

        while let Some(id) = cur {
            let node = &mut self.nodes[id];
            side = match key.cmp(&node.key) {
                Ordering::Equal => {
                    swap(&mut node.val, &mut value);
                    return Some(value);
                }
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };

            parent = Some(id);
            cur = node.child(side);
        }

        let id = self.nodes.insert(TreeNode::new_leaf(key, value, parent));
        match parent {
            Some(p) => *self.nodes[p].child_mut(side) = Some(id),
            None => self.root = Some(id),
        }

        self.repair_insert(id);
        None
    }
}

/// Unwrap a link that the red-black invariants guarantee is present.
#[track_caller]
fn expect_link(link: Option<NodeId>, what: &'static str, near: NodeId) -> NodeId {
    match link {
        Some(id) => id,
        None => panic!("red-black invariant violated: {} of node {} is missing", what, near),
    }
}

impl<K, V> Default for RBTree<K, V> {
    fn default() -> Self {
        RBTree::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RBTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
