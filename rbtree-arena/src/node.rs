use core::fmt;

use crate::arena::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("R"),
            Color::Black => f.write_str("B"),
        }
    }
}

/// Which child slot of a parent a node occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A single tree vertex.
///
/// `left` and `right` are the owning edges of the tree (in the sense that a
/// node is only reachable from the root through them); `parent` is used for
/// upward navigation only.
pub struct TreeNode<K, V> {
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) color: Color,
    pub(crate) key: K,
    pub(crate) val: V,
}

impl<K, V> TreeNode<K, V> {
    /// Freshly inserted nodes are always red leaves.
    pub(crate) fn new_leaf(key: K, val: V, parent: Option<NodeId>) -> TreeNode<K, V> {
        TreeNode {
            parent,
            left: None,
            right: None,
            color: Color::Red,
            key,
            val,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.val
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    pub fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    pub(crate) fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(crate) fn child_mut(&mut self, side: Side) -> &mut Option<NodeId> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub(crate) fn has_both_children(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TreeNode<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("key", &self.key)
            .field("val", &self.val)
            .field("color", &self.color)
            .field("parent", &self.parent)
            .field("left", &self.left)
            .field("right", &self.right)
            .finish()
    }
}
