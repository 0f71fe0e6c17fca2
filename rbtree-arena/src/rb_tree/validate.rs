use core::fmt;

use super::RBTree;
use crate::arena::NodeId;
use crate::node::Side;

/// A structural defect found by [`RBTree::check_invariants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantError {
    /// The root node is red.
    RedRoot(NodeId),
    /// A child link names a slot that is not occupied.
    DanglingLink { parent: NodeId, side: Side, child: NodeId },
    /// A node's parent link does not point back at the node it hangs from.
    ParentMismatch {
        node: NodeId,
        expected: Option<NodeId>,
        found: Option<NodeId>,
    },
    /// Two nodes are not in strictly ascending key order.
    OutOfOrder { prev: NodeId, next: NodeId },
    /// A red node has a red child.
    RedRed { parent: NodeId, child: NodeId },
    /// The two subtrees of a node have different black heights.
    BlackHeight { node: NodeId, left: usize, right: usize },
    /// The number of reachable nodes differs from the tree's length.
    Unreachable { reachable: usize, len: usize },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::RedRoot(id) => write!(f, "root {} is red", id),
            InvariantError::DanglingLink { parent, side, child } => {
                write!(f, "{} child of {} points at free slot {}", side, parent, child)
            }
            InvariantError::ParentMismatch { node, expected, found } => write!(
                f,
                "parent link of {} is {:?}, expected {:?}",
                node, found, expected
            ),
            InvariantError::OutOfOrder { prev, next } => {
                write!(f, "key of {} is not less than key of {}", prev, next)
            }
            InvariantError::RedRed { parent, child } => {
                write!(f, "red node {} has red child {}", parent, child)
            }
            InvariantError::BlackHeight { node, left, right } => write!(
                f,
                "black height mismatch under {} (left {}, right {})",
                node, left, right
            ),
            InvariantError::Unreachable { reachable, len } => write!(
                f,
                "{} nodes reachable from the root but tree holds {}",
                reachable, len
            ),
        }
    }
}

impl core::error::Error for InvariantError {}

struct Walk<'a, K> {
    prev: Option<(NodeId, &'a K)>,
    reachable: usize,
}

impl<K: Ord, V> RBTree<K, V> {
    /// Walk the whole tree and check every red-black and search-tree
    /// invariant.
    ///
    /// On success returns the black height of the tree: the number of black
    /// nodes on every path from the root down to an absent child.
    pub fn check_invariants(&self) -> Result<usize, InvariantError> {
        let root = match self.root {
            Some(root) => root,
            None if self.len() == 0 => return Ok(0),
            None => return Err(InvariantError::Unreachable { reachable: 0, len: self.len() }),
        };

        let root_node = self.nodes.get(root).ok_or(InvariantError::Unreachable {
            reachable: 0,
            len: self.len(),
        })?;

        if root_node.is_red() {
            return Err(InvariantError::RedRoot(root));
        }

        let mut walk = Walk { prev: None, reachable: 0 };
        let height = self.check_subtree(root, None, &mut walk)?;

        if walk.reachable != self.len() {
            return Err(InvariantError::Unreachable {
                reachable: walk.reachable,
                len: self.len(),
            });
        }

        Ok(height)
    }

    fn check_subtree<'a>(
        &'a self,
        id: NodeId,
        parent: Option<NodeId>,
        walk: &mut Walk<'a, K>,
    ) -> Result<usize, InvariantError> {
        let node = &self.nodes[id];
        walk.reachable += 1;

        if node.parent != parent {
            return Err(InvariantError::ParentMismatch {
                node: id,
                expected: parent,
                found: node.parent,
            });
        }

        let left = self.check_child(id, Side::Left, walk)?;

        if let Some((prev, prev_key)) = walk.prev {
            if *prev_key >= node.key {
                return Err(InvariantError::OutOfOrder { prev, next: id });
            }
        }
        walk.prev = Some((id, &node.key));

        let right = self.check_child(id, Side::Right, walk)?;

        if left != right {
            return Err(InvariantError::BlackHeight { node: id, left, right });
        }

        Ok(left + if node.is_red() { 0 } else { 1 })
    }

    fn check_child<'a>(
        &'a self,
        id: NodeId,
        side: Side,
        walk: &mut Walk<'a, K>,
    ) -> Result<usize, InvariantError> {
        let node = &self.nodes[id];
        let child = match node.child(side) {
            Some(child) => child,
            None => return Ok(0),
        };

        let child_node = self.nodes.get(child).ok_or(InvariantError::DanglingLink {
            parent: id,
            side,
            child,
        })?;

        if node.is_red() && child_node.is_red() {
            return Err(InvariantError::RedRed { parent: id, child });
        }

        self.check_subtree(child, Some(id), walk)
    }
}
