#![no_std]

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

#[cfg(test)]
extern crate quickcheck;

#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod arena;
pub mod node;
pub mod rb_tree;

pub use arena::{NodeArena, NodeId};
pub use node::{Color, Side, TreeNode};
pub use rb_tree::{IntoIter, InvariantError, Iter, RBTree};
