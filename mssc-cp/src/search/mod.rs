//! Depth-first branch-and-bound search and the MSSC branching heuristic.

mod branching;
mod tree;

pub use branching::{Brancher, Decision, MsscSearchStrategy};
pub use tree::{BranchAndBound, TreeStats};
