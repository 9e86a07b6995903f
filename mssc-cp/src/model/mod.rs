//! Model and solution types for the MSSC solver.

mod mssc;
mod solution;

pub use mssc::{solve_mssc, MsscModel};
pub use solution::{BestClustering, MsscSolution, MsscStatus};
