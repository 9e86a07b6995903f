//! Exact minimum sum-of-squares clustering by constraint propagation.
//!
//! Every point gets a cluster-label variable; the objective is the WCSS of
//! the final assignment. Depth-first branch and bound over these variables is
//! pruned by filtering constraints that bound the WCSS of any completion of
//! the current partial assignment:
//!
//! - **Unconstrained WCSS bound**: per-cluster completion table combined by a
//!   knapsack-style dynamic program
//! - **Standard cardinality control**: direct bound when every cluster's final
//!   size is fixed (balanced MSSC)
//! - **Network cardinality control**: minimum-cost flow bound under fixed
//!   sizes, with residual shortest paths for per-candidate filtering
//! - **Value precedence**: symmetry breaking between interchangeable labels
//!
//! # Example
//!
//! ```
//! use mssc_core::Instance;
//! use mssc_cp::{solve_mssc, BoundVariant, MsscStatus, SolverSettings};
//!
//! let inst = Instance::from_coordinates(
//!     vec![vec![0.0], vec![1.0], vec![2.0], vec![10.0], vec![11.0], vec![12.0]],
//!     2,
//! )?
//! .with_target_cardinalities(vec![3, 3])?;
//!
//! let settings = SolverSettings::default().with_bound(BoundVariant::NetworkCardControl);
//! let sol = solve_mssc(&inst, settings)?;
//! assert_eq!(sol.status, MsscStatus::Optimal);
//! assert_eq!(sol.memberships, vec![0, 0, 0, 1, 1, 1]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constraints;
pub mod engine;
pub mod error;
pub mod model;
pub mod search;
pub mod settings;

pub use error::{MsscError, MsscResult};
pub use model::{solve_mssc, BestClustering, MsscModel, MsscSolution, MsscStatus};
pub use settings::{
    BoundVariant, InitialSolution, MainSearch, SearchParameters, SolverSettings, TieHandling,
};
