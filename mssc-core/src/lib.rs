//! Core data and solvers for exact minimum sum-of-squares clustering (MSSC).
//!
//! This crate holds everything the constraint layer (`mssc-cp`) treats as a
//! given:
//!
//! - **Instance data**: point coordinates, squared dissimilarities, optional
//!   target memberships and target cardinalities (balanced MSSC)
//! - **WCSS evaluation** of complete assignments
//! - **Exhaustive enumeration** of tiny instances, the ground truth in tests
//! - **Minimum-cost flow** behind a narrow solver trait
//!
//! # Example
//!
//! ```
//! use mssc_core::Instance;
//!
//! let inst = Instance::from_coordinates(
//!     vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![9.0, 9.0], vec![9.0, 10.0]],
//!     2,
//! )?;
//! assert!((inst.wcss(&[0, 0, 1, 1]) - 1.0).abs() < 1e-12);
//! # Ok::<(), mssc_core::InstanceError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod exhaustive;
pub mod flow;
pub mod instance;

pub use error::{CoreResult, InstanceError};
pub use exhaustive::{solve_exhaustive, ExhaustiveSolution};
pub use instance::{squared_distance, Instance, MAX_CLUSTERS};
