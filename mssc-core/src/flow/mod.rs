//! Minimum-cost flow.
//!
//! The network-flow cardinality bound treats the flow solver as a black box:
//! hand it a [`FlowNetwork`], get back an optimal [`FlowSolution`] or an
//! infeasibility verdict. [`FlowSolver`] is the seam; [`SuccessiveShortestPaths`]
//! is the default backend.

mod network;
mod ssp;

pub use network::{Arc, ArcId, FlowNetwork};
pub use ssp::SuccessiveShortestPaths;

use thiserror::Error;

/// Errors from building or solving a flow network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Arc references a missing node or has invalid data.
    #[error("Invalid arc: {0}")]
    InvalidArc(String),

    /// Supplies do not sum to zero.
    #[error("Unbalanced supplies (sum = {0})")]
    Unbalanced(i64),

    /// Not all supply can be routed to the sinks.
    #[error("Infeasible network: routed {routed} of {required} units")]
    Infeasible {
        /// Units that reached a sink.
        routed: i64,
        /// Units that had to be routed.
        required: i64,
    },
}

/// Optimal flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSolution {
    /// Total cost of the flow.
    pub cost: f64,

    /// Flow on every arc, indexed like [`FlowNetwork::arcs`].
    pub arc_flow: Vec<i64>,

    /// Number of augmenting paths used.
    pub augmentations: usize,
}

impl FlowSolution {
    /// Flow on one arc.
    pub fn flow(&self, arc: ArcId) -> i64 {
        self.arc_flow[arc]
    }
}

/// Trait for minimum-cost flow backends.
pub trait FlowSolver {
    /// Solve the network to optimality.
    fn solve(&mut self, network: &FlowNetwork) -> Result<FlowSolution, FlowError>;
}
