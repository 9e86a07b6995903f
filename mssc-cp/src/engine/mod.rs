//! Propagation host: trailed domains, reversible cells and the propagator
//! scheduler the MSSC constraints run on.

mod domain;
mod propagator;
mod store;

pub use domain::{Domain, DomainIter};
pub use propagator::{Propagation, PropagationStats, Propagator, Subscriptions};
pub use store::{RevBool, RevFloat, RevInt, Store};

/// Branch failure raised by propagation.
///
/// Not an error: the search loop answers it by backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict;

/// Outcome of a propagation step.
pub type PropResult = Result<(), Conflict>;

/// Modification event emitted by the [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The domain of a variable shrank.
    Domain(usize),

    /// A variable became fixed.
    Fixed(usize),

    /// The objective range changed.
    Objective,
}
