//! MSSC filtering constraints.
//!
//! - [`ValuePrecedence`]: symmetry breaking between two labels
//! - [`WcssBound`]: unconstrained WCSS lower bound
//! - [`StandardCardControl`]: WCSS bound under fixed cardinalities
//! - [`NetworkCardControl`]: flow-based WCSS bound under fixed cardinalities
//! - [`ClusterCardinality`]: per-cluster counting

mod cardinality;
mod network_card;
mod partition;
mod precedence;
mod standard_card;
mod wcss;

pub use cardinality::ClusterCardinality;
pub use network_card::NetworkCardControl;
pub use precedence::ValuePrecedence;
pub use standard_card::StandardCardControl;
pub use wcss::WcssBound;
