//! Error types for the MSSC solver.

use mssc_core::InstanceError;
use thiserror::Error;

/// Errors raised while building a model.
///
/// Branch failures during search are not errors; see
/// [`Conflict`](crate::engine::Conflict).
#[derive(Error, Debug)]
pub enum MsscError {
    /// Instance validation failed
    #[error("Invalid instance: {0}")]
    Instance(#[from] InstanceError),

    /// Settings are inconsistent with each other or with the instance
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for MSSC operations.
pub type MsscResult<T> = Result<T, MsscError>;
