//! Error types for instance construction and validation.

use thiserror::Error;

/// Errors raised while building or validating an [`Instance`](crate::Instance).
///
/// These are data/configuration mistakes caught at setup, never branch failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstanceError {
    /// Instance has no points.
    #[error("Instance has no points")]
    Empty,

    /// Cluster count outside `1..=MAX_CLUSTERS` or larger than the point count.
    #[error("Invalid cluster count {k} for {n} points (supported: 1..={max})")]
    InvalidClusterCount {
        /// Requested cluster count.
        k: usize,
        /// Point count.
        n: usize,
        /// Largest supported cluster count.
        max: usize,
    },

    /// A coordinate row or dissimilarity row has the wrong length.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Coordinates or dissimilarities contain NaN or infinite values.
    #[error("Non-finite value at ({row}, {col})")]
    NonFinite {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },

    /// Dissimilarity matrix is not symmetric, has a non-zero diagonal or negative entries.
    #[error("Invalid dissimilarity matrix: {0}")]
    InvalidDissimilarities(String),

    /// Target cardinalities do not sum to N or contain zeros.
    #[error("Invalid target cardinalities: {0}")]
    InvalidCardinalities(String),

    /// Target memberships reference a label outside `0..K`.
    #[error("Invalid target memberships: {0}")]
    InvalidMemberships(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, InstanceError>;
