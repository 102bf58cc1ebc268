//! Error types for nndescent.

use thiserror::Error;

use crate::PointId;

/// Errors returned when a build or a downstream computation is misconfigured.
///
/// The algorithms themselves never fail on data: a run that does not reach a
/// fixed point is reported through [`crate::Termination::Exhausted`], not here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// `k` must be strictly smaller than the number of points.
    ///
    /// A parameter error like [`Error::InvalidParameter`], kept as its own
    /// variant so the numbers survive. Match both, or use
    /// [`Error::is_invalid_parameter`].
    #[error("dataset too small: k = {k} requires more than {k} points, got {n}")]
    DatasetTooSmall { k: usize, n: usize },

    /// Vector buffer does not match the declared dimension.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A point identifier outside `0..n` was requested.
    #[error("point {id} out of range for {n} points")]
    PointOutOfRange { id: PointId, n: usize },
}

impl Error {
    /// True for every rejected parameter, including `k >= n`.
    #[must_use]
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_) | Self::DatasetTooSmall { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
