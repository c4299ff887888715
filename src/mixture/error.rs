#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::dist::{DirichletError, MvGaussianError, NormalInvWishartError};
use crate::mixture::MixturePriorError;
use std::fmt;

/// Broad classes of [`MixtureError`]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum ErrorKind {
    /// A supplied argument is out of range or has the wrong shape
    InvalidArgument,
    /// The state is not in the condition the operation requires
    InvariantViolation,
    /// A numerical routine failed
    Numerical,
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvariantViolation => "invariant violation",
            ErrorKind::Numerical => "numerical failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum MixtureError {
    /// The prior is invalid
    Prior(MixturePriorError),
    /// The state was built for zero data points
    EmptyData,
    /// The state was built with zero cluster slots
    ZeroCapacity,
    /// The data do not have one entry per point
    DataLengthMismatch { expected: usize, got: usize },
    /// A datum has the wrong number of dimensions
    DimensionMismatch { expected: usize, got: usize },
    /// A point index is not in [0, N)
    PointIndexOutOfRange { ix: usize, n: usize },
    /// A cluster index is not an existing cluster or the next free slot
    ClusterIndexOutOfRange { k: usize, n_clusters: usize },
    /// The requested number of clusters is zero or exceeds the capacity
    InvalidClusterCount { k: usize, k_max: usize },
    /// An assignment label is not below the capacity
    LabelOutOfRange { ix: usize, label: usize, k_max: usize },
    /// The assignment vector does not have one entry per point
    AssignmentLengthMismatch { expected: usize, got: usize },
    /// An explicit parameter vector does not have one entry per cluster
    ParameterLengthMismatch { expected: usize, got: usize },
    /// A mixture weight is negative or non-finite, or all weights are zero
    InvalidWeight { ix: usize, weight: f64 },
    /// The point is already assigned to a cluster
    PointAlreadyAssigned { ix: usize, k: usize },
    /// The point is not a member of the cluster
    PointNotInCluster { ix: usize, k: usize },
    /// A Monte Carlo estimate was requested with zero samples
    ZeroSamples,
    /// Counts must be recomputed with `update_counts` first
    StaleCounts,
    /// The cluster cache must be rebuilt with `update_cluster_cache` first
    StaleCache,
    /// There are no clusters
    NoClusters,
    /// A point without an assignment was found where all must be assigned
    Unassigned { ix: usize },
    /// Data priors have not been computed for every point
    DataPriorsMissing { expected: usize, got: usize },
    /// Explicit mixture weights or component distributions are absent
    MissingParameters,
    /// A cluster scale matrix is not positive definite. `None` refers to
    /// the prior predictive of an empty slot.
    NotPositiveDefinite { k: Option<usize> },
    /// A component posterior could not be built
    Niw(NormalInvWishartError),
    /// A component distribution could not be built
    MvGaussian(MvGaussianError),
    /// A weight posterior could not be built
    Dirichlet(DirichletError),
}

impl MixtureError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Prior(_)
            | Self::EmptyData
            | Self::ZeroCapacity
            | Self::DataLengthMismatch { .. }
            | Self::DimensionMismatch { .. }
            | Self::PointIndexOutOfRange { .. }
            | Self::ClusterIndexOutOfRange { .. }
            | Self::InvalidClusterCount { .. }
            | Self::LabelOutOfRange { .. }
            | Self::AssignmentLengthMismatch { .. }
            | Self::ParameterLengthMismatch { .. }
            | Self::InvalidWeight { .. }
            | Self::PointAlreadyAssigned { .. }
            | Self::PointNotInCluster { .. }
            | Self::ZeroSamples => ErrorKind::InvalidArgument,
            Self::StaleCounts
            | Self::StaleCache
            | Self::NoClusters
            | Self::Unassigned { .. }
            | Self::DataPriorsMissing { .. }
            | Self::MissingParameters => ErrorKind::InvariantViolation,
            Self::NotPositiveDefinite { .. }
            | Self::Niw(_)
            | Self::MvGaussian(_)
            | Self::Dirichlet(_) => ErrorKind::Numerical,
        }
    }
}

impl From<MixturePriorError> for MixtureError {
    fn from(err: MixturePriorError) -> Self {
        MixtureError::Prior(err)
    }
}

impl From<NormalInvWishartError> for MixtureError {
    fn from(err: NormalInvWishartError) -> Self {
        MixtureError::Niw(err)
    }
}

impl From<MvGaussianError> for MixtureError {
    fn from(err: MvGaussianError) -> Self {
        MixtureError::MvGaussian(err)
    }
}

impl From<DirichletError> for MixtureError {
    fn from(err: DirichletError) -> Self {
        MixtureError::Dirichlet(err)
    }
}

impl std::error::Error for MixtureError {}

impl fmt::Display for MixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prior(err) => write!(f, "{}", err),
            Self::EmptyData => write!(f, "the mixture holds no data points"),
            Self::ZeroCapacity => {
                write!(f, "the mixture has no cluster slots (k_max = 0)")
            }
            Self::DataLengthMismatch { expected, got } => write!(
                f,
                "expected {} data points but got {}",
                expected, got
            ),
            Self::DimensionMismatch { expected, got } => write!(
                f,
                "expected a {}-dimensional datum but got {} dimensions",
                expected, got
            ),
            Self::PointIndexOutOfRange { ix, n } => {
                write!(f, "point index {} is out of range for {} points", ix, n)
            }
            Self::ClusterIndexOutOfRange { k, n_clusters } => write!(
                f,
                "cluster index {} is out of range with {} clusters",
                k, n_clusters
            ),
            Self::InvalidClusterCount { k, k_max } => write!(
                f,
                "the number of clusters ({}) must be in [1, {}]",
                k, k_max
            ),
            Self::LabelOutOfRange { ix, label, k_max } => write!(
                f,
                "label {} of point {} must be less than {}",
                label, ix, k_max
            ),
            Self::AssignmentLengthMismatch { expected, got } => write!(
                f,
                "expected {} assignments but got {}",
                expected, got
            ),
            Self::ParameterLengthMismatch { expected, got } => write!(
                f,
                "expected parameters for {} clusters but got {}",
                expected, got
            ),
            Self::InvalidWeight { ix, weight } => {
                write!(f, "invalid mixture weight at index {}: {}", ix, weight)
            }
            Self::PointAlreadyAssigned { ix, k } => {
                write!(f, "point {} is already assigned to cluster {}", ix, k)
            }
            Self::PointNotInCluster { ix, k } => {
                write!(f, "point {} is not a member of cluster {}", ix, k)
            }
            Self::ZeroSamples => {
                write!(f, "the number of samples must be greater than zero")
            }
            Self::StaleCounts => write!(
                f,
                "cluster counts are stale; call update_counts first"
            ),
            Self::StaleCache => write!(
                f,
                "the cluster cache is dirty; call update_cluster_cache first"
            ),
            Self::NoClusters => write!(f, "there are no clusters"),
            Self::Unassigned { ix } => {
                write!(f, "point {} has no cluster assignment", ix)
            }
            Self::DataPriorsMissing { expected, got } => write!(
                f,
                "data priors cover {} of {} points; call update_data_priors",
                got, expected
            ),
            Self::MissingParameters => write!(
                f,
                "explicit mixture weights and distributions are required"
            ),
            Self::NotPositiveDefinite { k: Some(k) } => write!(
                f,
                "the scale matrix of cluster {} is not positive definite",
                k
            ),
            Self::NotPositiveDefinite { k: None } => write!(
                f,
                "the prior predictive scale matrix is not positive definite"
            ),
            Self::Niw(err) => write!(f, "{}", err),
            Self::MvGaussian(err) => write!(f, "{}", err),
            Self::Dirichlet(err) => write!(f, "{}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(MixtureError::EmptyData.kind(), ErrorKind::InvalidArgument);
        assert_eq!(MixtureError::ZeroCapacity.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            MixtureError::StaleCache.kind(),
            ErrorKind::InvariantViolation
        );
        assert_eq!(
            MixtureError::NotPositiveDefinite { k: Some(1) }.kind(),
            ErrorKind::Numerical
        );
    }

    #[test]
    fn prior_errors_convert() {
        let err: MixtureError =
            MixturePriorError::LambdaTooLow { lambda: 0.0 }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "lambda (0) must be greater than zero");
    }
}
