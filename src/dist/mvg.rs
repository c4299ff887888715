#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::LN_2PI;
use crate::data::MvGaussianSuffStat;
use crate::impl_display;
use crate::traits::*;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt;

/// [Multivariate Gaussian/Normal Distribution](https://en.wikipedia.org/wiki/Multivariate_normal_distribution),
/// 𝒩(μ, Σ).
///
/// The lower Cholesky factor of Σ is computed once at construction and used
/// for both density evaluation and sampling.
///
/// # Example
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use gaussmix::prelude::*;
///
/// let mvg = MvGaussian::new(DVector::zeros(3), DMatrix::identity(3, 3)).unwrap();
///
/// let x = DVector::<f64>::zeros(3);
/// assert::close(mvg.ln_pdf(&x), -2.756815599614018, 1E-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MvGaussian {
    // Mean vector
    mu: DVector<f64>,
    // Covariance matrix
    cov: DMatrix<f64>,
    // Lower Cholesky factor of cov
    chol_l: DMatrix<f64>,
    // ln |cov|
    ln_det: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum MvGaussianError {
    /// The number of dimensions in the mean and covariance do not match
    MuCovDimensionMismatch {
        /// Number of dimensions in the mean vector
        n_mu: usize,
        /// Number of dimensions in the covariance matrix
        n_cov: usize,
    },
    /// The covariance matrix is not square
    CovNotSquare {
        /// Number of rows
        nrows: usize,
        /// Number of columns
        ncols: usize,
    },
    /// The covariance matrix has no Cholesky decomposition
    CovNotPositiveSemiDefinite,
    /// Requested dimension is too low
    ZeroDimension,
}

impl MvGaussian {
    /// Create a new multivariate Gaussian distribution
    ///
    /// # Arguments
    /// - mu: k-length mean vector
    /// - cov: k-by-k positive-definite covariance matrix
    pub fn new(
        mu: DVector<f64>,
        cov: DMatrix<f64>,
    ) -> Result<Self, MvGaussianError> {
        if !cov.is_square() {
            Err(MvGaussianError::CovNotSquare {
                nrows: cov.nrows(),
                ncols: cov.ncols(),
            })
        } else if mu.len() != cov.nrows() {
            Err(MvGaussianError::MuCovDimensionMismatch {
                n_mu: mu.len(),
                n_cov: cov.nrows(),
            })
        } else if mu.is_empty() {
            Err(MvGaussianError::ZeroDimension)
        } else {
            let chol = cov
                .clone()
                .cholesky()
                .ok_or(MvGaussianError::CovNotPositiveSemiDefinite)?;
            let chol_l = chol.unpack();
            let ln_det =
                2.0 * chol_l.diagonal().iter().map(|d| d.ln()).sum::<f64>();
            Ok(MvGaussian {
                mu,
                cov,
                chol_l,
                ln_det,
            })
        }
    }

    /// Create a standard Gaussian distribution with zero mean and identiry
    /// covariance matrix.
    pub fn standard(dims: usize) -> Result<Self, MvGaussianError> {
        if dims < 1 {
            Err(MvGaussianError::ZeroDimension)
        } else {
            let mu = DVector::zeros(dims);
            let cov = DMatrix::identity(dims, dims);
            MvGaussian::new(mu, cov)
        }
    }

    /// Get the number of dimensions
    #[inline]
    pub fn ndims(&self) -> usize {
        self.mu.len()
    }

    /// Get a reference to the mean
    #[inline]
    pub fn mu(&self) -> &DVector<f64> {
        &self.mu
    }

    /// Get a reference to the covariance
    #[inline]
    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    /// The natural log of the determinant of the covariance
    #[inline]
    pub fn ln_det_cov(&self) -> f64 {
        self.ln_det
    }
}

impl From<&MvGaussian> for String {
    fn from(mvg: &MvGaussian) -> String {
        format!("N\n μ: {}\n σ: {})", mvg.mu, mvg.cov)
    }
}

impl_display!(MvGaussian);

impl Rv<DVector<f64>> for MvGaussian {
    fn ln_f(&self, x: &DVector<f64>) -> f64 {
        let diff = x - &self.mu;
        let quad = match self.chol_l.solve_lower_triangular(&diff) {
            Some(y) => y.norm_squared(),
            None => return f64::NEG_INFINITY,
        };
        let d = self.mu.len() as f64;
        -0.5 * (d * LN_2PI + self.ln_det + quad)
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        let dims = self.mu.len();
        let z: DVector<f64> =
            DVector::from_fn(dims, |_, _| rng.sample(StandardNormal));

        &self.mu + &self.chol_l * z
    }
}

impl Support<DVector<f64>> for MvGaussian {
    fn supports(&self, x: &DVector<f64>) -> bool {
        x.len() == self.mu.len()
    }
}

impl ContinuousDistr<DVector<f64>> for MvGaussian {}

impl HasSuffStat<DVector<f64>> for MvGaussian {
    type Stat = MvGaussianSuffStat;

    fn empty_suffstat(&self) -> Self::Stat {
        MvGaussianSuffStat::new(self.mu.len())
    }
}

impl std::error::Error for MvGaussianError {}

impl fmt::Display for MvGaussianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MuCovDimensionMismatch { n_mu, n_cov } => write!(
                f,
                "Number of dimensions in μ ({}) and Σ ({}) must match",
                n_mu, n_cov
            ),
            Self::CovNotSquare { nrows, ncols } => {
                write!(f, "Σ must be square but is {} x {}", nrows, ncols)
            }
            Self::CovNotPositiveSemiDefinite => {
                write!(f, "Σ is not positive definite")
            }
            Self::ZeroDimension => write!(f, "ndims must be >= 1"),
        }
    }
}
