#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::dist::{InvWishart, MvGaussian};
use crate::impl_display;
use crate::traits::*;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use std::fmt;

mod mvg_prior;

/// Normal-Inverse-Wishart prior on the mean and covariance of a
/// multivariate Gaussian component.
///
/// (μ, Σ) ~ NIW(μ<sub>0</sub>, κ<sub>0</sub>, ν<sub>0</sub>, S<sub>0</sub>) means
/// Σ ~ W<sup>-1</sup>(S<sub>0</sub>, ν<sub>0</sub>) and
/// μ | Σ ~ N(μ<sub>0</sub>, Σ/κ<sub>0</sub>).
///
/// # Example
///
/// Draw a component from the prior
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use gaussmix::prelude::*;
/// use rand::SeedableRng;
///
/// let niw = NormalInvWishart::new(
///     DVector::zeros(3),
///     1.0,
///     3,
///     DMatrix::identity(3, 3),
/// )
/// .unwrap();
///
/// let mut rng = rand::rngs::SmallRng::seed_from_u64(0x1234);
/// let mvg: MvGaussian = niw.draw(&mut rng);
///
/// assert_eq!(mvg.ndims(), 3);
/// assert!(niw.supports(&mvg));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct NormalInvWishart {
    mu: DVector<f64>,
    k: f64,
    // prior on Σ, holds S₀ and ν₀
    iw: InvWishart,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum NormalInvWishartError {
    /// κ<sub>0</sub> is not a positive finite number
    KTooLow { k: f64 },
    /// ν<sub>0</sub> is less than the number of dimensions
    DfLessThanDimensions { df: usize, ndims: usize },
    /// The scale matrix is not square
    ScaleMatrixNotSquare { nrows: usize, ncols: usize },
    /// μ<sub>0</sub> and the scale matrix have different dimensions
    MuScaleDimensionMismatch { n_mu: usize, n_scale: usize },
}

impl NormalInvWishart {
    /// Create a new `NormalInvWishart`
    ///
    /// # Arguments
    /// - mu: prior mean of μ, μ<sub>0</sub>
    /// - k: pseudo-count on μ, κ<sub>0</sub> > 0
    /// - df: degrees of freedom, ν<sub>0</sub> ≥ D
    /// - scale: the D×D scale matrix, S<sub>0</sub>
    pub fn new(
        mu: DVector<f64>,
        k: f64,
        df: usize,
        scale: DMatrix<f64>,
    ) -> Result<Self, NormalInvWishartError> {
        let ndims = mu.len();
        if !(k.is_finite() && k > 0.0) {
            return Err(NormalInvWishartError::KTooLow { k });
        }
        if !scale.is_square() {
            return Err(NormalInvWishartError::ScaleMatrixNotSquare {
                nrows: scale.nrows(),
                ncols: scale.ncols(),
            });
        }
        if scale.nrows() != ndims {
            return Err(NormalInvWishartError::MuScaleDimensionMismatch {
                n_mu: ndims,
                n_scale: scale.nrows(),
            });
        }
        if df < ndims {
            return Err(NormalInvWishartError::DfLessThanDimensions {
                df,
                ndims,
            });
        }
        Ok(NormalInvWishart::new_unchecked(mu, k, df, scale))
    }

    /// Creates a new NormalInvWishart without checking whether the parameters
    /// are valid.
    #[inline]
    pub fn new_unchecked(
        mu: DVector<f64>,
        k: f64,
        df: usize,
        scale: DMatrix<f64>,
    ) -> Self {
        NormalInvWishart {
            mu,
            k,
            iw: InvWishart::new_unchecked(scale, df),
        }
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.mu.len()
    }

    /// μ<sub>0</sub>
    #[inline]
    pub fn mu(&self) -> &DVector<f64> {
        &self.mu
    }

    /// κ<sub>0</sub>
    #[inline]
    pub fn k(&self) -> f64 {
        self.k
    }

    /// ν<sub>0</sub>
    #[inline]
    pub fn df(&self) -> usize {
        self.iw.df()
    }

    /// S<sub>0</sub>
    #[inline]
    pub fn scale(&self) -> &DMatrix<f64> {
        self.iw.inv_scale()
    }

    /// The marginal prior on Σ
    #[inline]
    pub fn inv_wishart(&self) -> &InvWishart {
        &self.iw
    }
}

impl From<&NormalInvWishart> for String {
    fn from(niw: &NormalInvWishart) -> String {
        format!(
            "NIW(μ: {}, κ: {}, ν: {}, S: {})",
            niw.mu,
            niw.k,
            niw.df(),
            niw.scale()
        )
    }
}

impl_display!(NormalInvWishart);

impl Rv<MvGaussian> for NormalInvWishart {
    fn ln_f(&self, x: &MvGaussian) -> f64 {
        match MvGaussian::new(self.mu.clone(), x.cov() / self.k) {
            Ok(mu_prior) => mu_prior.ln_f(x.mu()) + self.iw.ln_f(x.cov()),
            Err(_) => f64::NEG_INFINITY,
        }
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> MvGaussian {
        let sigma: DMatrix<f64> = self.iw.draw(rng);
        let mu = MvGaussian::new(self.mu.clone(), &sigma / self.k)
            .expect("inverse Wishart draws are positive definite")
            .draw(rng);
        MvGaussian::new(mu, sigma)
            .expect("inverse Wishart draws are positive definite")
    }
}

impl Support<MvGaussian> for NormalInvWishart {
    fn supports(&self, x: &MvGaussian) -> bool {
        x.ndims() == self.ndims() && self.iw.supports(x.cov())
    }
}

impl ContinuousDistr<MvGaussian> for NormalInvWishart {}

impl std::error::Error for NormalInvWishartError {}

impl fmt::Display for NormalInvWishartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KTooLow { k } => {
                write!(f, "k ({}) must be a finite number greater than zero", k)
            }
            Self::DfLessThanDimensions { df, ndims } => write!(
                f,
                "df ({}) must be at least the number of dimensions ({})",
                df, ndims
            ),
            Self::ScaleMatrixNotSquare { nrows, ncols } => {
                write!(f, "the scale matrix is {} x {}, not square", nrows, ncols)
            }
            Self::MuScaleDimensionMismatch { n_mu, n_scale } => write!(
                f,
                "mu has {} entries but the scale matrix is {} x {}",
                n_mu, n_scale, n_scale
            ),
        }
    }
}
