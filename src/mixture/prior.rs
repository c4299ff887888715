#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::dist::{NormalInvWishart, NormalInvWishartError};
use crate::impl_display;
use crate::misc::ln_det_pd;
use nalgebra::{DMatrix, DVector};
use special::Gamma as _;
use std::fmt;

/// Hyperparameters of a finite Gaussian mixture.
///
/// Each component (μ<sub>k</sub>, Σ<sub>k</sub>) is drawn from
/// NIW(μ<sub>0</sub>, κ<sub>0</sub>, ν<sub>0</sub>, S<sub>0</sub>) and the
/// weights from a symmetric Dirichlet with total concentration λ.
///
/// The constants every cluster slot starts from are computed once here:
/// κ<sub>0</sub>μ<sub>0</sub>, S<sub>0</sub> + κ<sub>0</sub>μ<sub>0</sub>μ<sub>0</sub><sup>T</sup>,
/// and ln|S<sub>0</sub>|.
///
/// # Example
///
/// ```
/// use gaussmix::mixture::MixturePrior;
/// use nalgebra::{dvector, DMatrix};
///
/// let prior = MixturePrior::new(
///     2.0,
///     dvector![0.0, 0.0],
///     1.0,
///     DMatrix::identity(2, 2),
///     3,
/// )
/// .unwrap();
///
/// assert_eq!(prior.ndims(), 2);
/// assert::close(prior.ln_det_scale(), 0.0, 1E-12);
///
/// // λ must be positive
/// assert!(MixturePrior::new(
///     0.0,
///     dvector![0.0, 0.0],
///     1.0,
///     DMatrix::identity(2, 2),
///     3,
/// )
/// .is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MixturePrior {
    lambda: f64,
    niw: NormalInvWishart,
    mu_numer_baseline: DVector<f64>,
    s_partial_baseline: DMatrix<f64>,
    ln_det_scale: f64,
    ln_evidence_norm: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum MixturePriorError {
    /// The Dirichlet concentration is less than or equal to zero
    LambdaTooLow { lambda: f64 },
    /// The Dirichlet concentration is infinite or NaN
    LambdaNotFinite { lambda: f64 },
    /// The data have zero dimensions
    ZeroDimension,
    /// The NIW parameters are invalid
    Niw(NormalInvWishartError),
    /// S<sub>0</sub> has no Cholesky decomposition
    ScaleNotPositiveDefinite,
}

impl MixturePrior {
    /// Create a new mixture prior
    ///
    /// # Arguments
    /// - lambda: total Dirichlet concentration, λ > 0
    /// - mu_o: prior mean of the component means
    /// - kappa_o: pseudo-count on the component means, κ<sub>0</sub> > 0
    /// - s_o: positive-definite inverse Wishart scale
    /// - v_o: inverse Wishart degrees of freedom, ν<sub>0</sub> ≥ D
    pub fn new(
        lambda: f64,
        mu_o: DVector<f64>,
        kappa_o: f64,
        s_o: DMatrix<f64>,
        v_o: usize,
    ) -> Result<Self, MixturePriorError> {
        let niw = NormalInvWishart::new(mu_o, kappa_o, v_o, s_o)
            .map_err(MixturePriorError::Niw)?;
        MixturePrior::from_niw(lambda, niw)
    }

    /// Create a mixture prior from an existing component prior
    pub fn from_niw(
        lambda: f64,
        niw: NormalInvWishart,
    ) -> Result<Self, MixturePriorError> {
        if !lambda.is_finite() {
            return Err(MixturePriorError::LambdaNotFinite { lambda });
        } else if lambda <= 0.0 {
            return Err(MixturePriorError::LambdaTooLow { lambda });
        } else if niw.ndims() == 0 {
            return Err(MixturePriorError::ZeroDimension);
        }

        let ln_det_scale = ln_det_pd(niw.scale())
            .ok_or(MixturePriorError::ScaleNotPositiveDefinite)?;

        let kappa_o = niw.k();
        let mu_numer_baseline = kappa_o * niw.mu();
        let s_partial_baseline =
            niw.scale() + kappa_o * niw.mu() * niw.mu().transpose();

        let d = niw.ndims();
        let df = niw.df() as f64;
        let ln_evidence_norm = -(d as f64) / 2.0 * kappa_o.ln()
            - df / 2.0 * ln_det_scale
            + (1..=d)
                .map(|j| ((df + 1.0 - j as f64) / 2.0).ln_gamma().0)
                .sum::<f64>();

        Ok(MixturePrior {
            lambda,
            niw,
            mu_numer_baseline,
            s_partial_baseline,
            ln_det_scale,
            ln_evidence_norm,
        })
    }

    /// Total Dirichlet concentration, λ
    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// The component prior
    #[inline]
    pub fn niw(&self) -> &NormalInvWishart {
        &self.niw
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.niw.ndims()
    }

    #[inline]
    pub fn mu_o(&self) -> &DVector<f64> {
        self.niw.mu()
    }

    #[inline]
    pub fn kappa_o(&self) -> f64 {
        self.niw.k()
    }

    #[inline]
    pub fn s_o(&self) -> &DMatrix<f64> {
        self.niw.scale()
    }

    #[inline]
    pub fn v_o(&self) -> usize {
        self.niw.df()
    }

    /// κ<sub>0</sub>μ<sub>0</sub>, the mean numerator of an empty slot
    #[inline]
    pub fn mu_numer_baseline(&self) -> &DVector<f64> {
        &self.mu_numer_baseline
    }

    /// S<sub>0</sub> + κ<sub>0</sub>μ<sub>0</sub>μ<sub>0</sub><sup>T</sup>,
    /// the partial scatter of an empty slot
    #[inline]
    pub fn s_partial_baseline(&self) -> &DMatrix<f64> {
        &self.s_partial_baseline
    }

    /// ln|S<sub>0</sub>|
    #[inline]
    pub fn ln_det_scale(&self) -> f64 {
        self.ln_det_scale
    }

    /// The evidence normalizer of an empty cluster,
    /// -D/2 ln κ<sub>0</sub> - ν<sub>0</sub>/2 ln|S<sub>0</sub>| +
    /// Σ<sub>j</sub> ln Γ((ν<sub>0</sub> + 1 - j)/2)
    #[inline]
    pub(crate) fn ln_evidence_norm(&self) -> f64 {
        self.ln_evidence_norm
    }
}

impl From<&MixturePrior> for String {
    fn from(prior: &MixturePrior) -> String {
        format!("MixturePrior(λ: {}, {})", prior.lambda, prior.niw)
    }
}

impl_display!(MixturePrior);

impl From<NormalInvWishartError> for MixturePriorError {
    fn from(err: NormalInvWishartError) -> Self {
        MixturePriorError::Niw(err)
    }
}

impl std::error::Error for MixturePriorError {}

impl fmt::Display for MixturePriorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LambdaTooLow { lambda } => {
                write!(f, "lambda ({}) must be greater than zero", lambda)
            }
            Self::LambdaNotFinite { lambda } => {
                write!(f, "lambda ({}) must be finite", lambda)
            }
            Self::ZeroDimension => write!(f, "ndims must be >= 1"),
            Self::Niw(err) => write!(f, "invalid NIW prior: {}", err),
            Self::ScaleNotPositiveDefinite => {
                write!(f, "the prior scale matrix is not positive definite")
            }
        }
    }
}
