#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::impl_display;
use crate::misc::{ln_det_pd, lnmv_gamma};
use crate::traits::*;
use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{ChiSquared, StandardNormal};
use std::f64::consts::LN_2;
use std::fmt;

/// [Inverse Wishart distribution](https://en.wikipedia.org/wiki/Inverse-Wishart_distribution),
/// W<sup>-1</sup>(**Ψ**, ν), over p×p positive-definite matrices.
///
/// This is the marginal prior on a component's covariance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct InvWishart {
    inv_scale: DMatrix<f64>,
    df: usize,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum InvWishartError {
    /// **Ψ** is not square
    ScaleMatrixNotSquare { nrows: usize, ncols: usize },
    /// ν < p
    DfLessThanDimensions { df: usize, ndims: usize },
    /// **Ψ** has no Cholesky factor
    ScaleMatrixNotPositiveDefinite,
}

impl InvWishart {
    /// W<sup>-1</sup>(**Ψ**, ν) with a positive-definite p×p **Ψ** and
    /// ν ≥ p
    pub fn new(
        inv_scale: DMatrix<f64>,
        df: usize,
    ) -> Result<Self, InvWishartError> {
        let (nrows, ncols) = inv_scale.shape();
        if nrows != ncols {
            return Err(InvWishartError::ScaleMatrixNotSquare { nrows, ncols });
        }
        if df < nrows {
            return Err(InvWishartError::DfLessThanDimensions {
                df,
                ndims: nrows,
            });
        }
        if ln_det_pd(&inv_scale).is_none() {
            return Err(InvWishartError::ScaleMatrixNotPositiveDefinite);
        }
        Ok(InvWishart { inv_scale, df })
    }

    #[inline]
    pub fn new_unchecked(inv_scale: DMatrix<f64>, df: usize) -> Self {
        InvWishart { inv_scale, df }
    }

    /// W<sup>-1</sup>(**I**<sub>p</sub>, p)
    pub fn identity(dims: usize) -> Self {
        InvWishart::new_unchecked(DMatrix::identity(dims, dims), dims)
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.inv_scale.nrows()
    }

    /// **Ψ**
    #[inline]
    pub fn inv_scale(&self) -> &DMatrix<f64> {
        &self.inv_scale
    }

    /// ν
    #[inline]
    pub fn df(&self) -> usize {
        self.df
    }

    /// **Ψ** / (ν - p - 1). Only defined for ν > p + 1.
    pub fn mean(&self) -> Option<DMatrix<f64>> {
        let p = self.ndims();
        (self.df > p + 1)
            .then(|| &self.inv_scale / (self.df - p - 1) as f64)
    }
}

impl From<&InvWishart> for String {
    fn from(iw: &InvWishart) -> String {
        format!("W⁻¹(ν: {}, Ψ: {})", iw.df, iw.inv_scale)
    }
}

impl_display!(InvWishart);

impl Rv<DMatrix<f64>> for InvWishart {
    fn ln_f(&self, x: &DMatrix<f64>) -> f64 {
        let (ln_det_x, x_inv) = match (ln_det_pd(x), x.clone().try_inverse())
        {
            (Some(ln_det_x), Some(x_inv)) => (ln_det_x, x_inv),
            _ => return f64::NEG_INFINITY,
        };
        let ln_det_s = ln_det_pd(&self.inv_scale).unwrap_or(f64::NAN);

        let p = self.ndims();
        let pf = p as f64;
        let half_df = self.df as f64 / 2.0;

        half_df * ln_det_s
            - half_df * pf * LN_2
            - lnmv_gamma(p, half_df)
            - (half_df + (pf + 1.0) / 2.0) * ln_det_x
            - 0.5 * (&self.inv_scale * x_inv).trace()
    }

    // Bartlett: W = L A Aᵀ Lᵀ ~ W(Ψ⁻¹, ν) where L Lᵀ = Ψ⁻¹, A is lower
    // triangular, A_ii² ~ χ²(ν - i) and A_ij ~ N(0, 1) below the diagonal
    fn draw<R: Rng>(&self, rng: &mut R) -> DMatrix<f64> {
        let p = self.ndims();
        let chol_l = self
            .inv_scale
            .clone()
            .try_inverse()
            .and_then(|scale| scale.cholesky())
            .expect("inverse scale is positive definite")
            .unpack();

        let a = DMatrix::from_fn(p, p, |i, j| {
            if i == j {
                let chi2 = ChiSquared::new((self.df - i) as f64)
                    .expect("df is at least the number of dimensions");
                rng.sample(chi2).sqrt()
            } else if i > j {
                rng.sample(StandardNormal)
            } else {
                0.0
            }
        });

        let la = chol_l * a;
        (&la * la.transpose())
            .try_inverse()
            .expect("Wishart draws are invertible")
    }
}

impl Support<DMatrix<f64>> for InvWishart {
    fn supports(&self, x: &DMatrix<f64>) -> bool {
        x.shape() == self.inv_scale.shape() && ln_det_pd(x).is_some()
    }
}

impl ContinuousDistr<DMatrix<f64>> for InvWishart {}

impl std::error::Error for InvWishartError {}

impl fmt::Display for InvWishartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScaleMatrixNotSquare { nrows, ncols } => {
                write!(f, "scale matrix is {} x {}, not square", nrows, ncols)
            }
            Self::DfLessThanDimensions { df, ndims } => write!(
                f,
                "df ({}) is less than the number of dimensions ({})",
                df, ndims
            ),
            Self::ScaleMatrixNotPositiveDefinite => {
                write!(f, "scale matrix is not positive definite")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_basic_impls;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const TOL: f64 = 1E-12;

    test_basic_impls!(InvWishart::identity(3));

    fn inv_scale_fxtr() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            4,
            &[
                1.10576891,
                -0.20160336,
                0.09378834,
                -0.19339029,
                -0.20160336,
                0.66794786,
                -0.46020905,
                -0.62806951,
                0.09378834,
                -0.46020905,
                1.15263284,
                0.98443641,
                -0.19339029,
                -0.62806951,
                0.98443641,
                1.21050189,
            ],
        )
    }

    #[test]
    fn new_validates_parameters() {
        let eye = DMatrix::identity(4, 4);
        assert!(InvWishart::new(eye.clone(), 4).is_ok());
        assert_eq!(
            InvWishart::new(eye, 3),
            Err(InvWishartError::DfLessThanDimensions { df: 3, ndims: 4 })
        );
        assert_eq!(
            InvWishart::new(DMatrix::identity(4, 3), 5),
            Err(InvWishartError::ScaleMatrixNotSquare { nrows: 4, ncols: 3 })
        );
        let indefinite = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert_eq!(
            InvWishart::new(indefinite, 3),
            Err(InvWishartError::ScaleMatrixNotPositiveDefinite)
        );
    }

    #[test]
    fn ln_f_at_identity() {
        // -(8 ln 2 + ln Γ₄(2)) - tr(I) / 2
        let iw = InvWishart::identity(4);
        let x = DMatrix::<f64>::identity(4, 4);
        assert::close(iw.ln_f(&x), -11.430949807317218, TOL);
    }

    #[test]
    fn ln_f_at_the_mode() {
        // the mode of W⁻¹(I, ν) is I / (ν + p + 1)
        let iw = InvWishart::identity(4);
        let x = DMatrix::<f64>::identity(4, 4) / 9.0;
        assert::close(iw.ln_f(&x), 12.11909258473473, 1E-10);
    }

    #[test]
    fn ln_f_with_general_scale() {
        let iw = InvWishart::new(inv_scale_fxtr(), 5).unwrap();
        let x = DMatrix::<f64>::identity(4, 4);
        assert::close(iw.ln_f(&x), -18.939673925150899, 1E-8);
    }

    #[test]
    fn ln_f_outside_support_is_neg_infinity() {
        let iw = InvWishart::identity(2);
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(!iw.supports(&x));
        assert_eq!(iw.ln_f(&x), f64::NEG_INFINITY);
    }

    #[test]
    fn draws_are_positive_definite() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let iw = InvWishart::new(inv_scale_fxtr(), 5).unwrap();
        assert!(iw.sample(100, &mut rng).iter().all(|x| iw.supports(x)));
    }

    #[test]
    fn draws_average_to_the_mean() {
        let mut rng = SmallRng::seed_from_u64(0xFEED);
        let iw = InvWishart::new(DMatrix::identity(2, 2) * 7.0, 10).unwrap();
        let n = 2_000;
        let avg = iw
            .sample(n, &mut rng)
            .iter()
            .fold(DMatrix::zeros(2, 2), |acc, x| acc + x)
            / n as f64;
        let mean = iw.mean().unwrap();
        for (a, m) in avg.iter().zip(mean.iter()) {
            assert::close(*a, *m, 0.1);
        }
    }

    #[test]
    fn mean_requires_enough_df() {
        let iw = InvWishart::new(DMatrix::identity(2, 2), 3).unwrap();
        assert!(iw.mean().is_none());

        let iw = InvWishart::new(DMatrix::identity(2, 2), 5).unwrap();
        let mean = iw.mean().unwrap();
        assert::close(mean[(0, 0)], 0.5, TOL);
        assert::close(mean[(0, 1)], 0.0, TOL);
    }
}
