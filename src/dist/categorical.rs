//! Distribution over the labels {0, 1, ..., k-1}
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::impl_display;
use crate::misc::{ln_pflip, logsumexp, vec_to_string};
use crate::traits::*;
use rand::Rng;
use std::fmt;

/// [Categorical distribution](https://en.wikipedia.org/wiki/Categorical_distribution)
/// over cluster labels in [0, k).
///
/// Weights are held normalized in log space.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Categorical {
    ln_weights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum CategoricalError {
    /// No weights were given
    EmptyWeights,
    /// A weight is NaN or infinite (+∞ in log space)
    NonFiniteWeight { ix: usize, weight: f64 },
    /// A weight is below zero
    NegativeWeight { ix: usize, weight: f64 },
    /// Every weight is zero
    ZeroTotalWeight,
}

impl Categorical {
    /// Categorical with probabilities proportional to `weights`
    ///
    /// # Examples
    ///
    /// ```
    /// # use gaussmix::traits::*;
    /// # use gaussmix::dist::Categorical;
    /// let cat = Categorical::new(&[4.0, 2.0, 3.0, 1.0]).unwrap();
    ///
    /// assert!(cat.supports(&3_usize));
    /// assert!(!cat.supports(&4_usize));
    /// assert::close(cat.f(&0_usize), 0.4, 1E-12);
    /// ```
    pub fn new(weights: &[f64]) -> Result<Self, CategoricalError> {
        let mut total = 0.0;
        for (ix, &weight) in weights.iter().enumerate() {
            if !weight.is_finite() {
                return Err(CategoricalError::NonFiniteWeight { ix, weight });
            }
            if weight < 0.0 {
                return Err(CategoricalError::NegativeWeight { ix, weight });
            }
            total += weight;
        }
        if weights.is_empty() {
            return Err(CategoricalError::EmptyWeights);
        }
        if total == 0.0 {
            return Err(CategoricalError::ZeroTotalWeight);
        }

        let ln_total = total.ln();
        Ok(Categorical {
            ln_weights: weights.iter().map(|w| w.ln() - ln_total).collect(),
        })
    }

    /// Categorical with log probabilities `ln_weights` up to an additive
    /// constant. A weight of -∞ is an impossible outcome.
    ///
    /// ```
    /// # use gaussmix::traits::*;
    /// # use gaussmix::dist::Categorical;
    /// let cat = Categorical::from_ln_weights(vec![-700.0, -700.0]).unwrap();
    /// assert::close(cat.f(&1_usize), 0.5, 1E-12);
    /// ```
    pub fn from_ln_weights(
        mut ln_weights: Vec<f64>,
    ) -> Result<Self, CategoricalError> {
        if ln_weights.is_empty() {
            return Err(CategoricalError::EmptyWeights);
        }
        if let Some(ix) = ln_weights
            .iter()
            .position(|&w| w.is_nan() || w == f64::INFINITY)
        {
            let weight = ln_weights[ix];
            return Err(CategoricalError::NonFiniteWeight { ix, weight });
        }

        let ln_z = logsumexp(&ln_weights);
        if ln_z == f64::NEG_INFINITY {
            return Err(CategoricalError::ZeroTotalWeight);
        }
        ln_weights.iter_mut().for_each(|w| *w -= ln_z);
        Ok(Categorical { ln_weights })
    }

    /// Wrap log weights that already normalize
    #[inline]
    pub fn new_unchecked(ln_weights: Vec<f64>) -> Self {
        Categorical { ln_weights }
    }

    /// Every label in [0, k) equally likely
    ///
    /// ```rust
    /// # use gaussmix::dist::Categorical;
    /// let cat = Categorical::uniform(4);
    /// assert_eq!(cat.k(), 4);
    /// ```
    #[inline]
    pub fn uniform(k: usize) -> Self {
        Categorical::new_unchecked(vec![-(k as f64).ln(); k])
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.ln_weights.len()
    }

    #[inline]
    pub fn ln_weights(&self) -> &[f64] {
        &self.ln_weights
    }

    pub fn weights(&self) -> Vec<f64> {
        self.ln_weights.iter().map(|w| w.exp()).collect()
    }
}

impl From<&Categorical> for String {
    fn from(cat: &Categorical) -> String {
        format!("Cat(k: {}, w: {})", cat.k(), vec_to_string(&cat.weights(), 5))
    }
}

impl_display!(Categorical);

impl Rv<usize> for Categorical {
    fn ln_f(&self, x: &usize) -> f64 {
        self.ln_weights
            .get(*x)
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> usize {
        ln_pflip(&self.ln_weights, 1, true, rng)[0]
    }

    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<usize> {
        ln_pflip(&self.ln_weights, n, true, rng)
    }
}

impl Support<usize> for Categorical {
    fn supports(&self, x: &usize) -> bool {
        *x < self.k()
    }
}

impl std::error::Error for CategoricalError {}

impl fmt::Display for CategoricalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWeights => write!(f, "no weights given"),
            Self::NonFiniteWeight { ix, weight } => {
                write!(f, "weight {} is not finite ({})", ix, weight)
            }
            Self::NegativeWeight { ix, weight } => {
                write!(f, "weight {} is negative ({})", ix, weight)
            }
            Self::ZeroTotalWeight => write!(f, "all weights are zero"),
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

    test_basic_impls!(Categorical::uniform(3));

    #[test]
    fn new_normalizes() {
        let cat = Categorical::new(&[2.0, 1.0, 1.0]).unwrap();
        assert::close(logsumexp(cat.ln_weights()), 0.0, TOL);
        assert::close(cat.f(&0), 0.5, TOL);
        assert::close(cat.f(&2), 0.25, TOL);
    }

    #[test]
    fn zero_weights_are_allowed_but_not_all_of_them() {
        let cat = Categorical::new(&[0.0, 1.0]).unwrap();
        assert_eq!(cat.ln_f(&0), f64::NEG_INFINITY);
        assert_eq!(
            Categorical::new(&[0.0, 0.0]),
            Err(CategoricalError::ZeroTotalWeight)
        );
    }

    #[test]
    fn new_rejects_bad_weights() {
        assert_eq!(Categorical::new(&[]), Err(CategoricalError::EmptyWeights));
        assert_eq!(
            Categorical::new(&[1.0, -1.0]),
            Err(CategoricalError::NegativeWeight { ix: 1, weight: -1.0 })
        );
        assert!(matches!(
            Categorical::new(&[1.0, f64::NAN]),
            Err(CategoricalError::NonFiniteWeight { ix: 1, .. })
        ));
    }

    #[test]
    fn from_ln_weights_matches_new() {
        let weights = [0.2, 0.5, 0.3];
        let ln_weights = weights.iter().map(|w: &f64| w.ln() + 12.0).collect();
        let a = Categorical::new(&weights).unwrap();
        let b = Categorical::from_ln_weights(ln_weights).unwrap();
        for (x, y) in a.ln_weights().iter().zip(b.ln_weights().iter()) {
            assert::close(*x, *y, TOL);
        }
    }

    #[test]
    fn from_ln_weights_rejects_bad_weights() {
        assert_eq!(
            Categorical::from_ln_weights(vec![f64::NEG_INFINITY; 2]),
            Err(CategoricalError::ZeroTotalWeight)
        );
        assert!(matches!(
            Categorical::from_ln_weights(vec![0.0, f64::INFINITY]),
            Err(CategoricalError::NonFiniteWeight { ix: 1, .. })
        ));
    }

    #[test]
    fn labels_outside_the_support_have_zero_density() {
        let cat = Categorical::uniform(2);
        assert_eq!(cat.ln_f(&2), f64::NEG_INFINITY);
    }

    #[test]
    fn uniform_sample_hits_every_label() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let cat = Categorical::uniform(4);
        let xs = cat.sample(200, &mut rng);
        assert_eq!(xs.len(), 200);
        assert!(xs.iter().all(|x| cat.supports(x)));
        assert!((0..4).all(|k| xs.contains(&k)));
    }
}
