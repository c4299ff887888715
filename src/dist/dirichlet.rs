//! Distributions over mixture weights
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::impl_display;
use crate::misc::vec_to_string;
use crate::traits::*;
use rand::Rng;
use rand_distr::Gamma as RGamma;
use special::Gamma as _;
use std::fmt;

/// [Dirichlet distribution](https://en.wikipedia.org/wiki/Dirichlet_distribution)
/// over points on the k-simplex.
///
/// Under a `SymmetricDirichlet(a, K)` prior, the weights given cluster
/// counts n<sub>k</sub> follow `Dirichlet([n_0 + a, ..., n_K-1 + a])`.
///
/// # Example
///
/// ```
/// # use gaussmix::dist::{Dirichlet, SymmetricDirichlet};
/// # use gaussmix::traits::Rv;
/// let prior = SymmetricDirichlet::new(0.5, 3).unwrap();
/// let post = Dirichlet::from_counts(&prior, &[4, 0, 2]).unwrap();
/// assert_eq!(post.alphas(), &[4.5, 0.5, 2.5]);
///
/// let mut rng = rand::thread_rng();
/// let w = post.draw(&mut rng);
/// assert::close(w.iter().sum::<f64>(), 1.0, 1E-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Dirichlet {
    alphas: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum DirichletError {
    /// There are no concentration parameters
    AlphasEmpty,
    /// A concentration is zero or negative
    AlphaTooLow { ix: usize, alpha: f64 },
    /// A concentration is NaN or infinite
    AlphaNotFinite { ix: usize, alpha: f64 },
}

/// Dirichlet whose k concentrations are all `alpha`.
///
/// The prior on the mixture weights is `SymmetricDirichlet::new(λ/K, K)`,
/// which spreads the total concentration λ evenly over K components.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct SymmetricDirichlet {
    alpha: f64,
    k: usize,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum SymmetricDirichletError {
    /// There are no categories
    KIsZero,
    /// The concentration is zero or negative
    AlphaTooLow { alpha: f64 },
    /// The concentration is NaN or infinite
    AlphaNotFinite { alpha: f64 },
}

fn check_alpha(alpha: f64) -> Result<(), (f64, bool)> {
    if !alpha.is_finite() {
        Err((alpha, false))
    } else if alpha <= 0.0 {
        Err((alpha, true))
    } else {
        Ok(())
    }
}

// Normalized independent Gamma(α, 1) draws
fn draw_simplex<R, I>(alphas: I, rng: &mut R) -> Vec<f64>
where
    R: Rng,
    I: Iterator<Item = f64>,
{
    let mut xs: Vec<f64> = alphas
        .map(|alpha| {
            RGamma::new(alpha, 1.0).map_or(f64::NAN, |g| rng.sample(g))
        })
        .collect();
    let total: f64 = xs.iter().sum();
    xs.iter_mut().for_each(|x| *x /= total);
    xs
}

// ln Dir(x | α) from (α, x) pairs
fn ln_dirichlet<I>(pairs: I) -> f64
where
    I: Iterator<Item = (f64, f64)>,
{
    let (alpha_total, ln_beta, kernel) = pairs.fold(
        (0.0, 0.0, 0.0),
        |(total, ln_beta, kernel), (alpha, x)| {
            (
                total + alpha,
                ln_beta + alpha.ln_gamma().0,
                kernel + (alpha - 1.0) * x.ln(),
            )
        },
    );
    kernel + alpha_total.ln_gamma().0 - ln_beta
}

fn on_simplex(x: &[f64], k: usize) -> bool {
    x.len() == k
        && x.iter().all(|&xi| xi > 0.0)
        && (x.iter().sum::<f64>() - 1.0).abs() < 1E-12
}

impl Dirichlet {
    /// Dirichlet with concentrations `alphas`, each finite and positive
    pub fn new(alphas: Vec<f64>) -> Result<Self, DirichletError> {
        if alphas.is_empty() {
            return Err(DirichletError::AlphasEmpty);
        }
        for (ix, &alpha) in alphas.iter().enumerate() {
            match check_alpha(alpha) {
                Err((alpha, true)) => {
                    return Err(DirichletError::AlphaTooLow { ix, alpha })
                }
                Err((alpha, false)) => {
                    return Err(DirichletError::AlphaNotFinite { ix, alpha })
                }
                Ok(()) => (),
            }
        }
        Ok(Dirichlet { alphas })
    }

    /// Posterior of a symmetric prior after `counts[k]` draws of category `k`
    pub fn from_counts(
        prior: &SymmetricDirichlet,
        counts: &[usize],
    ) -> Result<Self, DirichletError> {
        Dirichlet::new(
            counts.iter().map(|&ct| prior.alpha() + ct as f64).collect(),
        )
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.alphas.len()
    }

    #[inline]
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    /// E[x] = α / Σα
    pub fn mean(&self) -> Vec<f64> {
        let total: f64 = self.alphas.iter().sum();
        self.alphas.iter().map(|a| a / total).collect()
    }
}

impl From<&SymmetricDirichlet> for Dirichlet {
    fn from(symdir: &SymmetricDirichlet) -> Self {
        Dirichlet {
            alphas: vec![symdir.alpha; symdir.k],
        }
    }
}

impl From<&Dirichlet> for String {
    fn from(dir: &Dirichlet) -> String {
        format!("Dir(α: {})", vec_to_string(&dir.alphas, 5))
    }
}

impl_display!(Dirichlet);

impl Rv<Vec<f64>> for Dirichlet {
    fn ln_f(&self, x: &Vec<f64>) -> f64 {
        ln_dirichlet(self.alphas.iter().copied().zip(x.iter().copied()))
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        draw_simplex(self.alphas.iter().copied(), rng)
    }
}

impl Support<Vec<f64>> for Dirichlet {
    fn supports(&self, x: &Vec<f64>) -> bool {
        on_simplex(x, self.k())
    }
}

impl ContinuousDistr<Vec<f64>> for Dirichlet {}

impl SymmetricDirichlet {
    /// `alpha` repeated over `k` categories
    ///
    /// # Example
    ///
    /// ```rust
    /// # use gaussmix::dist::SymmetricDirichlet;
    /// let symdir = SymmetricDirichlet::new(1.2, 5).unwrap();
    /// assert_eq!(symdir.alpha(), 1.2);
    /// assert_eq!(symdir.k(), 5);
    ///
    /// assert!(SymmetricDirichlet::new(0.0, 5).is_err());
    /// assert!(SymmetricDirichlet::new(1.0, 0).is_err());
    /// ```
    pub fn new(alpha: f64, k: usize) -> Result<Self, SymmetricDirichletError> {
        if k == 0 {
            return Err(SymmetricDirichletError::KIsZero);
        }
        match check_alpha(alpha) {
            Err((alpha, true)) => {
                Err(SymmetricDirichletError::AlphaTooLow { alpha })
            }
            Err((alpha, false)) => {
                Err(SymmetricDirichletError::AlphaNotFinite { alpha })
            }
            Ok(()) => Ok(SymmetricDirichlet { alpha, k }),
        }
    }

    #[inline]
    pub fn new_unchecked(alpha: f64, k: usize) -> Self {
        SymmetricDirichlet { alpha, k }
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }
}

impl From<&SymmetricDirichlet> for String {
    fn from(symdir: &SymmetricDirichlet) -> String {
        format!("SymDir(k: {}, α: {})", symdir.k, symdir.alpha)
    }
}

impl_display!(SymmetricDirichlet);

impl Rv<Vec<f64>> for SymmetricDirichlet {
    fn ln_f(&self, x: &Vec<f64>) -> f64 {
        ln_dirichlet(x.iter().map(|&xi| (self.alpha, xi)))
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        draw_simplex(std::iter::repeat(self.alpha).take(self.k), rng)
    }
}

impl Support<Vec<f64>> for SymmetricDirichlet {
    fn supports(&self, x: &Vec<f64>) -> bool {
        on_simplex(x, self.k)
    }
}

impl ContinuousDistr<Vec<f64>> for SymmetricDirichlet {}

impl std::error::Error for DirichletError {}
impl std::error::Error for SymmetricDirichletError {}

impl fmt::Display for DirichletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlphasEmpty => write!(f, "no concentrations given"),
            Self::AlphaTooLow { ix, alpha } => {
                write!(f, "alpha {} must be positive, got {}", ix, alpha)
            }
            Self::AlphaNotFinite { ix, alpha } => {
                write!(f, "alpha {} must be finite, got {}", ix, alpha)
            }
        }
    }
}

impl fmt::Display for SymmetricDirichletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KIsZero => write!(f, "k must be at least one"),
            Self::AlphaTooLow { alpha } => {
                write!(f, "alpha must be positive, got {}", alpha)
            }
            Self::AlphaNotFinite { alpha } => {
                write!(f, "alpha must be finite, got {}", alpha)
            }
        }
    }
}
