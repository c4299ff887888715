//! Gibbs sampling for finite Bayesian Gaussian mixtures.
//!
//! The mixture engine keeps per-cluster sufficient statistics under a
//! conjugate Normal-Inverse-Wishart prior on each component and a symmetric
//! Dirichlet prior on the mixture weights. Assignments can be resampled with
//! the means, covariances, and weights integrated out (collapsed) or with
//! explicit parameter draws (uncollapsed).
//!
//! # Example
//!
//! Recover two well separated groups with the collapsed sampler
//!
//! ```
//! use gaussmix::prelude::*;
//! use nalgebra::{dvector, DMatrix, DVector};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::SmallRng::seed_from_u64(0xABCD);
//!
//! let data: Vec<DVector<f64>> = vec![
//!     dvector![0.0, 0.1],
//!     dvector![0.1, -0.1],
//!     dvector![-0.1, 0.0],
//!     dvector![10.0, 10.1],
//!     dvector![10.1, 9.9],
//!     dvector![9.9, 10.0],
//! ];
//!
//! let prior = MixturePrior::new(
//!     2.0,
//!     dvector![5.0, 5.0],
//!     0.01,
//!     DMatrix::identity(2, 2),
//!     4,
//! )
//! .unwrap();
//!
//! let state = MixtureState::new(prior, data.len());
//! let mut gibbs =
//!     GibbsStep::new(3, state, GibbsConfig::default(), &mut rng).unwrap();
//!
//! for _ in 0..100 {
//!     let ln_p = gibbs.step(&data, &mut rng).unwrap();
//!     assert!(ln_p.is_finite());
//! }
//!
//! assert!(gibbs.state().get_num_clusters() >= 1);
//! ```

pub mod consts;
pub mod data;
pub mod dist;
pub mod misc;
pub mod mixture;
pub mod prelude;
pub mod traits;

#[macro_export]
macro_rules! impl_display {
    ($kind: ty) => {
        impl ::std::fmt::Display for $kind {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", String::from(self))
            }
        }
    };
}
