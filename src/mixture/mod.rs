//! Finite Bayesian Gaussian mixtures sampled by Gibbs sweeps
//!
//! [`MixturePrior`] holds the Normal-Inverse-Wishart prior on each component
//! and the symmetric Dirichlet concentration on the weights.
//! [`MixtureState`] owns the assignments and the per-cluster sufficient
//! statistics, and [`GibbsStep`] drives one sweep at a time.
mod error;
mod gibbs;
mod prior;
mod state;

pub use error::{ErrorKind, MixtureError};
pub use gibbs::{GibbsConfig, GibbsStep};
pub use prior::{MixturePrior, MixturePriorError};
pub use state::{BirthPolicy, MixtureState};
