//! Probability distributions
mod categorical;
mod dirichlet;
mod invwishart;
mod mvg;
mod niw;

pub use categorical::{Categorical, CategoricalError};
pub use dirichlet::{
    Dirichlet, DirichletError, SymmetricDirichlet, SymmetricDirichletError,
};
pub use invwishart::{InvWishart, InvWishartError};
pub use mvg::{MvGaussian, MvGaussianError};
pub use niw::{NormalInvWishart, NormalInvWishartError};
