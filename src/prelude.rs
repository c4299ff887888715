//! Re-imports for convenience
#[doc(no_inline)]
pub use crate::data::{DataOrSuffStat, MvGaussianSuffStat};
#[doc(no_inline)]
pub use crate::dist::*;
#[doc(no_inline)]
pub use crate::mixture::{
    BirthPolicy, ErrorKind, GibbsConfig, GibbsStep, MixtureError,
    MixturePrior, MixturePriorError, MixtureState,
};
#[doc(no_inline)]
pub use crate::traits::*;

pub type MvGaussianData<'a> =
    DataOrSuffStat<'a, nalgebra::DVector<f64>, MvGaussian>;
