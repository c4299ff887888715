//! Observations and their summaries
mod stat;

pub use stat::MvGaussianSuffStat;

use crate::traits::{HasSuffStat, SuffStat};

/// What a conjugate prior is conditioned on: raw points, the sufficient
/// statistic of some points, or nothing at all.
#[derive(Debug, Clone)]
pub enum DataOrSuffStat<'a, X, Fx>
where
    X: 'a,
    Fx: 'a + HasSuffStat<X>,
{
    Data(&'a [X]),
    SuffStat(&'a Fx::Stat),
    None,
}

impl<'a, X, Fx> DataOrSuffStat<'a, X, Fx>
where
    X: 'a,
    Fx: 'a + HasSuffStat<X>,
{
    /// Number of observations conditioned on
    pub fn n(&self) -> usize {
        match self {
            Self::Data(xs) => xs.len(),
            Self::SuffStat(stat) => stat.n(),
            Self::None => 0,
        }
    }
}
