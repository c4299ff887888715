#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::traits::SuffStat;
use nalgebra::{DMatrix, DVector};

/// Count, sum, and sum of outer products of a set of D-dimensional points.
///
/// This is what a Normal-Inverse-Wishart prior needs to know about the
/// members of a cluster.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MvGaussianSuffStat {
    n: usize,
    sum_x: DVector<f64>,
    sum_x_sq: DMatrix<f64>,
}

impl MvGaussianSuffStat {
    /// An empty statistic for `dims`-dimensional points
    #[inline]
    #[must_use]
    pub fn new(dims: usize) -> Self {
        MvGaussianSuffStat {
            n: 0,
            sum_x: DVector::zeros(dims),
            sum_x_sq: DMatrix::zeros(dims, dims),
        }
    }

    /// The statistic of `xs`
    ///
    /// # Example
    ///
    /// ```rust
    /// use gaussmix::data::MvGaussianSuffStat;
    /// use nalgebra::dvector;
    ///
    /// let xs = vec![dvector![0.1, 0.2], dvector![0.3, 0.4]];
    /// let stat = MvGaussianSuffStat::from_data(2, &xs);
    ///
    /// assert_eq!(stat.n(), 2);
    /// assert::close(stat.sum_x()[1], 0.6, 1e-12);
    /// assert::close(stat.sum_x_sq()[(0, 1)], 0.14, 1e-12);
    /// ```
    #[must_use]
    pub fn from_data(dims: usize, xs: &[DVector<f64>]) -> Self {
        let mut stat = MvGaussianSuffStat::new(dims);
        stat.observe_many(xs);
        stat
    }

    /// Build a statistic from its parts. `sum_x_sq` is assumed symmetric
    /// and to match `sum_x` in size.
    #[inline]
    #[must_use]
    pub fn from_parts_unchecked(
        n: usize,
        sum_x: DVector<f64>,
        sum_x_sq: DMatrix<f64>,
    ) -> Self {
        MvGaussianSuffStat { n, sum_x, sum_x_sq }
    }

    #[inline]
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.sum_x.len()
    }

    #[inline]
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Σ x
    #[inline]
    #[must_use]
    pub fn sum_x(&self) -> &DVector<f64> {
        &self.sum_x
    }

    /// Σ xx<sup>T</sup>
    #[inline]
    #[must_use]
    pub fn sum_x_sq(&self) -> &DMatrix<f64> {
        &self.sum_x_sq
    }

    /// The sample mean, x̄. `None` if there are no observations.
    #[must_use]
    pub fn mean(&self) -> Option<DVector<f64>> {
        if self.n == 0 {
            None
        } else {
            Some(&self.sum_x / self.n as f64)
        }
    }

    /// The centered scatter matrix, Σ (x - x̄)(x - x̄)<sup>T</sup>
    #[must_use]
    pub fn scatter(&self) -> DMatrix<f64> {
        if self.n == 0 {
            return DMatrix::zeros(self.ndims(), self.ndims());
        }
        &self.sum_x_sq - (&self.sum_x * self.sum_x.transpose()) / self.n as f64
    }
}

impl SuffStat<DVector<f64>> for MvGaussianSuffStat {
    fn n(&self) -> usize {
        self.n
    }

    fn observe(&mut self, x: &DVector<f64>) {
        self.n += 1;
        self.sum_x += x;
        self.sum_x_sq += x * x.transpose();
    }

    fn forget(&mut self, x: &DVector<f64>) {
        self.n -= 1;
        if self.n == 0 {
            // clear rounding residue
            self.sum_x.fill(0.0);
            self.sum_x_sq.fill(0.0);
        } else {
            self.sum_x -= x;
            self.sum_x_sq -= x * x.transpose();
        }
    }

    fn merge(&mut self, other: Self) {
        self.n += other.n;
        self.sum_x += other.sum_x;
        self.sum_x_sq += other.sum_x_sq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    const TOL: f64 = 1E-12;

    fn xs_fxtr() -> Vec<DVector<f64>> {
        vec![dvector![1.0, 2.0], dvector![3.0, 0.0], dvector![-1.0, 1.0]]
    }

    #[test]
    fn from_data_accumulates() {
        let stat = MvGaussianSuffStat::from_data(2, &xs_fxtr());
        assert_eq!(stat.n(), 3);
        assert::close(stat.sum_x()[0], 3.0, TOL);
        assert::close(stat.sum_x()[1], 3.0, TOL);
        assert::close(stat.sum_x_sq()[(0, 0)], 11.0, TOL);
        assert::close(stat.sum_x_sq()[(0, 1)], 1.0, TOL);
        assert::close(stat.sum_x_sq()[(1, 1)], 5.0, TOL);
    }

    #[test]
    fn mean_and_scatter() {
        let stat = MvGaussianSuffStat::from_data(2, &xs_fxtr());
        let mean = stat.mean().unwrap();
        assert::close(mean[0], 1.0, TOL);
        assert::close(mean[1], 1.0, TOL);

        // deviations: (0, 1), (2, -1), (-2, 0)
        let scatter = stat.scatter();
        assert::close(scatter[(0, 0)], 8.0, TOL);
        assert::close(scatter[(0, 1)], -2.0, TOL);
        assert::close(scatter[(1, 0)], -2.0, TOL);
        assert::close(scatter[(1, 1)], 2.0, TOL);
    }

    #[test]
    fn empty_stat_has_no_mean() {
        let stat = MvGaussianSuffStat::new(3);
        assert!(stat.mean().is_none());
        assert_eq!(stat.scatter(), DMatrix::zeros(3, 3));
    }

    #[test]
    fn forget_undoes_observe() {
        let xs = xs_fxtr();
        let mut stat = MvGaussianSuffStat::from_data(2, &xs[..2]);
        let before = stat.clone();

        stat.observe(&xs[2]);
        stat.forget(&xs[2]);
        assert_eq!(stat.n(), before.n());
        assert::close(stat.sum_x()[0], before.sum_x()[0], TOL);
        assert::close(stat.sum_x_sq()[(0, 1)], before.sum_x_sq()[(0, 1)], TOL);

        stat.forget_many(&xs[..2]);
        assert_eq!(stat, MvGaussianSuffStat::new(2));
    }

    #[test]
    fn merge_matches_observing_everything() {
        let xs = xs_fxtr();
        let mut a = MvGaussianSuffStat::from_data(2, &xs[..1]);
        let b = MvGaussianSuffStat::from_data(2, &xs[1..]);
        let all = MvGaussianSuffStat::from_data(2, &xs);

        SuffStat::<DVector<f64>>::merge(&mut a, b);
        assert_eq!(a.n(), all.n());
        for (x, y) in a.sum_x_sq().iter().zip(all.sum_x_sq().iter()) {
            assert::close(*x, *y, TOL);
        }
    }
}
