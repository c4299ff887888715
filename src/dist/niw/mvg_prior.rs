use crate::consts::LN_2PI;
use crate::data::{DataOrSuffStat, MvGaussianSuffStat};
use crate::dist::{MvGaussian, NormalInvWishart};
use crate::misc::{ln_det_pd, lnmv_gamma};
use crate::traits::{ConjugatePrior, SuffStat};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::LN_2;

type MvgData<'a> = DataOrSuffStat<'a, DVector<f64>, MvGaussian>;

// Borrow the statistic of `x`, summarizing raw data first if needed
fn with_stat<T, F>(ndims: usize, x: &MvgData, f: F) -> T
where
    F: FnOnce(&MvGaussianSuffStat) -> T,
{
    match x {
        DataOrSuffStat::SuffStat(stat) => f(stat),
        DataOrSuffStat::Data(xs) => {
            f(&MvGaussianSuffStat::from_data(ndims, xs))
        }
        DataOrSuffStat::None => f(&MvGaussianSuffStat::new(ndims)),
    }
}

// Log normalizer of NIW(·, k, df, scale), less the 2π terms that cancel
fn ln_z(k: f64, df: usize, scale: &DMatrix<f64>) -> f64 {
    let p = scale.nrows() as f64;
    let half_df = df as f64 / 2.0;
    let ln_det = ln_det_pd(scale).unwrap_or(f64::NAN);
    half_df * p * LN_2 + lnmv_gamma(scale.nrows(), half_df)
        - p / 2.0 * k.ln()
        - half_df * ln_det
}

fn update(
    prior: &NormalInvWishart,
    stat: &MvGaussianSuffStat,
) -> NormalInvWishart {
    let mean = match stat.mean() {
        Some(mean) => mean,
        None => return prior.clone(),
    };
    let n = stat.n() as f64;
    let kn = prior.k() + n;
    let mu_n = (prior.k() * prior.mu() + stat.sum_x()) / kn;
    let diff = mean - prior.mu();
    let scale_n = prior.scale()
        + stat.scatter()
        + (prior.k() * n / kn) * &diff * diff.transpose();

    NormalInvWishart::new_unchecked(mu_n, kn, prior.df() + stat.n(), scale_n)
}

impl ConjugatePrior<DVector<f64>, MvGaussian> for NormalInvWishart {
    type Posterior = Self;
    type LnMCache = f64;
    type LnPpCache = (Self, f64);

    fn posterior(&self, x: &MvgData) -> NormalInvWishart {
        with_stat(self.ndims(), x, |stat| update(self, stat))
    }

    #[inline]
    fn ln_m_cache(&self) -> f64 {
        ln_z(self.k(), self.df(), self.scale())
    }

    fn ln_m_with_cache(&self, cache: &Self::LnMCache, x: &MvgData) -> f64 {
        let post = self.posterior(x);
        let nd = (self.ndims() * x.n()) as f64;
        ln_z(post.k(), post.df(), post.scale()) - cache - nd / 2.0 * LN_2PI
    }

    #[inline]
    fn ln_pp_cache(&self, x: &MvgData) -> Self::LnPpCache {
        let post = self.posterior(x);
        let ln_z_post = ln_z(post.k(), post.df(), post.scale());
        (post, ln_z_post)
    }

    fn ln_pp_with_cache(
        &self,
        cache: &Self::LnPpCache,
        y: &DVector<f64>,
    ) -> f64 {
        let (post, ln_z_post) = cache;
        let mut y_stat = MvGaussianSuffStat::new(self.ndims());
        y_stat.observe(y);

        let pred = update(post, &y_stat);
        let d = self.ndims() as f64;
        ln_z(pred.k(), pred.df(), pred.scale()) - ln_z_post - d / 2.0 * LN_2PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    const TOL: f64 = 1E-12;

    fn xs_fxtr() -> Vec<DVector<f64>> {
        vec![
            dvector![3.57839693972576, 0.725404224946106],
            dvector![2.76943702988488, -0.0630548731896562],
            dvector![-1.34988694015652, 0.714742903826096],
            dvector![3.03492346633185, -0.204966058299775],
        ]
    }

    fn niw_fxtr() -> NormalInvWishart {
        NormalInvWishart::new(
            DVector::zeros(2),
            1.0,
            2,
            DMatrix::identity(2, 2),
        )
        .unwrap()
    }

    #[test]
    fn ln_m_of_four_points() {
        let niw = niw_fxtr();
        let stat = MvGaussianSuffStat::from_data(2, &xs_fxtr());
        let ln_m = niw.ln_m(&DataOrSuffStat::SuffStat(&stat));
        assert::close(ln_m, -16.3923777220275, 1E-10);
    }

    #[test]
    fn data_and_suffstat_agree() {
        let niw = niw_fxtr();
        let xs = xs_fxtr();
        let stat = MvGaussianSuffStat::from_data(2, &xs);
        assert::close(
            niw.ln_m(&DataOrSuffStat::Data(&xs)),
            niw.ln_m(&DataOrSuffStat::SuffStat(&stat)),
            TOL,
        );
    }

    #[test]
    fn ln_m_of_no_data_is_zero() {
        let niw = niw_fxtr();
        assert::close(niw.ln_m(&DataOrSuffStat::None), 0.0, TOL);
        assert_eq!(niw.posterior(&DataOrSuffStat::None), niw);
    }

    #[test]
    fn posterior_counts_the_data() {
        let niw = niw_fxtr();
        let xs = xs_fxtr();
        let post = niw.posterior(&DataOrSuffStat::Data(&xs));
        assert::close(post.k(), 5.0, TOL);
        assert_eq!(post.df(), 6);
        // κ₀ = 1 and μ₀ = 0 shrink the mean by n / (n + 1)
        let sum_x: DVector<f64> = xs.iter().sum();
        assert::close(post.mu()[0], sum_x[0] / 5.0, TOL);
        assert::close(post.mu()[1], sum_x[1] / 5.0, TOL);
    }

    #[test]
    fn ln_pp_is_the_difference_of_marginals() {
        let niw = niw_fxtr();
        let all = xs_fxtr();
        let (xs, y) = (&all[..3], &all[3]);

        let ln_m_xs = niw.ln_m(&DataOrSuffStat::Data(xs));
        let ln_m_all = niw.ln_m(&DataOrSuffStat::Data(&all));
        let ln_pp = niw.ln_pp(y, &DataOrSuffStat::Data(xs));

        assert::close(ln_pp, ln_m_all - ln_m_xs, 1E-10);
    }
}
