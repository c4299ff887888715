#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::mixture::{BirthPolicy, MixtureError, MixtureState};
use log::debug;
use nalgebra::DVector;
use rand::Rng;

/// Settings of a [`GibbsStep`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case", default))]
pub struct GibbsConfig {
    /// Integrate out the weights and component parameters
    pub collapsed: bool,
    /// Draw explicit parameters once and keep them. Uncollapsed only.
    pub fixed_dist_params: bool,
    /// What a collapsed sweep does when a point draws an empty slot
    pub birth_policy: BirthPolicy,
    /// Posterior draws averaged when fixed parameters are estimated
    pub estimate_samples: usize,
}

impl Default for GibbsConfig {
    fn default() -> Self {
        GibbsConfig {
            collapsed: true,
            fixed_dist_params: false,
            birth_policy: BirthPolicy::Spawn,
            estimate_samples: 10,
        }
    }
}

impl GibbsConfig {
    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn with_fixed_dist_params(mut self, fixed_dist_params: bool) -> Self {
        self.fixed_dist_params = fixed_dist_params;
        self
    }

    pub fn with_birth_policy(mut self, birth_policy: BirthPolicy) -> Self {
        self.birth_policy = birth_policy;
        self
    }

    pub fn with_estimate_samples(mut self, estimate_samples: usize) -> Self {
        self.estimate_samples = estimate_samples;
        self
    }
}

/// Runs Gibbs sweeps over a [`MixtureState`]
///
/// # Example
///
/// ```
/// use gaussmix::mixture::{GibbsConfig, GibbsStep, MixturePrior, MixtureState};
/// use nalgebra::{dvector, DMatrix};
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::SmallRng::seed_from_u64(0x1234);
/// let data = vec![
///     dvector![0.0, 0.1],
///     dvector![0.1, 0.0],
///     dvector![8.0, 8.1],
///     dvector![8.1, 7.9],
/// ];
///
/// let prior = MixturePrior::new(
///     1.0,
///     dvector![4.0, 4.0],
///     0.1,
///     DMatrix::identity(2, 2),
///     3,
/// )
/// .unwrap();
///
/// let config = GibbsConfig::default().with_collapsed(false);
/// let state = MixtureState::new(prior, data.len());
/// let mut gibbs = GibbsStep::new(2, state, config, &mut rng).unwrap();
///
/// let ln_p = gibbs.step(&data, &mut rng).unwrap();
/// assert!(ln_p.is_finite());
/// assert_eq!(gibbs.n_sweeps(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct GibbsStep {
    state: MixtureState,
    config: GibbsConfig,
    n_sweeps: usize,
}

impl GibbsStep {
    /// Randomly split the points of `state` into `k` clusters, unless they
    /// are already assigned, and prepare the state for sweeping.
    pub fn new<R: Rng>(
        k: usize,
        mut state: MixtureState,
        config: GibbsConfig,
        rng: &mut R,
    ) -> Result<Self, MixtureError> {
        state.set_birth_policy(config.birth_policy);
        state.init_assignments(k, rng)?;
        state.update_counts();
        Ok(GibbsStep {
            state,
            config,
            n_sweeps: 0,
        })
    }

    /// Run one sweep and return the log probability of the new state.
    ///
    /// Collapsed sweeps return ln p(X, Z). Uncollapsed sweeps return the log
    /// prior of the explicit parameters and the assignments.
    pub fn step<R: Rng>(
        &mut self,
        data: &[DVector<f64>],
        rng: &mut R,
    ) -> Result<f64, MixtureError> {
        let ln_p = if self.config.collapsed {
            self.collapsed_sweep(data, rng)?
        } else {
            self.uncollapsed_sweep(data, rng)?
        };

        self.n_sweeps += 1;
        debug!(
            "sweep {}: K = {}, ln p = {}",
            self.n_sweeps,
            self.state.get_num_clusters(),
            ln_p
        );
        Ok(ln_p)
    }

    fn collapsed_sweep<R: Rng>(
        &mut self,
        data: &[DVector<f64>],
        rng: &mut R,
    ) -> Result<f64, MixtureError> {
        if !self.state.has_data_priors() {
            self.state.update_data_priors(data)?;
        }
        self.state.collapsed_step(data, rng)?;
        self.state.log_marginal(data)
    }

    fn uncollapsed_sweep<R: Rng>(
        &mut self,
        data: &[DVector<f64>],
        rng: &mut R,
    ) -> Result<f64, MixtureError> {
        self.state.refresh(data)?;

        if !self.config.fixed_dist_params {
            self.state.update_params(rng)?;
            self.state.update_mixture_weights(rng)?;
        } else if self.state.mixture_dists().is_empty()
            || self.state.mixture_weights().is_empty()
        {
            let n_samples = self.config.estimate_samples;
            let dists = self.state.estimate_dist_params(n_samples, rng)?;
            let weights = self.state.estimate_mixture_weights(n_samples, rng)?;
            self.state.set_mixture_distributions(dists)?;
            self.state.set_mixture_weights(weights)?;
        }

        self.state.update_assignments(data, rng)?;
        self.state.log_hyper_prior()
    }

    /// Drop the cached prior predictives and mark the cluster cache dirty
    pub fn reset_prior(&mut self) {
        self.state.clear_data_priors();
        self.state.invalidate();
    }

    #[inline]
    pub fn state(&self) -> &MixtureState {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut MixtureState {
        &mut self.state
    }

    #[inline]
    pub fn into_state(self) -> MixtureState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &GibbsConfig {
        &self.config
    }

    /// Number of sweeps run so far
    #[inline]
    pub fn n_sweeps(&self) -> usize {
        self.n_sweeps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::MixturePrior;
    use nalgebra::{dvector, DMatrix};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn prior_fxtr() -> MixturePrior {
        MixturePrior::new(
            2.0,
            dvector![5.0, 5.0],
            0.01,
            DMatrix::identity(2, 2),
            4,
        )
        .unwrap()
    }

    fn data_fxtr() -> Vec<DVector<f64>> {
        vec![
            dvector![0.0, 0.1],
            dvector![0.1, -0.1],
            dvector![-0.1, 0.0],
            dvector![10.0, 10.1],
            dvector![10.1, 9.9],
            dvector![9.9, 10.0],
        ]
    }

    #[test]
    fn default_config() {
        let config = GibbsConfig::default();
        assert!(config.collapsed);
        assert!(!config.fixed_dist_params);
        assert_eq!(config.birth_policy, BirthPolicy::Spawn);
        assert_eq!(config.estimate_samples, 10);
    }

    #[test]
    fn config_builders() {
        let config = GibbsConfig::default()
            .with_collapsed(false)
            .with_fixed_dist_params(true)
            .with_birth_policy(BirthPolicy::FoldIntoLast)
            .with_estimate_samples(3);
        assert!(!config.collapsed);
        assert!(config.fixed_dist_params);
        assert_eq!(config.birth_policy, BirthPolicy::FoldIntoLast);
        assert_eq!(config.estimate_samples, 3);
    }

    #[test]
    fn new_applies_birth_policy_and_counts() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let config =
            GibbsConfig::default().with_birth_policy(BirthPolicy::FoldIntoLast);
        let state = MixtureState::new(prior_fxtr(), 6);
        let gibbs = GibbsStep::new(2, state, config, &mut rng).unwrap();

        assert_eq!(gibbs.state().birth_policy(), BirthPolicy::FoldIntoLast);
        assert!(!gibbs.state().counts_stale());
        assert_eq!(gibbs.state().counts().iter().sum::<usize>(), 6);
        assert_eq!(gibbs.n_sweeps(), 0);
    }

    #[test]
    fn new_rejects_zero_clusters() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let state = MixtureState::new(prior_fxtr(), 6);
        let res = GibbsStep::new(0, state, GibbsConfig::default(), &mut rng);
        assert_eq!(
            res,
            Err(MixtureError::InvalidClusterCount { k: 0, k_max: 6 })
        );
    }

    #[test]
    fn new_keeps_manual_assignments() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let data = data_fxtr();
        let mut state = MixtureState::new(prior_fxtr(), data.len());
        for (i, x) in data.iter().enumerate() {
            state.add_data_to_cluster(x, i, i / 3).unwrap();
        }
        let gibbs =
            GibbsStep::new(4, state, GibbsConfig::default(), &mut rng).unwrap();
        assert_eq!(gibbs.state().get_num_clusters(), 2);
        assert_eq!(gibbs.state().clusters()[0], vec![0, 1, 2]);
    }

    #[test]
    fn collapsed_steps_are_finite() {
        let mut rng = SmallRng::seed_from_u64(0xABCD);
        let data = data_fxtr();
        let state = MixtureState::new(prior_fxtr(), data.len());
        let mut gibbs =
            GibbsStep::new(3, state, GibbsConfig::default(), &mut rng).unwrap();

        for _ in 0..25 {
            assert!(gibbs.step(&data, &mut rng).unwrap().is_finite());
        }
        assert_eq!(gibbs.n_sweeps(), 25);
        assert!(gibbs.state().has_data_priors());
    }

    #[test]
    fn uncollapsed_steps_are_finite() {
        let mut rng = SmallRng::seed_from_u64(0xABCD);
        let data = data_fxtr();
        let state = MixtureState::new(prior_fxtr(), data.len());
        let config = GibbsConfig::default().with_collapsed(false);
        let mut gibbs = GibbsStep::new(2, state, config, &mut rng).unwrap();

        for _ in 0..25 {
            assert!(gibbs.step(&data, &mut rng).unwrap().is_finite());
            let k = gibbs.state().get_num_clusters();
            assert_eq!(gibbs.state().mixture_dists().len(), k);
            assert_eq!(gibbs.state().mixture_weights().len(), k);
        }
    }

    #[test]
    fn fixed_params_are_drawn_once() {
        let mut rng = SmallRng::seed_from_u64(0xBEEF);
        let data = data_fxtr();
        let mut state = MixtureState::new(prior_fxtr(), data.len());
        for (i, x) in data.iter().enumerate() {
            state.add_data_to_cluster(x, i, i / 3).unwrap();
        }
        let config = GibbsConfig::default()
            .with_collapsed(false)
            .with_fixed_dist_params(true);
        let mut gibbs = GibbsStep::new(2, state, config, &mut rng).unwrap();

        gibbs.step(&data, &mut rng).unwrap();
        // the groups are far enough apart that neither empties
        assert_eq!(gibbs.state().get_num_clusters(), 2);
        let dists = gibbs.state().mixture_dists().to_vec();
        let weights = gibbs.state().mixture_weights().to_vec();

        for _ in 0..5 {
            gibbs.step(&data, &mut rng).unwrap();
        }
        assert_eq!(gibbs.state().mixture_dists(), dists.as_slice());
        assert_eq!(gibbs.state().mixture_weights(), weights.as_slice());
    }

    #[test]
    fn reset_prior_clears_caches() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let data = data_fxtr();
        let state = MixtureState::new(prior_fxtr(), data.len());
        let mut gibbs =
            GibbsStep::new(2, state, GibbsConfig::default(), &mut rng).unwrap();
        gibbs.step(&data, &mut rng).unwrap();

        gibbs.reset_prior();
        assert!(!gibbs.state().has_data_priors());
        assert!(gibbs.state().is_dirty());

        assert!(gibbs.step(&data, &mut rng).unwrap().is_finite());
        assert!(gibbs.state().has_data_priors());
    }

    #[test]
    fn into_state_returns_the_sampled_state() {
        let mut rng = SmallRng::seed_from_u64(0x1234);
        let data = data_fxtr();
        let state = MixtureState::new(prior_fxtr(), data.len());
        let mut gibbs =
            GibbsStep::new(2, state, GibbsConfig::default(), &mut rng).unwrap();
        gibbs.step(&data, &mut rng).unwrap();

        let expected = gibbs.state().clone();
        assert_eq!(gibbs.into_state(), expected);
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn config_deserializes_with_defaults() {
        let config: GibbsConfig =
            serde_json::from_str(r#"{"collapsed": false}"#).unwrap();
        assert_eq!(config, GibbsConfig::default().with_collapsed(false));

        let config: GibbsConfig =
            serde_json::from_str(r#"{"birth_policy": "fold_into_last"}"#)
                .unwrap();
        assert_eq!(config.birth_policy, BirthPolicy::FoldIntoLast);
    }
}
