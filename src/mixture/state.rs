#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::LN_PI;
use crate::data::MvGaussianSuffStat;
use crate::dist::{
    Categorical, Dirichlet, MvGaussian, NormalInvWishart, SymmetricDirichlet,
};
use crate::misc::{ln_det_pd, ln_pflip, logsumexp};
use crate::mixture::{MixtureError, MixturePrior};
use crate::traits::Rv;
use itertools::Itertools;
use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector};
use rand::seq::SliceRandom;
use rand::Rng;
use special::Gamma as _;

/// What a collapsed sweep does when a point draws one of the empty slots
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum BirthPolicy {
    /// Open a new cluster at index K
    #[default]
    Spawn,
    /// Join cluster K - 1. A cluster is only opened when there are none.
    FoldIntoLast,
}

/// Assignments and cached per-cluster statistics of a finite Gaussian
/// mixture under a [`MixturePrior`].
///
/// Every slot k in [0, K<sub>max</sub>) stores its count and two "partial"
/// aggregates:
///
/// - mu_numer<sub>k</sub> = κ<sub>0</sub>μ<sub>0</sub> + Σ x
/// - s_partial<sub>k</sub> = S<sub>0</sub> + κ<sub>0</sub>μ<sub>0</sub>μ<sub>0</sub><sup>T</sup> + Σ xx<sup>T</sup>
///
/// from which the NIW posterior of the cluster follows in O(D²). Clusters
/// occupy the dense range [0, K); removing the last member of a cluster
/// moves the highest cluster into its slot.
///
/// Queries take `&self` and fail with [`MixtureError::StaleCounts`] or
/// [`MixtureError::StaleCache`] rather than recomputing. Call
/// [`MixtureState::refresh`] after bulk changes to the assignments.
///
/// # Example
///
/// ```
/// use gaussmix::mixture::{MixturePrior, MixtureState};
/// use nalgebra::{dvector, DMatrix};
///
/// let prior = MixturePrior::new(
///     1.0,
///     dvector![0.0, 0.0],
///     1.0,
///     DMatrix::identity(2, 2),
///     3,
/// )
/// .unwrap();
///
/// let data = vec![dvector![0.1, 0.2], dvector![-0.3, 0.1], dvector![4.0, 4.2]];
/// let mut state = MixtureState::new(prior, data.len());
///
/// state.add_data_to_cluster(&data[0], 0, 0).unwrap();
/// state.add_data_to_cluster(&data[1], 1, 0).unwrap();
/// state.add_data_to_cluster(&data[2], 2, 1).unwrap();
///
/// assert_eq!(state.get_num_clusters(), 2);
/// assert_eq!(state.counts(), &[2, 1]);
///
/// let ln_m = state.log_marginal(&data).unwrap();
/// assert!(ln_m.is_finite());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MixtureState {
    prior: MixturePrior,
    n: usize,
    k_max: usize,
    n_clusters: usize,
    assignments: Vec<Option<usize>>,
    counts: Vec<usize>,
    mu_numer: Vec<DVector<f64>>,
    s_partial: Vec<DMatrix<f64>>,
    // ln Γ((ν₀ + 1 - D + m)/2) for m in 0..N + D + 2
    ln_gamma_table: Vec<f64>,
    log_prior_x: Vec<f64>,
    mixture_weights: Vec<f64>,
    mixture_dists: Vec<MvGaussian>,
    birth_policy: BirthPolicy,
    initialized: bool,
    counts_stale: bool,
    cache_dirty: bool,
}

impl MixtureState {
    /// A state for `n` points with one cluster slot per point
    pub fn new(prior: MixturePrior, n: usize) -> Self {
        MixtureState::with_capacity(prior, n, n)
    }

    /// A state for `n` points with at most `k_max` clusters
    pub fn with_capacity(prior: MixturePrior, n: usize, k_max: usize) -> Self {
        let d = prior.ndims();
        let v_o = prior.v_o() as f64;
        let ln_gamma_table = (0..n + d + 2)
            .map(|m| ((v_o + 1.0 - d as f64 + m as f64) / 2.0).ln_gamma().0)
            .collect();

        MixtureState {
            n,
            k_max,
            n_clusters: 0,
            assignments: vec![None; n],
            counts: vec![0; k_max],
            mu_numer: vec![prior.mu_numer_baseline().clone(); k_max],
            s_partial: vec![prior.s_partial_baseline().clone(); k_max],
            ln_gamma_table,
            log_prior_x: Vec::new(),
            mixture_weights: Vec::new(),
            mixture_dists: Vec::new(),
            birth_policy: BirthPolicy::default(),
            initialized: false,
            counts_stale: false,
            cache_dirty: false,
            prior,
        }
    }

    #[inline]
    pub fn prior(&self) -> &MixturePrior {
        &self.prior
    }

    /// Number of data points, N
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Maximum number of clusters
    #[inline]
    pub fn k_max(&self) -> usize {
        self.k_max
    }

    #[inline]
    pub fn ndims(&self) -> usize {
        self.prior.ndims()
    }

    /// Current number of clusters, K
    #[inline]
    pub fn get_num_clusters(&self) -> usize {
        self.n_clusters
    }

    /// The cluster of each point. `None` marks an unassigned point.
    #[inline]
    pub fn assignments(&self) -> &[Option<usize>] {
        &self.assignments
    }

    /// Member counts of clusters [0, K)
    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts[..self.n_clusters.min(self.k_max)]
    }

    /// Number of points currently assigned to a cluster
    pub fn n_assigned(&self) -> usize {
        self.assignments.iter().filter(|z| z.is_some()).count()
    }

    /// Point indices of each cluster, in cluster order
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut groups = self
            .assignments
            .iter()
            .enumerate()
            .filter_map(|(ix, z)| z.map(|k| (k, ix)))
            .into_group_map();
        (0..self.n_clusters)
            .map(|k| groups.remove(&k).unwrap_or_default())
            .collect()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// `true` if the cluster cache must be rebuilt before querying
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.cache_dirty
    }

    /// `true` if the counts must be recomputed before querying
    #[inline]
    pub fn counts_stale(&self) -> bool {
        self.counts_stale
    }

    #[inline]
    pub fn birth_policy(&self) -> BirthPolicy {
        self.birth_policy
    }

    #[inline]
    pub fn set_birth_policy(&mut self, birth_policy: BirthPolicy) {
        self.birth_policy = birth_policy;
    }

    /// Explicit mixture weights. Empty until drawn or set.
    #[inline]
    pub fn mixture_weights(&self) -> &[f64] {
        &self.mixture_weights
    }

    /// Explicit component distributions. Empty until drawn or set.
    #[inline]
    pub fn mixture_dists(&self) -> &[MvGaussian] {
        &self.mixture_dists
    }

    pub fn get_mixture_mean(&self, k: usize) -> Option<&DVector<f64>> {
        self.mixture_dists.get(k).map(|dist| dist.mu())
    }

    pub fn get_mixture_covariance(&self, k: usize) -> Option<&DMatrix<f64>> {
        self.mixture_dists.get(k).map(|dist| dist.cov())
    }

    /// Set one explicit component distribution per cluster
    pub fn set_mixture_distributions(
        &mut self,
        dists: Vec<MvGaussian>,
    ) -> Result<(), MixtureError> {
        if dists.len() != self.n_clusters {
            return Err(MixtureError::ParameterLengthMismatch {
                expected: self.n_clusters,
                got: dists.len(),
            });
        }
        if let Some(dist) = dists.iter().find(|d| d.ndims() != self.ndims()) {
            return Err(MixtureError::DimensionMismatch {
                expected: self.ndims(),
                got: dist.ndims(),
            });
        }
        self.mixture_dists = dists;
        Ok(())
    }

    /// Set one explicit weight per cluster. The weights are normalized.
    pub fn set_mixture_weights(
        &mut self,
        weights: Vec<f64>,
    ) -> Result<(), MixtureError> {
        if weights.len() != self.n_clusters {
            return Err(MixtureError::ParameterLengthMismatch {
                expected: self.n_clusters,
                got: weights.len(),
            });
        }
        if let Some((ix, &weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(MixtureError::InvalidWeight { ix, weight });
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(MixtureError::InvalidWeight {
                ix: 0,
                weight: total,
            });
        }
        self.mixture_weights = weights.iter().map(|w| w / total).collect();
        Ok(())
    }

    /// Randomly assign every point to one of `k` clusters.
    ///
    /// Does nothing if the assignments were already initialized. Counts are
    /// left stale; call [`MixtureState::update_counts`] afterwards.
    pub fn init_assignments<R: Rng>(
        &mut self,
        k: usize,
        rng: &mut R,
    ) -> Result<(), MixtureError> {
        if self.initialized {
            return Ok(());
        }
        if k == 0 || k > self.k_max {
            return Err(MixtureError::InvalidClusterCount {
                k,
                k_max: self.k_max,
            });
        }

        let labels = Categorical::uniform(k).sample(self.n, rng);
        self.assignments = labels.into_iter().map(Some).collect();
        self.n_clusters = k;
        self.counts_stale = true;
        self.cache_dirty = true;
        self.initialized = true;
        debug!("initialized {} points into {} clusters", self.n, k);
        Ok(())
    }

    /// Overwrite every assignment. An empty slice does nothing.
    ///
    /// Counts are left stale; call [`MixtureState::update_counts`]
    /// afterwards.
    pub fn set_assignments(
        &mut self,
        labels: &[usize],
    ) -> Result<(), MixtureError> {
        if labels.is_empty() {
            return Ok(());
        }
        if labels.len() != self.n {
            return Err(MixtureError::AssignmentLengthMismatch {
                expected: self.n,
                got: labels.len(),
            });
        }
        if let Some((ix, &label)) =
            labels.iter().enumerate().find(|(_, &z)| z >= self.k_max)
        {
            return Err(MixtureError::LabelOutOfRange {
                ix,
                label,
                k_max: self.k_max,
            });
        }

        self.assignments = labels.iter().map(|&z| Some(z)).collect();
        self.counts_stale = true;
        self.cache_dirty = true;
        self.initialized = true;
        Ok(())
    }

    /// Recompute the counts from the assignments and set K.
    ///
    /// Empty slots below the highest label are filled by moving the highest
    /// cluster down, relabeling its points and carrying any explicit
    /// parameters along. The cache is marked dirty if anything moved.
    pub fn update_counts(&mut self) {
        self.counts.iter_mut().for_each(|ct| *ct = 0);
        for &k in self.assignments.iter().flatten() {
            self.counts[k] += 1;
        }

        let highest = |counts: &[usize]| {
            counts.iter().rposition(|&ct| ct > 0).map_or(0, |k| k + 1)
        };

        let mut n_clusters = highest(&self.counts);
        let mut relabeled = false;
        let mut k = 0;
        while k < n_clusters {
            if self.counts[k] == 0 {
                let last = n_clusters - 1;
                self.move_slot(last, k);
                if last < self.mixture_dists.len() {
                    self.mixture_dists.swap(k, last);
                }
                if last < self.mixture_weights.len() {
                    self.mixture_weights.swap(k, last);
                }
                relabeled = true;
                n_clusters = highest(&self.counts[..last]);
            }
            k += 1;
        }

        self.n_clusters = n_clusters;
        self.fit_explicit_params();
        self.counts_stale = false;
        if relabeled {
            self.cache_dirty = true;
        }
    }

    /// Rebuild every slot from the assignments in one pass over the data.
    /// Does nothing if the cache is clean.
    pub fn update_cluster_cache(
        &mut self,
        data: &[DVector<f64>],
    ) -> Result<(), MixtureError> {
        if self.counts_stale {
            return Err(MixtureError::StaleCounts);
        }
        if !self.cache_dirty {
            return Ok(());
        }
        self.check_data_len(data)?;

        for k in 0..self.k_max {
            self.reset_slot(k);
        }

        for (z, x) in self.assignments.iter().zip(data.iter()) {
            if let Some(k) = *z {
                if x.len() != self.prior.ndims() {
                    return Err(MixtureError::DimensionMismatch {
                        expected: self.prior.ndims(),
                        got: x.len(),
                    });
                }
                self.mu_numer[k] += x;
                self.s_partial[k] += x * x.transpose();
            }
        }

        self.cache_dirty = false;
        Ok(())
    }

    /// Bring the counts and the cluster cache up to date
    pub fn refresh(
        &mut self,
        data: &[DVector<f64>],
    ) -> Result<(), MixtureError> {
        if self.counts_stale {
            self.update_counts();
        }
        self.update_cluster_cache(data)
    }

    /// Mark the cluster cache dirty
    #[inline]
    pub fn invalidate(&mut self) {
        self.cache_dirty = true;
    }

    /// Assign point `i` to cluster `k`.
    ///
    /// `k == K` opens a new cluster. The point must be unassigned.
    pub fn add_data_to_cluster(
        &mut self,
        x: &DVector<f64>,
        i: usize,
        k: usize,
    ) -> Result<(), MixtureError> {
        if self.counts_stale {
            return Err(MixtureError::StaleCounts);
        }
        self.check_point(x, i)?;
        if let Some(k_cur) = self.assignments[i] {
            return Err(MixtureError::PointAlreadyAssigned { ix: i, k: k_cur });
        }
        if k > self.n_clusters || k >= self.k_max {
            return Err(MixtureError::ClusterIndexOutOfRange {
                k,
                n_clusters: self.n_clusters,
            });
        }

        if k == self.n_clusters {
            self.reset_slot(k);
            self.n_clusters += 1;
            trace!("opened cluster {}", k);
        }

        self.counts[k] += 1;
        self.mu_numer[k] += x;
        self.s_partial[k] += x * x.transpose();
        self.assignments[i] = Some(k);
        self.initialized = true;
        Ok(())
    }

    /// Remove point `i` from cluster `k`, deleting the cluster if it empties.
    ///
    /// Removing from an empty cluster logs a warning and does nothing.
    pub fn del_data_from_cluster(
        &mut self,
        x: &DVector<f64>,
        i: usize,
        k: usize,
    ) -> Result<(), MixtureError> {
        if self.counts_stale {
            return Err(MixtureError::StaleCounts);
        }
        if k >= self.k_max || self.counts[k] == 0 {
            warn!("cannot remove point {} from empty cluster {}", i, k);
            return Ok(());
        }
        self.check_point(x, i)?;
        if self.assignments[i] != Some(k) {
            return Err(MixtureError::PointNotInCluster { ix: i, k });
        }

        self.counts[k] -= 1;
        self.assignments[i] = None;

        if self.counts[k] == 0 {
            self.delete_cluster(k)
        } else {
            self.mu_numer[k] -= x;
            self.s_partial[k] -= x * x.transpose();
            Ok(())
        }
    }

    /// Delete cluster `k`, moving cluster K - 1 into its slot.
    ///
    /// Remaining members of `k` become unassigned. Explicit parameters of
    /// `k` are dropped when present.
    pub fn delete_cluster(&mut self, k: usize) -> Result<(), MixtureError> {
        if self.counts_stale {
            return Err(MixtureError::StaleCounts);
        }
        if self.n_clusters == 0 {
            warn!("there is no cluster to delete");
            return Ok(());
        }
        if k >= self.n_clusters {
            return Err(MixtureError::ClusterIndexOutOfRange {
                k,
                n_clusters: self.n_clusters,
            });
        }

        for z in self.assignments.iter_mut().filter(|z| **z == Some(k)) {
            *z = None;
        }

        let last = self.n_clusters - 1;
        if self.mixture_dists.len() == self.n_clusters {
            self.mixture_dists.swap_remove(k);
        }
        if self.mixture_weights.len() == self.n_clusters {
            self.mixture_weights.swap_remove(k);
            normalize(&mut self.mixture_weights);
        }

        if k != last {
            self.move_slot(last, k);
        } else {
            self.counts[last] = 0;
            self.reset_slot(last);
        }
        self.n_clusters = last;
        trace!("deleted cluster {}, {} remain", k, last);
        Ok(())
    }

    /// The sufficient statistic of the members of cluster `k`
    pub fn cluster_suffstat(
        &self,
        k: usize,
    ) -> Result<MvGaussianSuffStat, MixtureError> {
        self.ensure_fresh()?;
        self.check_cluster(k)?;
        let sum_x = &self.mu_numer[k] - self.prior.mu_numer_baseline();
        let sum_x_sq = &self.s_partial[k] - self.prior.s_partial_baseline();
        Ok(MvGaussianSuffStat::from_parts_unchecked(
            self.counts[k],
            sum_x,
            sum_x_sq,
        ))
    }

    /// The NIW posterior of the parameters of cluster `k`
    pub fn posterior(
        &self,
        k: usize,
    ) -> Result<NormalInvWishart, MixtureError> {
        self.ensure_fresh()?;
        self.check_cluster(k)?;
        let n = self.counts[k];
        let kappa = self.prior.kappa_o() + n as f64;
        let mean = &self.mu_numer[k] / kappa;
        let scale = self.scale_of(&self.mu_numer[k], &self.s_partial[k], n);
        if ln_det_pd(&scale).is_none() {
            return Err(MixtureError::NotPositiveDefinite { k: Some(k) });
        }
        let posterior =
            NormalInvWishart::new(mean, kappa, self.prior.v_o() + n, scale)?;
        Ok(posterior)
    }

    /// Log evidence of the members of cluster `k` under the NIW prior
    pub fn log_marginal_k(&self, k: usize) -> Result<f64, MixtureError> {
        self.ensure_fresh()?;
        self.check_cluster(k)?;
        let n = self.counts[k];
        let scale = self.scale_of(&self.mu_numer[k], &self.s_partial[k], n);
        let term = self.ln_evidence_term(n, &scale, Some(k))?;
        Ok(term - self.prior.ln_evidence_norm())
    }

    /// Log posterior predictive of `x` under cluster `k`
    pub fn log_post_pred_k(
        &self,
        x: &DVector<f64>,
        k: usize,
    ) -> Result<f64, MixtureError> {
        self.ensure_fresh()?;
        self.check_dims(x)?;
        self.check_cluster(k)?;
        self.ln_pp_slot(x, k)
    }

    /// Log posterior predictive of `x` under every cluster
    pub fn log_post_pred(
        &self,
        x: &DVector<f64>,
    ) -> Result<Vec<f64>, MixtureError> {
        self.ensure_fresh()?;
        self.check_dims(x)?;
        (0..self.n_clusters).map(|k| self.ln_pp_slot(x, k)).collect()
    }

    /// Compute the prior predictive of every point
    pub fn update_data_priors(
        &mut self,
        data: &[DVector<f64>],
    ) -> Result<(), MixtureError> {
        self.check_data_len(data)?;
        let log_prior_x = data
            .iter()
            .map(|x| {
                self.check_dims(x)?;
                let mu_numer = self.prior.mu_numer_baseline() + x;
                let s_partial =
                    self.prior.s_partial_baseline() + x * x.transpose();
                let scale = self.scale_of(&mu_numer, &s_partial, 1);
                let term = self.ln_evidence_term(1, &scale, None)?;
                Ok(term - self.prior.ln_evidence_norm())
            })
            .collect::<Result<Vec<f64>, MixtureError>>()?;
        self.log_prior_x = log_prior_x;
        Ok(())
    }

    /// `true` if the prior predictive of every point is cached
    #[inline]
    pub fn has_data_priors(&self) -> bool {
        !self.log_prior_x.is_empty() && self.log_prior_x.len() == self.n
    }

    /// Drop the cached prior predictives
    #[inline]
    pub fn clear_data_priors(&mut self) {
        self.log_prior_x.clear();
    }

    /// Cached prior predictive of point `i`
    pub fn log_prior_x(&self, i: usize) -> Result<f64, MixtureError> {
        if self.log_prior_x.len() != self.n {
            return Err(MixtureError::DataPriorsMissing {
                expected: self.n,
                got: self.log_prior_x.len(),
            });
        }
        self.log_prior_x
            .get(i)
            .copied()
            .ok_or(MixtureError::PointIndexOutOfRange { ix: i, n: self.n })
    }

    /// Log probability of the assignments with the weights integrated out
    pub fn log_prior_z(&self) -> Result<f64, MixtureError> {
        if self.counts_stale {
            return Err(MixtureError::StaleCounts);
        }
        if self.k_max == 0 {
            return Err(MixtureError::ZeroCapacity);
        }
        let lambda = self.prior.lambda();
        let a = lambda / self.k_max as f64;
        let ln_gamma_a = a.ln_gamma().0;
        let n_assigned: usize = self.counts.iter().sum();

        let ln_p = self.counts().iter().fold(
            lambda.ln_gamma().0 - (n_assigned as f64 + lambda).ln_gamma().0,
            |acc, &ct| acc + (ct as f64 + a).ln_gamma().0 - ln_gamma_a,
        );
        Ok(ln_p)
    }

    /// Log marginal likelihood of the data and the assignments,
    /// ln p(X, Z)
    pub fn log_marginal(
        &mut self,
        data: &[DVector<f64>],
    ) -> Result<f64, MixtureError> {
        if !self.initialized && self.n_clusters == 0 {
            return Err(MixtureError::NoClusters);
        }
        self.refresh(data)?;
        if self.n_clusters == 0 {
            return Err(MixtureError::NoClusters);
        }
        (0..self.n_clusters)
            .try_fold(self.log_prior_z()?, |acc, k| {
                self.log_marginal_k(k).map(|ln_m| acc + ln_m)
            })
    }

    /// Resample the assignment of every point in random order with the
    /// weights and component parameters integrated out.
    pub fn collapsed_step<R: Rng>(
        &mut self,
        data: &[DVector<f64>],
        rng: &mut R,
    ) -> Result<(), MixtureError> {
        self.check_sweep(data)?;
        if self.log_prior_x.len() != self.n {
            return Err(MixtureError::DataPriorsMissing {
                expected: self.n,
                got: self.log_prior_x.len(),
            });
        }
        self.refresh(data)?;
        if let Some(ix) = self.assignments.iter().position(|z| z.is_none()) {
            return Err(MixtureError::Unassigned { ix });
        }

        let lambda = self.prior.lambda();
        let a = lambda / self.k_max as f64;
        let ln_a = a.ln();
        let ln_norm = (self.n as f64 + lambda - 1.0).ln();

        let mut order: Vec<usize> = (0..self.n).collect();
        order.shuffle(rng);

        let mut ln_weights = vec![0.0; self.k_max];

        for i in order {
            let x = &data[i];
            let c_old =
                self.assignments[i].ok_or(MixtureError::Unassigned { ix: i })?;
            let n_clusters_old = self.n_clusters;

            let mu_numer_old = self.mu_numer[c_old].clone();
            let s_partial_old = self.s_partial[c_old].clone();
            let count_old = self.counts[c_old];

            self.del_data_from_cluster(x, i, c_old)?;

            let n_clusters = self.n_clusters;
            for (k, ln_w) in ln_weights.iter_mut().enumerate() {
                *ln_w = if k < n_clusters {
                    (self.counts[k] as f64 + a).ln() - ln_norm
                        + self.ln_pp_slot(x, k)?
                } else {
                    ln_a - ln_norm + self.log_prior_x[i]
                };
            }

            let draw = ln_pflip(&ln_weights, 1, false, rng)[0];
            let c_new = if draw < n_clusters {
                draw
            } else {
                match self.birth_policy {
                    BirthPolicy::Spawn => n_clusters,
                    BirthPolicy::FoldIntoLast => n_clusters.saturating_sub(1),
                }
            };

            if c_new == c_old && self.n_clusters == n_clusters_old {
                self.mu_numer[c_old] = mu_numer_old;
                self.s_partial[c_old] = s_partial_old;
                self.counts[c_old] = count_old;
                self.assignments[i] = Some(c_old);
            } else {
                self.add_data_to_cluster(x, i, c_new)?;
            }
        }

        Ok(())
    }

    /// Log likelihood of the data under the explicit component
    /// distributions of their clusters
    pub fn log_prob_given_cluster(
        &self,
        data: &[DVector<f64>],
    ) -> Result<f64, MixtureError> {
        self.check_data_len(data)?;
        if self.mixture_dists.is_empty() {
            return Err(MixtureError::MissingParameters);
        }
        self.assignments
            .iter()
            .zip(data.iter())
            .enumerate()
            .try_fold(0.0, |acc, (ix, (z, x))| {
                let k = z.ok_or(MixtureError::Unassigned { ix })?;
                let dist = self.mixture_dists.get(k).ok_or(
                    MixtureError::ParameterLengthMismatch {
                        expected: k + 1,
                        got: self.mixture_dists.len(),
                    },
                )?;
                Ok(acc + dist.ln_f(x))
            })
    }

    /// ln p(weights | λ) + ln p(Z | weights) + Σ<sub>k</sub> ln NIW(μ<sub>k</sub>, Σ<sub>k</sub>)
    /// under the explicit parameters
    pub fn log_hyper_prior(&self) -> Result<f64, MixtureError> {
        self.check_explicit_params()?;
        let k = self.mixture_weights.len();
        let weights_prior =
            SymmetricDirichlet::new_unchecked(self.prior.lambda() / k as f64, k);

        let ln_p_weights = weights_prior.ln_f(&self.mixture_weights);

        let ln_p_z = self.assignments.iter().enumerate().try_fold(
            0.0,
            |acc, (ix, z)| {
                let k = z.ok_or(MixtureError::Unassigned { ix })?;
                let w = self.mixture_weights.get(k).ok_or(
                    MixtureError::ParameterLengthMismatch {
                        expected: k + 1,
                        got: self.mixture_weights.len(),
                    },
                )?;
                Ok::<f64, MixtureError>(acc + w.ln())
            },
        )?;

        let ln_p_dists: f64 = self
            .mixture_dists
            .iter()
            .map(|dist| self.prior.niw().ln_f(dist))
            .sum();

        Ok(ln_p_weights + ln_p_z + ln_p_dists)
    }

    /// Draw explicit component parameters from each cluster posterior
    pub fn update_params<R: Rng>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), MixtureError> {
        self.ensure_fresh()?;
        if self.n_clusters == 0 {
            return Err(MixtureError::NoClusters);
        }
        let mut dists = Vec::with_capacity(self.n_clusters);
        for k in 0..self.n_clusters {
            let posterior = self.posterior(k)?;
            dists.push(posterior.draw(rng));
        }
        self.mixture_dists = dists;
        Ok(())
    }

    /// Average `num_samples` posterior draws of each cluster's mean and
    /// covariance
    pub fn estimate_dist_params<R: Rng>(
        &self,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<MvGaussian>, MixtureError> {
        if num_samples == 0 {
            return Err(MixtureError::ZeroSamples);
        }
        self.ensure_fresh()?;
        let d = self.ndims();
        let nf = num_samples as f64;

        (0..self.n_clusters)
            .map(|k| {
                let posterior = self.posterior(k)?;
                let (mu, cov) = posterior.sample(num_samples, rng).iter().fold(
                    (DVector::zeros(d), DMatrix::zeros(d, d)),
                    |(mu, cov), dist| (mu + dist.mu(), cov + dist.cov()),
                );
                Ok(MvGaussian::new(mu / nf, cov / nf)?)
            })
            .collect()
    }

    /// Draw the explicit weights from their Dirichlet posterior
    pub fn update_mixture_weights<R: Rng>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), MixtureError> {
        self.mixture_weights = self.weights_posterior()?.draw(rng);
        Ok(())
    }

    /// Average `num_samples` draws from the weights posterior
    pub fn estimate_mixture_weights<R: Rng>(
        &self,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<f64>, MixtureError> {
        if num_samples == 0 {
            return Err(MixtureError::ZeroSamples);
        }
        let posterior = self.weights_posterior()?;
        let nf = num_samples as f64;
        let mut weights = vec![0.0; posterior.k()];
        for draw in posterior.sample(num_samples, rng) {
            weights.iter_mut().zip(draw).for_each(|(w, x)| *w += x / nf);
        }
        Ok(weights)
    }

    /// Draw `k` explicit weights from the symmetric Dirichlet prior
    pub fn generate_mixture_weights<R: Rng>(
        &mut self,
        k: usize,
        rng: &mut R,
    ) -> Result<(), MixtureError> {
        self.check_generate_count(k)?;
        let weights_prior =
            SymmetricDirichlet::new_unchecked(self.prior.lambda() / k as f64, k);
        self.mixture_weights = weights_prior.draw(rng);
        Ok(())
    }

    /// Draw `k` explicit component distributions from the NIW prior
    pub fn generate_mixture_distributions_from_prior<R: Rng>(
        &mut self,
        k: usize,
        rng: &mut R,
    ) -> Result<(), MixtureError> {
        self.check_generate_count(k)?;
        self.mixture_dists = self.prior.niw().sample(k, rng);
        Ok(())
    }

    /// Simulate `num_samples` points and their cluster labels from the
    /// explicit parameters, drawing any that are absent from the prior.
    pub fn generate_cluster_samples<R: Rng>(
        &mut self,
        num_samples: usize,
        rng: &mut R,
    ) -> Result<(Vec<DVector<f64>>, Vec<usize>), MixtureError> {
        let k = if !self.mixture_weights.is_empty() {
            self.mixture_weights.len()
        } else if !self.mixture_dists.is_empty() {
            self.mixture_dists.len()
        } else if self.n_clusters > 0 {
            self.n_clusters
        } else {
            return Err(MixtureError::NoClusters);
        };

        if self.mixture_weights.is_empty() {
            self.generate_mixture_weights(k, rng)?;
        }
        if self.mixture_dists.is_empty() {
            self.generate_mixture_distributions_from_prior(k, rng)?;
        }
        self.check_explicit_params()?;

        let ln_weights: Vec<f64> =
            self.mixture_weights.iter().map(|w| w.ln()).collect();
        let labels = ln_pflip(&ln_weights, num_samples, false, rng);
        let samples = labels
            .iter()
            .map(|&z| self.mixture_dists[z].draw(rng))
            .collect();

        Ok((samples, labels))
    }

    /// p(z = k | x, weights, μ, Σ) for every cluster
    pub fn get_responsibilities(
        &self,
        x: &DVector<f64>,
    ) -> Result<Vec<f64>, MixtureError> {
        let ln_resps = self.ln_responsibilities(x)?;
        let ln_z = logsumexp(&ln_resps);
        Ok(ln_resps.iter().map(|r| (r - ln_z).exp()).collect())
    }

    /// Draw a cluster for `x` in proportion to its responsibilities
    pub fn get_assignment<R: Rng>(
        &self,
        x: &DVector<f64>,
        rng: &mut R,
    ) -> Result<usize, MixtureError> {
        let ln_resps = self.ln_responsibilities(x)?;
        Ok(ln_pflip(&ln_resps, 1, false, rng)[0])
    }

    /// Redraw every assignment from the responsibilities, then update the
    /// counts and the cluster cache.
    pub fn update_assignments<R: Rng>(
        &mut self,
        data: &[DVector<f64>],
        rng: &mut R,
    ) -> Result<(), MixtureError> {
        self.check_data_len(data)?;
        let labels = data
            .iter()
            .map(|x| self.get_assignment(x, rng))
            .collect::<Result<Vec<usize>, MixtureError>>()?;

        self.assignments = labels.into_iter().map(Some).collect();
        self.initialized = true;
        self.counts_stale = true;
        self.cache_dirty = true;
        self.update_counts();
        self.update_cluster_cache(data)
    }

    fn ln_responsibilities(
        &self,
        x: &DVector<f64>,
    ) -> Result<Vec<f64>, MixtureError> {
        self.check_explicit_params()?;
        self.check_dims(x)?;
        Ok(self
            .mixture_weights
            .iter()
            .zip(self.mixture_dists.iter())
            .map(|(w, dist)| w.ln() + dist.ln_f(x))
            .collect())
    }

    fn weights_posterior(&self) -> Result<Dirichlet, MixtureError> {
        if self.counts_stale {
            return Err(MixtureError::StaleCounts);
        }
        if self.n_clusters == 0 {
            return Err(MixtureError::NoClusters);
        }
        let k = self.n_clusters;
        let weights_prior =
            SymmetricDirichlet::new_unchecked(self.prior.lambda() / k as f64, k);
        Ok(Dirichlet::from_counts(&weights_prior, self.counts())?)
    }

    // ln p(x | members of k) without freshness checks
    fn ln_pp_slot(
        &self,
        x: &DVector<f64>,
        k: usize,
    ) -> Result<f64, MixtureError> {
        let n = self.counts[k];
        let scale = self.scale_of(&self.mu_numer[k], &self.s_partial[k], n);

        let mu_numer_x = &self.mu_numer[k] + x;
        let s_partial_x = &self.s_partial[k] + x * x.transpose();
        let scale_x = self.scale_of(&mu_numer_x, &s_partial_x, n + 1);

        let ln_with = self.ln_evidence_term(n + 1, &scale_x, Some(k))?;
        let ln_without = self.ln_evidence_term(n, &scale, Some(k))?;
        Ok(ln_with - ln_without)
    }

    // -nD/2 ln π - D/2 ln κ - ν/2 ln|S| + Σ_j ln Γ((ν + 1 - j)/2)
    fn ln_evidence_term(
        &self,
        n: usize,
        scale: &DMatrix<f64>,
        k: Option<usize>,
    ) -> Result<f64, MixtureError> {
        let d = self.ndims();
        let df = d as f64;
        let kappa = self.prior.kappa_o() + n as f64;
        let nu = (self.prior.v_o() + n) as f64;
        let ln_det =
            ln_det_pd(scale).ok_or(MixtureError::NotPositiveDefinite { k })?;
        let ln_gammas: f64 = (1..=d).map(|j| self.ln_gamma_nu(n, j)).sum();

        Ok(-(n as f64) * df / 2.0 * LN_PI - df / 2.0 * kappa.ln()
            - nu / 2.0 * ln_det
            + ln_gammas)
    }

    // ln Γ((ν₀ + n + 1 - j)/2)
    #[inline]
    fn ln_gamma_nu(&self, n: usize, j: usize) -> f64 {
        let m = n + self.ndims() - j;
        match self.ln_gamma_table.get(m) {
            Some(&ln_g) => ln_g,
            None => (((self.prior.v_o() + n + 1 - j) as f64) / 2.0)
                .ln_gamma()
                .0,
        }
    }

    // S_n = s_partial - κ_n μ_n μ_nᵀ with μ_n = mu_numer / κ_n
    fn scale_of(
        &self,
        mu_numer: &DVector<f64>,
        s_partial: &DMatrix<f64>,
        n: usize,
    ) -> DMatrix<f64> {
        let kappa = self.prior.kappa_o() + n as f64;
        s_partial - (mu_numer * mu_numer.transpose()) / kappa
    }

    fn reset_slot(&mut self, k: usize) {
        self.mu_numer[k].copy_from(self.prior.mu_numer_baseline());
        self.s_partial[k].copy_from(self.prior.s_partial_baseline());
    }

    // Move the statistics and members of `from` into the empty slot `to`
    fn move_slot(&mut self, from: usize, to: usize) {
        self.mu_numer.swap(to, from);
        self.s_partial.swap(to, from);
        self.counts[to] = self.counts[from];
        self.counts[from] = 0;
        self.reset_slot(from);
        for z in self.assignments.iter_mut().filter(|z| **z == Some(from)) {
            *z = Some(to);
        }
    }

    // Drop explicit parameters of vanished clusters
    fn fit_explicit_params(&mut self) {
        let k = self.n_clusters;
        if self.mixture_dists.len() > k {
            self.mixture_dists.truncate(k);
        }
        if self.mixture_weights.len() > k {
            self.mixture_weights.truncate(k);
            normalize(&mut self.mixture_weights);
        }
        if (!self.mixture_dists.is_empty() && self.mixture_dists.len() != k)
            || (!self.mixture_weights.is_empty()
                && self.mixture_weights.len() != k)
        {
            debug!("explicit parameters no longer match {} clusters", k);
            self.mixture_dists.clear();
            self.mixture_weights.clear();
        }
    }

    fn ensure_fresh(&self) -> Result<(), MixtureError> {
        if self.counts_stale {
            Err(MixtureError::StaleCounts)
        } else if self.cache_dirty {
            Err(MixtureError::StaleCache)
        } else {
            Ok(())
        }
    }

    fn check_cluster(&self, k: usize) -> Result<(), MixtureError> {
        if k < self.n_clusters {
            Ok(())
        } else {
            Err(MixtureError::ClusterIndexOutOfRange {
                k,
                n_clusters: self.n_clusters,
            })
        }
    }

    fn check_dims(&self, x: &DVector<f64>) -> Result<(), MixtureError> {
        if x.len() == self.ndims() {
            Ok(())
        } else {
            Err(MixtureError::DimensionMismatch {
                expected: self.ndims(),
                got: x.len(),
            })
        }
    }

    fn check_point(&self, x: &DVector<f64>, i: usize) -> Result<(), MixtureError> {
        if i >= self.n {
            return Err(MixtureError::PointIndexOutOfRange { ix: i, n: self.n });
        }
        self.check_dims(x)
    }

    fn check_data_len(&self, data: &[DVector<f64>]) -> Result<(), MixtureError> {
        if data.len() == self.n {
            Ok(())
        } else {
            Err(MixtureError::DataLengthMismatch {
                expected: self.n,
                got: data.len(),
            })
        }
    }

    fn check_sweep(&self, data: &[DVector<f64>]) -> Result<(), MixtureError> {
        if self.n == 0 {
            Err(MixtureError::EmptyData)
        } else if self.k_max == 0 {
            Err(MixtureError::ZeroCapacity)
        } else {
            self.check_data_len(data)
        }
    }

    fn check_generate_count(&self, k: usize) -> Result<(), MixtureError> {
        if k == 0 || k > self.k_max {
            Err(MixtureError::InvalidClusterCount {
                k,
                k_max: self.k_max,
            })
        } else {
            Ok(())
        }
    }

    fn check_explicit_params(&self) -> Result<(), MixtureError> {
        if self.mixture_weights.is_empty() || self.mixture_dists.is_empty() {
            Err(MixtureError::MissingParameters)
        } else if self.mixture_weights.len() != self.mixture_dists.len() {
            Err(MixtureError::ParameterLengthMismatch {
                expected: self.mixture_weights.len(),
                got: self.mixture_dists.len(),
            })
        } else {
            Ok(())
        }
    }
}

fn normalize(weights: &mut [f64]) {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.iter_mut().for_each(|w| *w /= total);
    }
}
