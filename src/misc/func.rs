use crate::consts::LN_PI;
use itertools::Itertools;
use nalgebra::DMatrix;
use rand::distributions::Open01;
use rand::Rng;
use special::Gamma;
use std::fmt::Debug;

/// Render a slice for display, eliding the middle of long slices.
///
/// At most `max_entries` items are shown. When there are more, the last
/// item is kept and the gap is marked with `...`.
///
/// # Example
///
/// ```rust
/// # use gaussmix::misc::vec_to_string;
/// let xs: Vec<u8> = vec![0, 1, 2, 3, 4, 5];
///
/// assert_eq!(vec_to_string(&xs, 6).as_str(), "[0, 1, 2, 3, 4, 5]");
/// assert_eq!(vec_to_string(&xs, 5).as_str(), "[0, 1, 2, 3, ... , 5]");
/// assert_eq!(vec_to_string(&xs[..2], 5).as_str(), "[0, 1]");
/// ```
pub fn vec_to_string<T: Debug>(xs: &[T], max_entries: usize) -> String {
    let show = |ys: &[T]| ys.iter().map(|y| format!("{:?}", y)).join(", ");
    let body = match xs.split_last() {
        Some((last, init)) if xs.len() > max_entries && max_entries > 1 => {
            format!("{}, ... , {:?}", show(&init[..max_entries - 1]), last)
        }
        _ => show(xs),
    };
    format!("[{}]", body)
}

/// ln Σ exp(x<sub>i</sub>), shifted by the maximum to avoid overflow
///
/// # Panics
///
/// If `xs` is empty
pub fn logsumexp(xs: &[f64]) -> f64 {
    assert!(!xs.is_empty(), "logsumexp of an empty slice");
    if xs.len() == 1 {
        return xs[0];
    }

    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + xs.iter().map(|&x| (x - max).exp()).sum::<f64>().ln()
}

// First index whose cumulative weight exceeds `r`
#[inline]
fn catflip(cws: &[f64], r: f64) -> Option<usize> {
    let ix = cws.partition_point(|&w| w <= r);
    (ix < cws.len()).then_some(ix)
}

/// Draw `n` indices from the categorical distribution with log weights
/// `ln_weights`.
///
/// If `normed` is `true`, exp(`ln_weights`) is taken to already sum to one;
/// otherwise the weights are normalized first.
///
/// # Examples
///
/// ```rust
/// use gaussmix::misc::ln_pflip;
///
/// let weights: Vec<f64> = vec![0.4, 0.2, 0.3, 0.1];
/// let ln_weights: Vec<f64> = weights.iter().map(|&w| w.ln()).collect();
///
/// let xs = ln_pflip(&ln_weights, 100, true, &mut rand::thread_rng());
///
/// assert_eq!(xs.len(), 100);
/// assert!(xs.iter().all(|&x| x <= 3));
/// ```
pub fn ln_pflip<R: Rng>(
    ln_weights: &[f64],
    n: usize,
    normed: bool,
    rng: &mut R,
) -> Vec<usize> {
    let ln_z = if normed { 0.0 } else { logsumexp(ln_weights) };

    let cws: Vec<f64> = ln_weights
        .iter()
        .scan(0.0, |total, &w| {
            *total += (w - ln_z).exp();
            Some(*total)
        })
        .collect();

    // rounding may leave the total just under one; the remainder goes to
    // the last index with positive weight
    let fallback = ln_weights
        .iter()
        .rposition(|&w| w > f64::NEG_INFINITY)
        .unwrap_or_else(|| cws.len().saturating_sub(1));

    (0..n)
        .map(|_| catflip(&cws, rng.sample(Open01)).unwrap_or(fallback))
        .collect()
}

/// ln Γ<sub>p</sub>(a), the log of the multivariate gamma function
pub fn lnmv_gamma(p: usize, a: f64) -> f64 {
    let pf = p as f64;
    let ln_pi_term = pf * (pf - 1.0) / 4.0 * LN_PI;
    ln_pi_term
        + (0..p)
            .map(|j| (a - j as f64 / 2.0).ln_gamma().0)
            .sum::<f64>()
}

/// ln |M| of a symmetric positive-definite matrix through its Cholesky
/// factor. Returns `None` if `M` is not positive definite.
///
/// # Example
///
/// ```rust
/// # use gaussmix::misc::ln_det_pd;
/// use nalgebra::DMatrix;
///
/// let m = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 3.0]);
/// assert::close(ln_det_pd(&m).unwrap(), 6.0_f64.ln(), 1E-12);
///
/// let bad = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
/// assert!(ln_det_pd(&bad).is_none());
/// ```
pub fn ln_det_pd(m: &DMatrix<f64>) -> Option<f64> {
    m.clone().cholesky().map(|chol| {
        2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>()
    })
}
