use approx::assert_relative_eq;
use gaussmix::prelude::*;
use nalgebra::{dvector, DMatrix, DVector};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use special::Gamma as _;

fn two_groups() -> Vec<DVector<f64>> {
    vec![
        dvector![0.0, 0.1],
        dvector![0.1, -0.1],
        dvector![-0.1, 0.0],
        dvector![10.0, 10.1],
        dvector![10.1, 9.9],
        dvector![9.9, 10.0],
    ]
}

fn tight_prior() -> MixturePrior {
    MixturePrior::new(
        2.0,
        dvector![5.0, 5.0],
        0.01,
        DMatrix::identity(2, 2) * 0.1,
        4,
    )
    .unwrap()
}

// Clusters as sets of point indices, independent of labels
fn partition_of(state: &MixtureState) -> Vec<Vec<usize>> {
    let mut blocks = state.clusters();
    blocks.sort();
    blocks
}

fn brute_force_log_marginal(
    state: &MixtureState,
    data: &[DVector<f64>],
) -> f64 {
    let prior = state.prior();
    let lambda = prior.lambda();
    let a = lambda / state.k_max() as f64;
    let blocks = state.clusters();
    let n: usize = blocks.iter().map(|b| b.len()).sum();

    let ln_p_z = blocks.iter().fold(
        lambda.ln_gamma().0 - (n as f64 + lambda).ln_gamma().0,
        |acc, b| acc + (b.len() as f64 + a).ln_gamma().0 - a.ln_gamma().0,
    );

    let ln_p_x: f64 = blocks
        .iter()
        .map(|b| {
            let xs: Vec<DVector<f64>> =
                b.iter().map(|&ix| data[ix].clone()).collect();
            prior.niw().ln_m(&MvGaussianData::Data(&xs))
        })
        .sum();

    ln_p_z + ln_p_x
}

#[test]
fn collapsed_sampler_recovers_two_groups() {
    let data = two_groups();
    let truth = vec![vec![0, 1, 2], vec![3, 4, 5]];

    let n_recovered = (0..50_u64)
        .filter(|&seed| {
            let mut rng = Xoshiro256Plus::seed_from_u64(seed);
            let state = MixtureState::new(tight_prior(), data.len());
            let mut gibbs =
                GibbsStep::new(3, state, GibbsConfig::default(), &mut rng)
                    .unwrap();
            for _ in 0..200 {
                gibbs.step(&data, &mut rng).unwrap();
            }
            partition_of(gibbs.state()) == truth
        })
        .count();

    assert!(n_recovered >= 48, "recovered {} of 50", n_recovered);
}

#[test]
fn log_marginal_matches_brute_force() {
    let mut rng = Xoshiro256Plus::seed_from_u64(0x1234);
    let data: Vec<DVector<f64>> = MvGaussian::new(
        dvector![1.0, -1.0],
        DMatrix::from_row_slice(2, 2, &[2.0, 0.3, 0.3, 1.0]),
    )
    .unwrap()
    .sample(15, &mut rng);
    let prior = MixturePrior::new(
        1.5,
        dvector![0.0, 0.0],
        0.5,
        DMatrix::identity(2, 2),
        3,
    )
    .unwrap();

    for seed in 0..20_u64 {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let state = MixtureState::with_capacity(prior.clone(), data.len(), 5);
        let mut gibbs =
            GibbsStep::new(4, state, GibbsConfig::default(), &mut rng).unwrap();
        for _ in 0..(seed as usize % 5) {
            gibbs.step(&data, &mut rng).unwrap();
        }

        let mut state = gibbs.into_state();
        let ln_m = state.log_marginal(&data).unwrap();
        let expected = brute_force_log_marginal(&state, &data);
        assert_relative_eq!(ln_m, expected, max_relative = 1E-6);
    }
}

#[test]
fn uncollapsed_sampler_keeps_parameters_aligned() {
    let data = two_groups();
    let mut rng = Xoshiro256Plus::seed_from_u64(0xABCD);
    let state = MixtureState::new(tight_prior(), data.len());
    let config = GibbsConfig::default().with_collapsed(false);
    let mut gibbs = GibbsStep::new(2, state, config, &mut rng).unwrap();

    for _ in 0..50 {
        let ln_p = gibbs.step(&data, &mut rng).unwrap();
        assert!(ln_p.is_finite());

        let state = gibbs.state();
        let k = state.get_num_clusters();
        assert!(k >= 1 && k <= 2);
        assert_eq!(state.mixture_dists().len(), k);
        assert_relative_eq!(
            state.mixture_weights().iter().sum::<f64>(),
            1.0,
            epsilon = 1E-10
        );
        assert_eq!(state.counts().iter().sum::<usize>(), data.len());
    }
}

#[test]
fn generated_samples_follow_their_components() {
    let mut rng = Xoshiro256Plus::seed_from_u64(0x5EED);
    let mut state = MixtureState::new(tight_prior(), 4);
    let dists = vec![
        MvGaussian::new(dvector![-5.0, 0.0], DMatrix::identity(2, 2) * 0.01)
            .unwrap(),
        MvGaussian::new(dvector![5.0, 0.0], DMatrix::identity(2, 2) * 0.01)
            .unwrap(),
    ];
    state.generate_mixture_weights(2, &mut rng).unwrap();
    state.generate_mixture_distributions_from_prior(2, &mut rng).unwrap();
    assert_eq!(state.mixture_dists().len(), 2);

    let mut state = MixtureState::new(tight_prior(), 4);
    for (i, x) in [dvector![-5.0, 0.0], dvector![5.0, 0.0]]
        .iter()
        .enumerate()
    {
        state.add_data_to_cluster(x, i, i).unwrap();
    }
    state.set_mixture_distributions(dists).unwrap();
    state.set_mixture_weights(vec![1.0, 3.0]).unwrap();

    let (xs, zs) = state.generate_cluster_samples(200, &mut rng).unwrap();
    for (x, &z) in xs.iter().zip(zs.iter()) {
        assert_eq!(x[0] > 0.0, z == 1);
    }
    let n_second = zs.iter().filter(|&&z| z == 1).count();
    assert!(n_second > 120 && n_second < 180);
}
