use approx::assert_relative_eq;
use gaussmix::prelude::*;
use nalgebra::{dvector, DMatrix, DVector};
use proptest::prelude::*;

const N: usize = 8;

fn prior() -> MixturePrior {
    MixturePrior::new(
        1.0,
        dvector![0.0, 0.0],
        0.5,
        DMatrix::identity(2, 2),
        3,
    )
    .unwrap()
}

fn points() -> impl Strategy<Value = Vec<DVector<f64>>> {
    prop::collection::vec((-5.0_f64..5.0, -5.0_f64..5.0), N)
        .prop_map(|xys| xys.into_iter().map(|(x, y)| dvector![x, y]).collect())
}

fn moves() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..N, 0..N), 0..40)
}

proptest! {
    #[test]
    fn incremental_statistics_match_a_rebuild(
        data in points(),
        moves in moves(),
    ) {
        let mut state = MixtureState::new(prior(), N);

        for (ix, target) in moves {
            if let Some(k) = state.assignments()[ix] {
                state.del_data_from_cluster(&data[ix], ix, k).unwrap();
            }
            let n_clusters = state.get_num_clusters();
            let k = (target % (n_clusters + 1)).min(state.k_max() - 1);
            state.add_data_to_cluster(&data[ix], ix, k).unwrap();
        }

        let n_clusters = state.get_num_clusters();
        prop_assert_eq!(
            state.counts().iter().sum::<usize>(),
            state.n_assigned()
        );
        prop_assert!(state.counts().iter().all(|&ct| ct > 0));

        let incremental: Vec<(MvGaussianSuffStat, f64)> = (0..n_clusters)
            .map(|k| {
                (
                    state.cluster_suffstat(k).unwrap(),
                    state.log_marginal_k(k).unwrap(),
                )
            })
            .collect();

        state.invalidate();
        state.refresh(&data).unwrap();

        for (k, (stat, ln_m)) in incremental.iter().enumerate() {
            let rebuilt = state.cluster_suffstat(k).unwrap();
            prop_assert_eq!(rebuilt.n(), stat.n());
            for (a, b) in rebuilt.sum_x().iter().zip(stat.sum_x().iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1E-8, max_relative = 1E-8);
            }
            for (a, b) in rebuilt.sum_x_sq().iter().zip(stat.sum_x_sq().iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1E-8, max_relative = 1E-8);
            }
            assert_relative_eq!(
                state.log_marginal_k(k).unwrap(),
                *ln_m,
                epsilon = 1E-8,
                max_relative = 1E-8
            );
        }
    }
}
