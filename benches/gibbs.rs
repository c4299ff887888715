use criterion::black_box;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};
use gaussmix::prelude::*;
use nalgebra::{dvector, DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn data_fxtr(n: usize, rng: &mut SmallRng) -> Vec<DVector<f64>> {
    let left =
        MvGaussian::new(dvector![-3.0, 0.0], DMatrix::identity(2, 2)).unwrap();
    let right =
        MvGaussian::new(dvector![3.0, 0.0], DMatrix::identity(2, 2)).unwrap();
    let mut xs = left.sample(n / 2, rng);
    xs.extend(right.sample(n - n / 2, rng));
    xs
}

fn prior_fxtr() -> MixturePrior {
    MixturePrior::new(
        1.0,
        dvector![0.0, 0.0],
        0.1,
        DMatrix::identity(2, 2),
        3,
    )
    .unwrap()
}

fn bench_collapsed_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("collapsed sweep, 2 dims");
    for n in [50, 200, 500] {
        group.bench_with_input(format!("{} points", n), &n, |b, &n| {
            let mut rng = SmallRng::seed_from_u64(0x1234);
            let data = data_fxtr(n, &mut rng);
            let state = MixtureState::with_capacity(prior_fxtr(), n, 10);
            let mut gibbs =
                GibbsStep::new(4, state, GibbsConfig::default(), &mut rng)
                    .unwrap();
            gibbs.step(&data, &mut rng).unwrap();
            b.iter(|| black_box(gibbs.step(&data, &mut rng).unwrap()))
        });
    }
}

fn bench_uncollapsed_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncollapsed sweep, 2 dims");
    for n in [50, 200, 500] {
        group.bench_with_input(format!("{} points", n), &n, |b, &n| {
            let mut rng = SmallRng::seed_from_u64(0x1234);
            let data = data_fxtr(n, &mut rng);
            let config = GibbsConfig::default().with_collapsed(false);
            b.iter_batched_ref(
                || {
                    let state =
                        MixtureState::with_capacity(prior_fxtr(), n, 10);
                    GibbsStep::new(4, state, config, &mut rng).unwrap()
                },
                |gibbs| {
                    let mut rng = SmallRng::seed_from_u64(0xABCD);
                    black_box(gibbs.step(&data, &mut rng).unwrap())
                },
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_log_marginal(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(0x1234);
    let data = data_fxtr(200, &mut rng);
    let state = MixtureState::with_capacity(prior_fxtr(), 200, 10);
    let mut gibbs =
        GibbsStep::new(4, state, GibbsConfig::default(), &mut rng).unwrap();
    gibbs.step(&data, &mut rng).unwrap();
    let mut state = gibbs.into_state();

    c.bench_function("log marginal, 200 points", |b| {
        b.iter(|| black_box(state.log_marginal(&data).unwrap()))
    });
}

criterion_group!(
    gibbs_benches,
    bench_collapsed_sweep,
    bench_uncollapsed_sweep,
    bench_log_marginal
);
criterion_main!(gibbs_benches);
