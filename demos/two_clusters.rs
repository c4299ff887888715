//! Sample the partition of two simulated groups with the collapsed sampler
use gaussmix::prelude::*;
use nalgebra::{dvector, DMatrix, DVector};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn main() -> Result<(), MixtureError> {
    let mut rng = Xoshiro256Plus::seed_from_u64(0x1234);

    let prior = MixturePrior::new(
        1.0,
        dvector![0.0, 0.0],
        0.1,
        DMatrix::identity(2, 2),
        3,
    )?;

    // simulate two groups through the mixture's own generator
    let group_cov = DMatrix::identity(2, 2) * 0.25;
    let mut sim = MixtureState::with_capacity(prior.clone(), 2, 2);
    sim.add_data_to_cluster(&dvector![-4.0, 0.0], 0, 0)?;
    sim.add_data_to_cluster(&dvector![4.0, 0.0], 1, 1)?;
    sim.set_mixture_distributions(vec![
        MvGaussian::new(dvector![-4.0, 0.0], group_cov.clone())?,
        MvGaussian::new(dvector![4.0, 0.0], group_cov)?,
    ])?;
    sim.set_mixture_weights(vec![0.4, 0.6])?;
    let (data, labels): (Vec<DVector<f64>>, Vec<usize>) =
        sim.generate_cluster_samples(100, &mut rng)?;

    let state = MixtureState::with_capacity(prior, data.len(), 10);
    let mut gibbs = GibbsStep::new(5, state, GibbsConfig::default(), &mut rng)?;

    for sweep in 0..100 {
        let ln_p = gibbs.step(&data, &mut rng)?;
        if sweep % 10 == 0 {
            println!(
                "sweep {:3}: K = {}, ln p(X, Z) = {:.3}",
                sweep,
                gibbs.state().get_num_clusters(),
                ln_p
            );
        }
    }

    let state = gibbs.state();
    println!("cluster sizes: {:?}", state.counts());

    // fraction of point pairs on which the sample and the truth agree
    let z = state.assignments();
    let (mut agree, mut total) = (0_usize, 0_usize);
    for i in 0..data.len() {
        for j in (i + 1)..data.len() {
            total += 1;
            if (labels[i] == labels[j]) == (z[i] == z[j]) {
                agree += 1;
            }
        }
    }
    println!("rand index: {:.3}", agree as f64 / total as f64);

    Ok(())
}
