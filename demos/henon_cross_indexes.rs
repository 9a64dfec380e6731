//! Co-recurrence between two coupled views of the Hénon attractor.
//!
//! Variable 0 is the Hénon orbit itself; variable 1 is the same orbit
//! shifted by one iteration. α(0, 1) measures how often a recurrence of
//! the current state is also a recurrence of the next one.
//!
//! Run with: cargo run --release --example henon_cross_indexes

use localdim_rs::{
    DynamicalSystem, Henon, IndexConfig, IndexEngine, MetricKind, PointSet, ThetaMethod,
};
use ndarray::{s, Array3};
use rand::SeedableRng;

fn main() {
    let n = 2_000;
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let orbit = Henon::default().orbit(&vec![0.0; n + 501], &mut rng).unwrap();
    let orbit = orbit.slice(s![500.., ..]).to_owned();

    let data = Array3::from_shape_fn((n, 2, 2), |(i, k, v)| orbit[[i + v, k]]);
    let points = PointSet::new(data).unwrap();

    let metric: MetricKind = "euclidean".parse().unwrap();
    let config = IndexConfig::new(0.98).with_theta_method(ThetaMethod::Ferro);
    let engine = IndexEngine::with_metric(metric, |a: f64, b: f64| a.max(b), config);
    let out = engine.compute(&points).unwrap();

    println!("Hénon cross-variable indexes (metric: {metric}, cross: max)");
    println!("===========================================================");
    println!("{:>8}  {:>8}  {:>8}  {:>8}", "pair", "mean d", "mean θ", "mean α");
    println!("{:-<40}", "");
    for (pair, _) in out.local_dim.pairs() {
        let (i, j) = (pair.lo(), pair.hi());
        println!(
            "{:>8}  {:>8.3}  {:>8.3}  {:>8.3}",
            format!("({i}, {j})"),
            out.local_dim.finite_mean(i, j),
            out.theta.finite_mean(i, j),
            out.alpha.finite_mean(i, j)
        );
    }

    let failed: usize = out.chunks.values().flatten().map(|c| c.failed_rows).sum();
    println!("\nrows without a local dimension: {failed}");
}
