//! Local dimension and persistence along a Lorenz63 trajectory.
//!
//! Integrates the Lorenz system, samples the attractor every 0.05 time
//! units and estimates, for every sample, the local dimension (GPD fit of
//! the log-distance tail) and the extremal index θ.
//!
//! Run with: cargo run --release --example lorenz_indexes

use localdim_rs::systems::time_grid;
use localdim_rs::{DynamicalSystem, EuclideanEngine, FitMethod, IndexConfig, Lorenz63, PointSet};
use ndarray::s;

fn main() {
    let n = 3_000;
    let stride = 5;
    let transient = 2_000;

    let times = time_grid(0.0, 0.01, transient + n * stride);
    let orbit = Lorenz63::default()
        .solve(&[1.0, 1.0, 20.0], &times)
        .unwrap();
    let orbit = orbit.slice(s![transient..;stride, ..]).to_owned();
    let points = PointSet::from_2d(orbit.clone()).unwrap();

    println!("Lorenz63 local indexes");
    println!("======================");
    println!("{n} samples, dt = {:.2}\n", 0.01 * stride as f64);

    for method in [FitMethod::Primary, FitMethod::Mean] {
        let config = IndexConfig::default().with_fit_method(method).with_shape(true);
        let engine = EuclideanEngine::new(config);
        let out = engine.compute(&points).unwrap();

        let ld = out.local_dim.get(0, 0).unwrap();
        let theta = out.theta.get(0, 0).unwrap();
        let shape = out.shape.as_ref().unwrap().get(0, 0).unwrap();
        println!(
            "{method:>8}: mean d = {:.3}, mean θ = {:.3}, mean ξ = {:+.3}, workers complete: {}",
            out.local_dim.finite_mean(0, 0),
            out.theta.finite_mean(0, 0),
            shape.iter().filter(|v| v.is_finite()).sum::<f64>()
                / shape.iter().filter(|v| v.is_finite()).count().max(1) as f64,
            out.is_complete()
        );

        if method == FitMethod::Primary {
            println!("\n{:>6}  {:>8}  {:>8}  {:>8}  {:>6}  {:>6}", "Index", "x", "y", "z", "d", "θ");
            println!("{:-<52}", "");
            for i in (0..n).step_by(n / 10) {
                println!(
                    "{i:>6}  {:>8.2}  {:>8.2}  {:>8.2}  {:>6.2}  {:>6.2}",
                    orbit[[i, 0]],
                    orbit[[i, 1]],
                    orbit[[i, 2]],
                    ld[i],
                    theta[i]
                );
            }
            println!();
        }
    }
}
