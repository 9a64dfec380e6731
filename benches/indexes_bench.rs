use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use localdim_rs::algorithms::extremal::{ferro, sueveges};
use localdim_rs::algorithms::threshold::row_thresholds;
use localdim_rs::systems::time_grid;
use localdim_rs::{
    pairwise_distances, DynamicalSystem, Euclidean, EuclideanEngine, FitMethod, GenericMle,
    GpdEstimator, IndexConfig, Lorenz63, Manhattan, PointSet, ZhangStephens,
};

fn lorenz_points(n: usize) -> PointSet {
    let times = time_grid(0.0, 0.01, n + 500);
    let orbit = Lorenz63::default()
        .solve(&[1.0, 1.0, 20.0], &times)
        .unwrap();
    let orbit = orbit.slice(ndarray::s![500.., ..]).to_owned();
    PointSet::from_2d(orbit).unwrap()
}

fn excess_sample(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| -((1.0 - (i as f64 + 0.5) / n as f64).ln()) * 0.3)
        .collect()
}

fn bench_pairwise_distances(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairwise_distances");
    group.sample_size(10);
    for n in [500, 1_000, 2_000] {
        let points = lorenz_points(n);
        let x = points.variable(0);
        group.bench_with_input(BenchmarkId::new("euclidean", n), &n, |b, _| {
            b.iter(|| pairwise_distances(black_box(x), black_box(x), &Euclidean, 1))
        });
        group.bench_with_input(BenchmarkId::new("manhattan", n), &n, |b, _| {
            b.iter(|| pairwise_distances(black_box(x), black_box(x), &Manhattan, 1))
        });
    }
    group.finish();
}

fn bench_row_thresholds(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_thresholds");
    for n in [500, 2_000] {
        let points = lorenz_points(n);
        let d = pairwise_distances(points.variable(0), points.variable(0), &Euclidean, 1).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| row_thresholds(black_box(d.view()), 0.98))
        });
    }
    group.finish();
}

fn bench_gpd_estimators(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpd_fit");
    for n in [20, 40, 200] {
        let y = excess_sample(n);
        group.bench_with_input(BenchmarkId::new("zhang_stephens", n), &n, |b, _| {
            b.iter(|| ZhangStephens::default().fit(black_box(&y)))
        });
        group.bench_with_input(BenchmarkId::new("nelder_mead", n), &n, |b, _| {
            b.iter(|| GenericMle::default().fit(black_box(&y)))
        });
        group.bench_with_input(BenchmarkId::new("mean", n), &n, |b, _| {
            b.iter(|| FitMethod::Mean.fit(black_box(&y)))
        });
    }
    group.finish();
}

fn bench_theta(c: &mut Criterion) {
    let idx: Vec<usize> = (0..40).map(|k| 7 + 49 * k + (k % 3)).collect();
    let mut group = c.benchmark_group("theta");
    group.bench_function("ferro", |b| b.iter(|| ferro(black_box(&idx))));
    group.bench_function("sueveges", |b| b.iter(|| sueveges(black_box(&idx), 0.98)));
    group.finish();
}

fn bench_local_indexes(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_indexes");
    group.sample_size(10);
    for n in [500, 1_000, 2_000] {
        let points = lorenz_points(n);
        let engine = EuclideanEngine::new(IndexConfig::default().with_jobs(1));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| engine.compute(black_box(&points)))
        });
    }
    group.finish();
}

#[cfg(feature = "parallel")]
fn bench_local_indexes_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_indexes_thread_scaling");
    group.sample_size(10);

    let points = lorenz_points(2_000);

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("threads", threads),
            &threads,
            |b, &threads| {
                let engine = EuclideanEngine::new(IndexConfig::default().with_jobs(threads));
                b.iter(|| engine.compute(black_box(&points)));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_pairwise_distances,
    bench_row_thresholds,
    bench_gpd_estimators,
    bench_theta,
    bench_local_indexes,
);

#[cfg(feature = "parallel")]
criterion_group!(parallel_benches, bench_local_indexes_thread_scaling);

#[cfg(feature = "parallel")]
criterion_main!(benches, parallel_benches);

#[cfg(not(feature = "parallel"))]
criterion_main!(benches);
