use ndarray::{Array2, ArrayView2, Axis, Zip};
use tracing::debug;

use crate::core::metric::{CrossMetric, Metric};
use crate::core::point_set::PointSet;
use crate::core::tensor::{PairBlocks, VariablePair};
use crate::error::{IndexError, Result};

/// Minimum number of query rows before dispatching to parallel distance rows.
/// Below this threshold, thread-dispatch overhead exceeds parallelism gains.
#[cfg(feature = "parallel")]
const MIN_PARALLEL_ROWS: usize = 64;

/// Compute the `(n_query, n_reference)` distance matrix between the rows of
/// `x` and the rows of `y` under `metric`.
///
/// Rows are distributed over `n_jobs` worker threads when the `parallel`
/// feature is enabled and the input is large enough; `n_jobs == 1` always
/// runs serially on the calling thread.
///
/// # Errors
/// - `FeatureMismatch` if `x` and `y` have a different number of columns
/// - `EmptyInput` if either set has no rows or no columns
pub fn pairwise_distances<M: Metric>(
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    metric: &M,
    n_jobs: usize,
) -> Result<Array2<f64>> {
    let (n_x, d_x) = x.dim();
    let (n_y, d_y) = y.dim();
    if d_x != d_y {
        return Err(IndexError::FeatureMismatch {
            query: d_x,
            reference: d_y,
        });
    }
    if n_x == 0 || n_y == 0 {
        return Err(IndexError::EmptyInput { what: "samples" });
    }
    if d_x == 0 {
        return Err(IndexError::EmptyInput { what: "features" });
    }
    if n_jobs == 0 {
        return Err(IndexError::InvalidJobs(n_jobs));
    }

    // Logical (row-major) copies so every row is a contiguous slice,
    // whatever the strides of the incoming views.
    let xs: Vec<f64> = x.iter().copied().collect();
    let ys: Vec<f64> = y.iter().copied().collect();
    let mut out = vec![0.0; n_x * n_y];

    #[cfg(feature = "parallel")]
    if n_jobs > 1 && n_x >= MIN_PARALLEL_ROWS {
        distance_rows_parallel(&xs, &ys, d_x, metric, n_jobs, &mut out)?;
        return Array2::from_shape_vec((n_x, n_y), out)
            .map_err(|e| IndexError::Shape(e.to_string()));
    }

    distance_rows_serial(&xs, &ys, d_x, metric, &mut out);
    Array2::from_shape_vec((n_x, n_y), out).map_err(|e| IndexError::Shape(e.to_string()))
}

fn distance_rows_serial<M: Metric>(xs: &[f64], ys: &[f64], d: usize, metric: &M, out: &mut [f64]) {
    let n_y = ys.len() / d;
    for (xi, row) in xs.chunks_exact(d).zip(out.chunks_exact_mut(n_y)) {
        for (yj, cell) in ys.chunks_exact(d).zip(row.iter_mut()) {
            *cell = metric.distance(xi, yj);
        }
    }
}

#[cfg(feature = "parallel")]
fn distance_rows_parallel<M: Metric>(
    xs: &[f64],
    ys: &[f64],
    d: usize,
    metric: &M,
    n_jobs: usize,
    out: &mut [f64],
) -> Result<()> {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_jobs)
        .build()
        .map_err(|e| IndexError::ThreadPool(e.to_string()))?;
    let n_y = ys.len() / d;

    pool.install(|| {
        out.par_chunks_mut(n_y)
            .zip(xs.par_chunks(d))
            .for_each(|(row, xi)| {
                for (yj, cell) in ys.chunks_exact(d).zip(row.iter_mut()) {
                    *cell = metric.distance(xi, yj);
                }
            });
    });
    Ok(())
}

/// Matrix 1-norm: the maximum absolute column sum.
pub fn matrix_one_norm(block: &Array2<f64>) -> f64 {
    block
        .map_axis(Axis(0), |col| col.iter().map(|v| v.abs()).sum::<f64>())
        .iter()
        .copied()
        .fold(0.0, f64::max)
}

/// Scale a distance block by its matrix 1-norm so that blocks of different
/// variables have comparable magnitudes. An all-zero block is left as is.
pub fn normalize_l1(block: &mut Array2<f64>) {
    let norm = matrix_one_norm(block);
    if norm > 0.0 && norm.is_finite() {
        block.mapv_inplace(|v| v / norm);
    }
}

/// Combine two same-variable distance blocks elementwise into a
/// cross-variable block.
///
/// # Panics
/// If the blocks differ in shape.
pub fn cross_block<C: CrossMetric + ?Sized>(
    d_i: &Array2<f64>,
    d_j: &Array2<f64>,
    cross: &C,
) -> Array2<f64> {
    assert_eq!(d_i.dim(), d_j.dim(), "cross-metric blocks must have the same shape");
    Zip::from(d_i)
        .and(d_j)
        .map_collect(|&a, &b| cross.combine(a, b))
}

/// Apply `d -> -ln(d)` in place.
///
/// Entries that are not strictly positive (exact zeros, e.g. self matches,
/// and `NaN`) are first replaced by `f64::MAX`, so they become the least
/// extreme values instead of `+inf`.
pub fn neg_log_transform(block: &mut Array2<f64>) {
    block.mapv_inplace(neg_log);
}

#[inline]
pub(crate) fn neg_log(d: f64) -> f64 {
    if d > 0.0 {
        -d.ln()
    } else {
        -f64::MAX.ln()
    }
}

/// Build the raw (not yet log-transformed) distance blocks for every pair of
/// variables.
///
/// Diagonal blocks hold the metric distance scaled by `normalize_l1`;
/// off-diagonal blocks `(i, j)`, `i < j`, hold `cross(d_ii, d_jj)`.
pub fn distance_blocks<M: Metric, C: CrossMetric + ?Sized>(
    x: &PointSet,
    y: &PointSet,
    metric: &M,
    cross: &C,
    n_jobs: usize,
) -> Result<PairBlocks<f64>> {
    x.check_compatible(y)?;
    let n_var = x.n_variables();
    let mut blocks = PairBlocks::new();

    for v in 0..n_var {
        let mut block = pairwise_distances(x.variable(v), y.variable(v), metric, n_jobs)?;
        normalize_l1(&mut block);
        debug!(
            variable = v,
            n_query = block.nrows(),
            n_reference = block.ncols(),
            metric = metric.name(),
            "computed distance block"
        );
        blocks.insert(VariablePair::new(v, v), block);
    }

    for pair in VariablePair::off_diagonal(n_var) {
        let combined = match (blocks.get(pair.lo(), pair.lo()), blocks.get(pair.hi(), pair.hi())) {
            (Some(d_i), Some(d_j)) => cross_block(d_i, d_j, cross),
            _ => {
                return Err(IndexError::Shape(format!(
                    "missing diagonal block for pair ({}, {})",
                    pair.lo(),
                    pair.hi()
                )))
            }
        };
        blocks.insert(pair, combined);
    }

    Ok(blocks)
}
