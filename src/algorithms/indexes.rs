use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::{Array2, Zip};
use tracing::{debug, warn};

use crate::algorithms::dispatch::{ChunkReport, FitDispatcher};
use crate::algorithms::distance::{distance_blocks, neg_log_transform};
use crate::algorithms::threshold::{exceedance_mask, mask_indices, row_thresholds};
use crate::core::config::IndexConfig;
use crate::core::metric::{CrossMetric, Metric};
use crate::core::point_set::PointSet;
use crate::core::tensor::{PairBlocks, PairTensor, VariablePair};
use crate::error::{IndexError, Result};

/// Local dynamical indexes for every query sample and variable pair.
///
/// All tensors are packed over pairs `(i, j)` with `i <= j`; cells that could
/// not be estimated hold `NaN`.
#[derive(Debug, Clone)]
pub struct LocalIndexes {
    /// Local dimension `1/σ` of the GPD fit.
    pub local_dim: PairTensor,
    /// Extremal index (persistence).
    pub theta: PairTensor,
    /// Co-recurrence ratio `|W_ii ∧ W_jj| / |W_ii|`.
    pub alpha: PairTensor,
    /// GPD shape, if requested.
    pub shape: Option<PairTensor>,
    /// `-ln` transformed distance blocks, if requested.
    pub dist: Option<PairBlocks<f64>>,
    /// Exceedance masks, if requested.
    pub exceedances: Option<PairBlocks<bool>>,
    /// GPD dispatch reports per pair.
    pub chunks: BTreeMap<VariablePair, Vec<ChunkReport>>,
}

impl LocalIndexes {
    pub fn n_samples(&self) -> usize {
        self.local_dim.n_samples()
    }

    pub fn n_variables(&self) -> usize {
        self.local_dim.n_variables()
    }

    /// Whether every GPD worker of every pair reported back.
    pub fn is_complete(&self) -> bool {
        self.chunks
            .values()
            .flatten()
            .all(|c| c.status == crate::algorithms::dispatch::ChunkStatus::Completed)
    }
}

/// Per-row co-recurrence of two exceedance masks: the fraction of the
/// exceedances of `w_i` that are also exceedances of `w_j`. `NaN` for rows
/// where `w_i` has none.
pub fn co_recurrence(w_i: &Array2<bool>, w_j: &Array2<bool>) -> Vec<f64> {
    assert_eq!(w_i.dim(), w_j.dim(), "masks must have the same shape");
    w_i.rows()
        .into_iter()
        .zip(w_j.rows())
        .map(|(a, b)| {
            let mut both = 0usize;
            let mut total = 0usize;
            Zip::from(&a).and(&b).for_each(|&x, &y| {
                total += usize::from(x);
                both += usize::from(x && y);
            });
            if total == 0 {
                f64::NAN
            } else {
                both as f64 / total as f64
            }
        })
        .collect()
}

/// Estimate local dimension, extremal index and co-recurrence of every
/// sample of `x` with respect to the reference set `y` (`x` itself when
/// `None`).
///
/// For each variable pair `i <= j`:
/// 1. distances: diagonal blocks under `metric`, scaled by their matrix
///    1-norm; off-diagonal blocks `cross(d_ii, d_jj)`; then `-ln`.
/// 2. per-row threshold at `config.quantile` and exceedance mask.
/// 3. GPD fit of the excesses per row (parallel over `config.n_jobs`).
/// 4. θ from the exceedance indices with `config.theta_method`.
/// 5. α from the diagonal masks of `i` and `j`.
///
/// Rows whose fit or θ cannot be estimated are `NaN`; they never abort the
/// call.
///
/// # Errors
/// Invalid configuration or metric parameters, incompatible point sets, or a
/// worker pool that cannot be built.
pub fn dynamical_local_indexes<M: Metric, C: CrossMetric + ?Sized>(
    x: &PointSet,
    y: Option<&PointSet>,
    config: &IndexConfig,
    metric: &M,
    cross: &C,
) -> Result<LocalIndexes> {
    config.validate()?;
    metric.validate().map_err(IndexError::InvalidMetric)?;
    let y = y.unwrap_or(x);
    x.check_compatible(y)?;

    let n_jobs = config.resolved_jobs();
    let q = config.quantile;
    let n_query = x.n_samples();
    let n_var = x.n_variables();
    let dispatcher = FitDispatcher::new(n_jobs)?.with_timeout(config.timeout);
    debug!(
        n_query,
        n_reference = y.n_samples(),
        n_variables = n_var,
        n_jobs,
        quantile = q,
        fit = %config.fit_method,
        theta = %config.theta_method,
        "computing local indexes"
    );

    let raw = distance_blocks(x, y, metric, cross, n_jobs)?;

    let mut local_dim = PairTensor::new(n_query, n_var);
    let mut theta = PairTensor::new(n_query, n_var);
    let mut shape = PairTensor::new(n_query, n_var);
    let mut masks: PairBlocks<bool> = PairBlocks::new();
    let mut dist: PairBlocks<f64> = PairBlocks::new();
    let mut chunks = BTreeMap::new();

    for (pair, mut block) in raw.into_pairs() {
        neg_log_transform(&mut block);
        let thresholds = row_thresholds(block.view(), q);
        let mask = exceedance_mask(block.view(), &thresholds);

        let block = Arc::new(block);
        let fits = dispatcher.fit_rows(Arc::clone(&block), thresholds.into(), config.fit_method)?;
        let failed = fits.failed_rows();
        if failed > 0 {
            warn!(
                vi = pair.lo(),
                vj = pair.hi(),
                failed,
                rows = n_query,
                "local dimension undefined for some rows"
            );
        }

        let pair_theta: Vec<f64> = mask
            .rows()
            .into_iter()
            .map(|row| {
                config
                    .theta_method
                    .estimate(&mask_indices(row), q)
                    .unwrap_or(f64::NAN)
            })
            .collect();
        debug!(
            vi = pair.lo(),
            vj = pair.hi(),
            failed,
            "fitted variable pair"
        );

        local_dim.insert(pair, fits.local_dim);
        shape.insert(pair, fits.shape);
        theta.insert(pair, pair_theta);
        chunks.insert(pair, fits.chunks);
        masks.insert(pair, mask);
        if config.return_dist {
            let block = Arc::try_unwrap(block).unwrap_or_else(|shared| (*shared).clone());
            dist.insert(pair, block);
        }
    }

    let mut alpha = PairTensor::new(n_query, n_var);
    for pair in VariablePair::all(n_var) {
        let values = match (masks.get(pair.lo(), pair.lo()), masks.get(pair.hi(), pair.hi())) {
            (Some(w_i), Some(w_j)) => co_recurrence(w_i, w_j),
            _ => vec![f64::NAN; n_query],
        };
        alpha.insert(pair, values);
    }

    Ok(LocalIndexes {
        local_dim,
        theta,
        alpha,
        shape: config.return_shape.then_some(shape),
        dist: config.return_dist.then_some(dist),
        exceedances: config.return_where.then_some(masks),
        chunks,
    })
}
