use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::algorithms::dispatch::{ChunkReport, FitDispatcher};
use crate::algorithms::distance::{neg_log_transform, pairwise_distances};
use crate::algorithms::threshold::{row_thresholds, Exceedances};
use crate::core::config::LocalDimensionConfig;
use crate::core::metric::Metric;
use crate::error::{IndexError, Result};

/// Per-sample local dimension and extremal index of a single point cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDimension {
    pub local_dim: Vec<f64>,
    pub theta: Vec<f64>,
    pub chunks: Vec<ChunkReport>,
}

impl LocalDimension {
    pub fn len(&self) -> usize {
        self.local_dim.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_dim.is_empty()
    }
}

/// Local dimension and θ of every row of `x` against the rows of `y`
/// (`x` itself when `None`).
///
/// Unlike [`dynamical_local_indexes`](crate::algorithms::indexes::dynamical_local_indexes),
/// distances are not rescaled before the `-ln` transform, and θ defaults to
/// the Ferro estimator.
///
/// # Example
///
/// ```
/// use localdim_rs::{local_dimension, Euclidean, LocalDimensionConfig};
/// use ndarray::Array2;
///
/// let x = Array2::from_shape_fn((200, 2), |(i, k)| {
///     let t = i as f64 * 0.1;
///     if k == 0 { t.cos() } else { t.sin() * (1.0 + 0.1 * t) }
/// });
/// let out = local_dimension(x.view(), None, &LocalDimensionConfig::default(), &Euclidean).unwrap();
/// assert_eq!(out.len(), 200);
/// ```
pub fn local_dimension<'a, M: Metric>(
    x: ArrayView2<'a, f64>,
    y: Option<ArrayView2<'a, f64>>,
    config: &LocalDimensionConfig,
    metric: &M,
) -> Result<LocalDimension> {
    config.validate()?;
    metric.validate().map_err(IndexError::InvalidMetric)?;
    let y = y.unwrap_or(x);
    let dist = pairwise_distances(x, y, metric, config.n_jobs)?;
    local_dimension_from_distances(dist, config)
}

/// As [`local_dimension`], from a precomputed `(query, reference)` distance
/// matrix.
pub fn local_dimension_from_distances(
    mut dist: Array2<f64>,
    config: &LocalDimensionConfig,
) -> Result<LocalDimension> {
    config.validate()?;
    if dist.is_empty() {
        return Err(IndexError::EmptyInput { what: "distances" });
    }
    let q = config.quantile;
    debug!(
        n_query = dist.nrows(),
        n_reference = dist.ncols(),
        quantile = q,
        fit = %config.fit_method,
        theta = %config.theta_method,
        "computing local dimension"
    );

    neg_log_transform(&mut dist);
    let thresholds = row_thresholds(dist.view(), q);
    let theta = dist
        .rows()
        .into_iter()
        .zip(&thresholds)
        .map(|(row, &t)| {
            let exc = Exceedances::from_row(row, t);
            config
                .theta_method
                .estimate(&exc.indices, q)
                .unwrap_or(f64::NAN)
        })
        .collect();

    let fits = FitDispatcher::new(config.n_jobs)?
        .with_timeout(config.timeout)
        .fit_rows(Arc::new(dist), thresholds.into(), config.fit_method)?;

    Ok(LocalDimension {
        local_dim: fits.local_dim,
        theta,
        chunks: fits.chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::distance::normalize_l1;
    use crate::algorithms::extremal::ThetaMethod;
    use crate::algorithms::gpd::FitMethod;
    use crate::metrics::euclidean::Euclidean;

    fn circle_with_noise(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 2), |(i, k)| {
            let t = i as f64 * 0.731;
            let wobble = 0.05 * (i as f64 * 12.9898).sin();
            if k == 0 {
                (1.0 + wobble) * t.cos()
            } else {
                (1.0 + wobble) * t.sin()
            }
        })
    }

    #[test]
    fn test_local_dimension_runs() {
        let x = circle_with_noise(400);
        let out = local_dimension(x.view(), None, &LocalDimensionConfig::default(), &Euclidean).unwrap();
        assert_eq!(out.len(), 400);
        assert!(out.local_dim.iter().filter(|v| v.is_finite()).count() > 390);
        assert!(out.theta.iter().all(|t| t.is_nan() || (*t > 0.0 && *t <= 1.0)));
    }

    #[test]
    fn test_precomputed_matches_direct() {
        let x = circle_with_noise(150);
        let config = LocalDimensionConfig::default().with_fit_method(FitMethod::Mean);
        let direct = local_dimension(x.view(), None, &config, &Euclidean).unwrap();
        let dist = pairwise_distances(x.view(), x.view(), &Euclidean, 1).unwrap();
        let pre = local_dimension_from_distances(dist, &config).unwrap();
        assert_eq!(direct, pre);
    }

    #[test]
    fn test_rescaling_invariance() {
        // -ln(c·d) = -ln(d) - ln(c): thresholds shift, excesses do not.
        let x = circle_with_noise(150);
        let config = LocalDimensionConfig::default()
            .with_fit_method(FitMethod::Mean)
            .with_theta_method(ThetaMethod::Sueveges);
        let dist = pairwise_distances(x.view(), x.view(), &Euclidean, 1).unwrap();
        let mut scaled = dist.clone();
        normalize_l1(&mut scaled);
        let a = local_dimension_from_distances(dist, &config).unwrap();
        let b = local_dimension_from_distances(scaled, &config).unwrap();
        for (u, v) in a.local_dim.iter().zip(&b.local_dim) {
            assert!((u - v).abs() < 1e-6 * u.abs().max(1.0), "{u} vs {v}");
        }
        assert_eq!(a.theta, b.theta);
    }

    #[test]
    fn test_query_against_separate_reference() {
        let reference = circle_with_noise(300);
        let query = reference.slice(ndarray::s![..40, ..]).to_owned();
        let config = LocalDimensionConfig::default().with_fit_method(FitMethod::Mean);
        let out = local_dimension(query.view(), Some(reference.view()), &config, &Euclidean).unwrap();
        assert_eq!(out.len(), 40);
        assert_eq!(out.theta.len(), 40);
        assert!(out.local_dim.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_distances_rejected() {
        let err = local_dimension_from_distances(Array2::zeros((0, 3)), &LocalDimensionConfig::default())
            .unwrap_err();
        assert_eq!(err, IndexError::EmptyInput { what: "distances" });
    }
}
