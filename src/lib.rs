pub mod algorithms;
pub mod core;
pub mod error;
pub mod metrics;
pub mod systems;

pub use crate::algorithms::dispatch::{ChunkReport, ChunkStatus, FitDispatcher, RowFits};
pub use crate::algorithms::distance::{distance_blocks, neg_log_transform, normalize_l1, pairwise_distances};
pub use crate::algorithms::extremal::{ferro, sueveges, ThetaMethod};
pub use crate::algorithms::gpd::{FitMethod, GpdEstimator, GpdFit, MeanExcess, ZhangStephens};
pub use crate::algorithms::gpd_mle::GenericMle;
pub use crate::algorithms::indexes::{dynamical_local_indexes, LocalIndexes};
pub use crate::algorithms::local_dimension::{
    local_dimension, local_dimension_from_distances, LocalDimension,
};
pub use crate::core::config::{IndexConfig, LocalDimensionConfig};
pub use crate::core::metric::{CrossMetric, EuclideanCross, Metric};
pub use crate::core::point_set::PointSet;
pub use crate::core::tensor::{PairBlocks, PairTensor, VariablePair};
pub use crate::error::{FitError, IndexError, Result};
pub use crate::metrics::euclidean::{Cosine, Euclidean};
pub use crate::metrics::kind::MetricKind;
pub use crate::metrics::minkowski::{Chebyshev, Manhattan, Minkowski};
pub use crate::systems::{DynamicalSystem, Henon, Lorenz63, Solver};

use ndarray::ArrayView2;

/// High-level facade for local-index estimation, generic over the distance
/// metric and the cross-variable combination.
///
/// # Examples
///
/// ```
/// use localdim_rs::{EuclideanEngine, IndexConfig, PointSet};
/// use ndarray::Array2;
///
/// let x = Array2::from_shape_fn((300, 2), |(i, k)| {
///     let t = i as f64 * 0.05;
///     if k == 0 { t.sin() } else { (2.0 * t).cos() }
/// });
/// let points = PointSet::from_2d(x).unwrap();
/// let engine = EuclideanEngine::new(IndexConfig::default().with_jobs(1));
/// let out = engine.compute(&points).unwrap();
/// assert_eq!(out.local_dim.get(0, 0).unwrap().len(), 300);
/// ```
pub struct IndexEngine<M: Metric = Euclidean, C: CrossMetric = EuclideanCross> {
    metric: M,
    cross: C,
    config: IndexConfig,
}

impl<M: Metric + Default, C: CrossMetric + Default> IndexEngine<M, C> {
    /// Create an engine with the default-constructed metric and cross-metric.
    pub fn new(config: IndexConfig) -> Self {
        Self::with_metric(M::default(), C::default(), config)
    }
}

impl<M: Metric, C: CrossMetric> IndexEngine<M, C> {
    /// Create an engine around explicit metric values, e.g. a parameterized
    /// [`Minkowski`] or a closure cross-metric.
    pub fn with_metric(metric: M, cross: C, config: IndexConfig) -> Self {
        Self {
            metric,
            cross,
            config,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Local indexes of every sample of `x` against `x` itself.
    pub fn compute(&self, x: &PointSet) -> Result<LocalIndexes> {
        dynamical_local_indexes(x, None, &self.config, &self.metric, &self.cross)
    }

    /// Local indexes of the samples of `x` against the reference set `y`.
    pub fn compute_against(&self, x: &PointSet, y: &PointSet) -> Result<LocalIndexes> {
        dynamical_local_indexes(x, Some(y), &self.config, &self.metric, &self.cross)
    }

    /// Single-variable local dimension and θ with this engine's metric.
    ///
    /// Uses `config`, not the engine's [`IndexConfig`]: the two paths have
    /// different defaults.
    pub fn local_dimension<'a>(
        &self,
        x: ArrayView2<'a, f64>,
        y: Option<ArrayView2<'a, f64>>,
        config: &LocalDimensionConfig,
    ) -> Result<LocalDimension> {
        local_dimension(x, y, config, &self.metric)
    }
}

/// Convenience type alias for the most common use case.
pub type EuclideanEngine = IndexEngine<Euclidean, EuclideanCross>;

/// Engine whose metric is chosen at runtime, e.g. parsed from a config file.
pub type DynamicEngine = IndexEngine<MetricKind, EuclideanCross>;
