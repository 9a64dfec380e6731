/// Trait for point-to-point distance metrics used by the distance engine.
///
/// Algorithms are generic over `M: Metric`, so the inner pairwise loop is
/// monomorphized and inlined per metric. Metrics carrying parameters (e.g.
/// the Minkowski exponent) hold them as fields.
pub trait Metric: Send + Sync {
    /// Distance between two feature vectors of equal length.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check metric parameters before a computation starts.
    ///
    /// Default accepts everything; parameterized metrics override it.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl<M: Metric + ?Sized> Metric for &M {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        (**self).distance(a, b)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn validate(&self) -> Result<(), String> {
        (**self).validate()
    }
}

/// Combines the two same-variable distances of a reference pair into a
/// cross-variable distance.
///
/// Any `Fn(f64, f64) -> f64 + Send + Sync` closure is a `CrossMetric`.
pub trait CrossMetric: Send + Sync {
    fn combine(&self, d_i: f64, d_j: f64) -> f64;
}

impl<F> CrossMetric for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    #[inline]
    fn combine(&self, d_i: f64, d_j: f64) -> f64 {
        self(d_i, d_j)
    }
}

/// Default cross-metric: `sqrt(d_i^2 + d_j^2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanCross;

impl CrossMetric for EuclideanCross {
    #[inline]
    fn combine(&self, d_i: f64, d_j: f64) -> f64 {
        d_i.hypot(d_j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_cross() {
        assert!((EuclideanCross.combine(3.0, 4.0) - 5.0).abs() < 1e-12);
        assert_eq!(EuclideanCross.combine(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_closure_cross_metric() {
        let max_cross = |a: f64, b: f64| a.max(b);
        assert_eq!(max_cross.combine(1.0, 2.5), 2.5);
    }
}
