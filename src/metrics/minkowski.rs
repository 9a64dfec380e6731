use crate::core::metric::Metric;

/// Minkowski p-norm distance: `d(a, b) = (sum_k |a_k - b_k|^p)^(1/p)`.
///
/// Special-cases `p == 1.0` (Manhattan) to use `abs()` instead of `powf()`
/// and `p == 2.0` to skip the generic power.
#[derive(Debug, Clone, Copy)]
pub struct Minkowski {
    pub p: f64,
}

impl Minkowski {
    pub fn new(p: f64) -> Self {
        Self { p }
    }
}

/// Compute term |a - b|^p.
#[inline]
fn pnorm_term(a: f64, b: f64, p: f64) -> f64 {
    if p == 1.0 {
        (a - b).abs()
    } else if p == 2.0 {
        (a - b) * (a - b)
    } else {
        (a - b).abs().powf(p)
    }
}

/// Convert accumulated `sum |a-b|^p` to the final distance.
#[inline]
fn dp_to_distance(dp_sum: f64, p: f64) -> f64 {
    if p == 1.0 {
        dp_sum.max(0.0)
    } else if p == 2.0 {
        dp_sum.max(0.0).sqrt()
    } else {
        dp_sum.max(0.0).powf(1.0 / p)
    }
}

impl Metric for Minkowski {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let dp_sum: f64 = a.iter().zip(b).map(|(x, y)| pnorm_term(*x, *y, self.p)).sum();
        dp_to_distance(dp_sum, self.p)
    }

    fn name(&self) -> &'static str {
        "minkowski"
    }

    fn validate(&self) -> Result<(), String> {
        if self.p.is_finite() && self.p >= 1.0 {
            Ok(())
        } else {
            Err(format!("p-norm requires finite p >= 1.0, got {}", self.p))
        }
    }
}

/// Manhattan (city-block) distance, `Minkowski { p: 1 }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl Metric for Manhattan {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }

    fn name(&self) -> &'static str {
        "manhattan"
    }
}

/// Chebyshev (maximum) distance, the `p -> inf` limit of Minkowski.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chebyshev;

impl Metric for Chebyshev {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    fn name(&self) -> &'static str {
        "chebyshev"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::euclidean::Euclidean;

    #[test]
    fn test_minkowski_p2_matches_euclidean() {
        let a = [1.0, -2.0, 0.5];
        let b = [0.0, 3.0, 2.5];
        let d_mink = Minkowski::new(2.0).distance(&a, &b);
        let d_eucl = Euclidean.distance(&a, &b);
        assert!((d_mink - d_eucl).abs() < 1e-12);
    }

    #[test]
    fn test_minkowski_p1_matches_manhattan() {
        let a = [1.0, -2.0, 0.5];
        let b = [0.0, 3.0, 2.5];
        assert!((Minkowski::new(1.0).distance(&a, &b) - 8.0).abs() < 1e-12);
        assert!((Manhattan.distance(&a, &b) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_minkowski_p3() {
        let d = Minkowski::new(3.0).distance(&[0.0, 0.0], &[1.0, 2.0]);
        assert!((d - 9.0_f64.powf(1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_chebyshev() {
        assert_eq!(Chebyshev.distance(&[0.0, 5.0, 1.0], &[2.0, 1.0, 1.0]), 4.0);
    }

    #[test]
    fn test_minkowski_validate() {
        assert!(Minkowski::new(1.0).validate().is_ok());
        assert!(Minkowski::new(0.5).validate().is_err());
        assert!(Minkowski::new(f64::NAN).validate().is_err());
    }
}
