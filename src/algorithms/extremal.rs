//! Extremal index (persistence) estimators.
//!
//! Both estimators read the strictly increasing sequence of reference indices
//! at which a query row exceeds its threshold. Tightly clustered exceedances
//! (long stays near the query point) push θ towards 0; isolated exceedances
//! give θ close to 1.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which extremal-index estimator to use.
///
/// The default is [`ThetaMethod::Sueveges`], used by
/// [`dynamical_local_indexes`](crate::algorithms::indexes::dynamical_local_indexes).
/// The single-variable [`local_dimension`](crate::algorithms::local_dimension::local_dimension)
/// path defaults to [`ThetaMethod::Ferro`] instead; see
/// [`LocalDimensionConfig`](crate::core::config::LocalDimensionConfig).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThetaMethod {
    /// Ferro & Segers (2003) intervals estimator. Needs at least 3 events.
    Ferro,
    /// Süveges (2007) maximum-likelihood estimator. Needs at least 2 events.
    #[default]
    Sueveges,
}

impl ThetaMethod {
    /// Estimate θ from exceedance indices; `q` is the threshold quantile.
    ///
    /// Returns `None` when the sequence has too few events.
    pub fn estimate(&self, indices: &[usize], q: f64) -> Option<f64> {
        match self {
            ThetaMethod::Ferro => ferro(indices),
            ThetaMethod::Sueveges => sueveges(indices, q),
        }
    }
}

impl fmt::Display for ThetaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ThetaMethod::Ferro => "ferro",
            ThetaMethod::Sueveges => "sueveges",
        })
    }
}

impl FromStr for ThetaMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ferro" => Ok(ThetaMethod::Ferro),
            "sueveges" | "süveges" | "suveges" => Ok(ThetaMethod::Sueveges),
            _ => Err(format!("unknown theta method {s:?}")),
        }
    }
}

fn gaps(indices: &[usize]) -> impl Iterator<Item = f64> + '_ {
    indices.windows(2).map(|w| (w[1] - w[0]) as f64)
}

/// Ferro intervals estimator, clipped to `<= 1`.
///
/// With gaps `T` (count `N`):
/// - `max T > 2`: `θ = 2(Σ(T-1))² / ((N-1) Σ(T-1)(T-2))`
/// - otherwise: `θ = 2(ΣT)² / ((N-1) ΣT²)`
///
/// `None` for fewer than 3 events, where `N - 1 = 0`.
///
/// # Panics
/// In debug builds, if `indices` is not strictly increasing.
pub fn ferro(indices: &[usize]) -> Option<f64> {
    debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
    if indices.len() < 3 {
        return None;
    }
    let n = (indices.len() - 1) as f64;
    let max_gap = gaps(indices).fold(0.0, f64::max);

    let theta = if max_gap > 2.0 {
        let s1: f64 = gaps(indices).map(|t| t - 1.0).sum();
        let s2: f64 = gaps(indices).map(|t| (t - 1.0) * (t - 2.0)).sum();
        2.0 * s1 * s1 / ((n - 1.0) * s2)
    } else {
        let s1: f64 = gaps(indices).sum();
        let s2: f64 = gaps(indices).map(|t| t * t).sum();
        2.0 * s1 * s1 / ((n - 1.0) * s2)
    };
    Some(theta.min(1.0))
}

/// Süveges likelihood estimator, clipped to `[0, 1]`.
///
/// With `N = events - 1`, `Nc` the number of gaps longer than 1 and
/// `K = (1 - q)(last - first)`:
///
/// ```text
/// θ = (K + N + Nc - sqrt((K + N + Nc)² - 8·Nc·K)) / (2K)
/// ```
///
/// A single cluster (`Nc = 0`) gives 0. `None` for fewer than 2 events.
pub fn sueveges(indices: &[usize], q: f64) -> Option<f64> {
    debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
    if indices.len() < 2 {
        return None;
    }
    let n = (indices.len() - 1) as f64;
    let nc = gaps(indices).filter(|t| *t > 1.0).count() as f64;
    let span = (indices[indices.len() - 1] - indices[0]) as f64;
    let k = (1.0 - q) * span;
    if !(k > 0.0) {
        return None;
    }
    if nc == 0.0 {
        return Some(0.0);
    }
    let b = k + n + nc;
    // The discriminant is (K - N - Nc)² + 4K(N - Nc) >= 0 up to rounding.
    let disc = (b * b - 8.0 * nc * k).max(0.0);
    let theta = (b - disc.sqrt()) / (2.0 * k);
    Some(theta.clamp(0.0, 1.0))
}
