//! Generalized Pareto Distribution fits of threshold excesses.
//!
//! For excesses `y > 0` over a high threshold, the GPD survival function is
//!
//! ```text
//! P(Y > y) = (1 + ξ·y/σ)^(-1/ξ)   for ξ ≠ 0
//!          = exp(-y/σ)            for ξ = 0
//! ```
//!
//! with location fixed at 0. The local dimension of a query point is `1/σ`.
//!
//! Three estimators sit behind [`GpdEstimator`], selected by [`FitMethod`]:
//! - [`ZhangStephens`] (`Primary`): likelihood-weighted profile estimator,
//!   no iterative optimizer, robust for small samples.
//! - [`GenericMle`](crate::algorithms::gpd_mle::GenericMle) (`Fallback`):
//!   Nelder–Mead maximum likelihood on `(ln σ, ξ)`.
//! - [`MeanExcess`] (`Mean`): `σ = mean(y)`, `ξ = 0`.
//!
//! All three share one degeneracy policy: samples with fewer than
//! [`MIN_EXCEEDANCES`] values, non-finite or non-positive values, or no spread
//! at all are rejected with a [`FitError`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::algorithms::gpd_mle::GenericMle;
use crate::error::FitError;

/// Smallest excess sample any estimator accepts.
pub const MIN_EXCEEDANCES: usize = 2;

/// Below this magnitude the shape is treated as exactly zero (exponential tail).
pub(crate) const SHAPE_EPS: f64 = 1e-9;

/// Fitted GPD parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpdFit {
    pub scale: f64,
    pub shape: f64,
}

impl GpdFit {
    /// Local dimension, the inverse scale.
    pub fn local_dimension(&self) -> f64 {
        1.0 / self.scale
    }

    /// Fitted distribution function at excess `y`.
    pub fn cdf(&self, y: f64) -> f64 {
        gpd_cdf(y, self.scale, self.shape)
    }

    /// Kolmogorov–Smirnov distance between the fitted distribution and the
    /// empirical distribution of `excesses`. 0 for an empty sample.
    pub fn ks_distance(&self, excesses: &[f64]) -> f64 {
        let mut sorted = excesses.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        sorted
            .iter()
            .enumerate()
            .map(|(i, &y)| {
                let f = self.cdf(y);
                (f - i as f64 / n).max((i + 1) as f64 / n - f)
            })
            .fold(0.0, f64::max)
    }

    pub(crate) fn checked(self) -> Result<Self, FitError> {
        if self.scale.is_finite() && self.scale > 0.0 && self.shape.is_finite() {
            Ok(self)
        } else {
            Err(FitError::InvalidEstimate {
                scale: self.scale,
                shape: self.shape,
            })
        }
    }
}

/// A GPD fitting backend.
pub trait GpdEstimator: Send + Sync {
    /// Fit the GPD (location 0) to strictly positive excesses.
    fn fit(&self, excesses: &[f64]) -> Result<GpdFit, FitError>;
}

/// Which estimator fits the excesses of each query row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMethod {
    /// Zhang–Stephens profile-likelihood estimator.
    #[default]
    Primary,
    /// Generic Nelder–Mead maximum likelihood; slower.
    Fallback,
    /// Mean excess with the shape pinned to 0; fastest, biased for heavy tails.
    Mean,
}

impl GpdEstimator for FitMethod {
    fn fit(&self, excesses: &[f64]) -> Result<GpdFit, FitError> {
        match self {
            FitMethod::Primary => ZhangStephens::default().fit(excesses),
            FitMethod::Fallback => GenericMle::default().fit(excesses),
            FitMethod::Mean => MeanExcess.fit(excesses),
        }
    }
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            FitMethod::Primary => "primary",
            FitMethod::Fallback => "fallback",
            FitMethod::Mean => "mean",
        })
    }
}

impl FromStr for FitMethod {
    type Err = String;

    /// Accepts the canonical names plus the historical aliases
    /// `"sdfc"` (primary) and `"scipy"` (fallback).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "sdfc" => Ok(FitMethod::Primary),
            "fallback" | "scipy" | "mle" => Ok(FitMethod::Fallback),
            "mean" => Ok(FitMethod::Mean),
            _ => Err(format!("unknown fit method {s:?}")),
        }
    }
}

/// Reject samples no estimator can fit.
pub fn validate_excesses(excesses: &[f64]) -> Result<(), FitError> {
    if excesses.len() < MIN_EXCEEDANCES {
        return Err(FitError::TooFewExceedances {
            needed: MIN_EXCEEDANCES,
            have: excesses.len(),
        });
    }
    for (index, &value) in excesses.iter().enumerate() {
        if !value.is_finite() {
            return Err(FitError::NonFinite(index));
        }
        if value <= 0.0 {
            return Err(FitError::InvalidExcess { index, value });
        }
    }
    let first = excesses[0];
    if excesses.iter().all(|&v| v == first) {
        return Err(FitError::Degenerate(excesses.len()));
    }
    Ok(())
}

/// Mean-excess estimator: `σ = mean(y)`, `ξ = 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanExcess;

impl GpdEstimator for MeanExcess {
    fn fit(&self, excesses: &[f64]) -> Result<GpdFit, FitError> {
        validate_excesses(excesses)?;
        let scale = excesses.iter().sum::<f64>() / excesses.len() as f64;
        GpdFit { scale, shape: 0.0 }.checked()
    }
}

/// Zhang & Stephens (2009) estimator.
///
/// Reparameterizes by `θ = ξ/σ`. For fixed `θ` the likelihood is maximized
/// in closed form by `ξ(θ) = mean(ln(1 + θ·y))`, leaving the profile
/// log-likelihood `ℓ(θ) = n·(ln(θ/ξ(θ)) - ξ(θ) - 1)`. Instead of maximizing
/// `ℓ`, `θ` is taken as the posterior mean over a fixed quantile grid,
/// weighted by `exp(ℓ)`. The grid only holds values with `1 + θ·y > 0`.
#[derive(Debug, Clone, Copy)]
pub struct ZhangStephens {
    /// Base number of grid points; `sqrt(n)` more are added.
    pub min_grid_points: usize,
    /// Prior scale on the grid spread.
    pub prior: f64,
}

impl Default for ZhangStephens {
    fn default() -> Self {
        Self {
            min_grid_points: 30,
            prior: 3.0,
        }
    }
}

impl ZhangStephens {
    /// Profile log-likelihood at `θ`, returning `(ℓ(θ), ξ(θ))`.
    fn profile(theta: f64, sorted: &[f64]) -> (f64, f64) {
        let n = sorted.len() as f64;
        if theta.abs() < f64::EPSILON {
            // θ -> 0 limit: exponential tail, σ = mean.
            let mean = sorted.iter().sum::<f64>() / n;
            return (n * (-mean.ln() - 1.0), 0.0);
        }
        let xi = sorted.iter().map(|y| (theta * y).ln_1p()).sum::<f64>() / n;
        (n * ((theta / xi).ln() - xi - 1.0), xi)
    }
}

impl GpdEstimator for ZhangStephens {
    fn fit(&self, excesses: &[f64]) -> Result<GpdFit, FitError> {
        validate_excesses(excesses)?;

        let mut sorted = excesses.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let y_max = sorted[n - 1];
        let quartile_idx = ((n as f64 / 4.0 + 0.5) as usize).saturating_sub(1);
        let y_star = sorted[quartile_idx];

        let m = self.min_grid_points + (n as f64).sqrt() as usize;
        let m_f = m as f64;
        let grid: Vec<f64> = (1..=m)
            .map(|j| {
                let spread = 1.0 - (m_f / (j as f64 - 0.5)).sqrt();
                // θ = -b in the usual parameterization; b < 1/y_max keeps 1 + θy > 0.
                -(1.0 / y_max + spread / (self.prior * y_star))
            })
            .collect();

        let log_lik: Vec<f64> = grid.iter().map(|&t| Self::profile(t, &sorted).0).collect();
        let l_max = log_lik
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if !l_max.is_finite() {
            return Err(FitError::InvalidEstimate {
                scale: f64::NAN,
                shape: f64::NAN,
            });
        }

        let mut weights: Vec<f64> = log_lik
            .iter()
            .map(|&l| if l.is_finite() { (l - l_max).exp() } else { 0.0 })
            .collect();
        let total: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= total;
        }
        // Negligible weights only add rounding noise.
        let cutoff = 10.0 * f64::EPSILON;
        let kept: f64 = weights.iter().filter(|w| **w >= cutoff).sum();
        let theta: f64 = grid
            .iter()
            .zip(&weights)
            .filter(|(_, w)| **w >= cutoff)
            .map(|(t, w)| t * w / kept)
            .sum();

        let (_, shape) = Self::profile(theta, &sorted);
        let scale = if theta.abs() < f64::EPSILON {
            sorted.iter().sum::<f64>() / n as f64
        } else {
            shape / theta
        };
        GpdFit { scale, shape }.checked()
    }
}

/// GPD log-likelihood of `excesses` (location 0); `-inf` outside the support
/// or for a non-positive scale.
pub fn gpd_log_likelihood(excesses: &[f64], scale: f64, shape: f64) -> f64 {
    if !(scale.is_finite() && scale > 0.0 && shape.is_finite()) {
        return f64::NEG_INFINITY;
    }
    let n = excesses.len() as f64;
    if shape.abs() < SHAPE_EPS {
        return -n * scale.ln() - excesses.iter().sum::<f64>() / scale;
    }
    let mut sum_log = 0.0;
    for &y in excesses {
        let t = 1.0 + shape * y / scale;
        if t <= 0.0 {
            return f64::NEG_INFINITY;
        }
        sum_log += t.ln();
    }
    -n * scale.ln() - (1.0 + 1.0 / shape) * sum_log
}

/// GPD cumulative distribution function: `F(y) = 1 - (1 + ξy/σ)^(-1/ξ)`.
pub fn gpd_cdf(y: f64, scale: f64, shape: f64) -> f64 {
    if y <= 0.0 {
        return 0.0;
    }
    if shape.abs() < SHAPE_EPS {
        return 1.0 - (-y / scale).exp();
    }
    let t = 1.0 + shape * y / scale;
    if t <= 0.0 {
        // Beyond the upper endpoint of a bounded (ξ < 0) tail.
        return 1.0;
    }
    1.0 - t.powf(-1.0 / shape)
}
