use argmin::core::{CostFunction, Error as ArgminError, Executor, State, TerminationReason};
use argmin::solver::neldermead::NelderMead;

use crate::algorithms::gpd::{gpd_log_likelihood, validate_excesses, GpdEstimator, GpdFit};
use crate::error::FitError;

/// Generic maximum-likelihood GPD fit (location fixed at 0).
///
/// Minimizes the negative log-likelihood over the unconstrained pair
/// `(ln σ, ξ)` with a Nelder–Mead simplex, starting from method-of-moments
/// estimates. Shapes `ξ <= -1` are excluded: the likelihood is unbounded
/// there.
#[derive(Debug, Clone, Copy)]
pub struct GenericMle {
    pub max_iters: u64,
    /// Convergence when the standard deviation of the simplex costs drops
    /// below this value.
    pub sd_tolerance: f64,
    /// Initial simplex edge length in `(ln σ, ξ)` space.
    pub initial_step: f64,
}

impl Default for GenericMle {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            sd_tolerance: 1e-10,
            initial_step: 0.1,
        }
    }
}

/// Negative GPD log-likelihood in `(ln σ, ξ)` coordinates.
struct GpdNegLogLik<'a> {
    excesses: &'a [f64],
}

impl CostFunction for GpdNegLogLik<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        let (log_scale, shape) = (param[0], param[1]);
        if shape <= -1.0 || !log_scale.is_finite() {
            return Ok(f64::INFINITY);
        }
        let ll = gpd_log_likelihood(self.excesses, log_scale.exp(), shape);
        // Nelder-Mead ranks vertices; NaN would poison the ordering.
        Ok(if ll.is_nan() { f64::INFINITY } else { -ll })
    }
}

impl GenericMle {
    /// Method-of-moments starting point `(ln σ, ξ)`, falling back to the
    /// exponential fit when the moment estimate lies outside the support.
    fn initial_point(&self, excesses: &[f64]) -> Vec<f64> {
        let n = excesses.len() as f64;
        let mean = excesses.iter().sum::<f64>() / n;
        let var = excesses.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let exponential = vec![mean.ln(), 0.0];
        if !(var > 0.0) {
            return exponential;
        }
        let ratio = mean * mean / var;
        let shape = (0.5 * (1.0 - ratio)).clamp(-0.5, 0.5);
        let scale = 0.5 * mean * (ratio + 1.0);
        if gpd_log_likelihood(excesses, scale, shape).is_finite() {
            vec![scale.ln(), shape]
        } else {
            exponential
        }
    }
}

impl GpdEstimator for GenericMle {
    fn fit(&self, excesses: &[f64]) -> Result<GpdFit, FitError> {
        validate_excesses(excesses)?;

        let start = self.initial_point(excesses);
        let simplex = vec![
            start.clone(),
            vec![start[0] + self.initial_step, start[1]],
            vec![start[0], start[1] + self.initial_step],
        ];
        let solver = NelderMead::new(simplex)
            .with_sd_tolerance(self.sd_tolerance)
            .map_err(|e| FitError::Optimizer(e.to_string()))?;
        let problem = GpdNegLogLik { excesses };

        let result = Executor::new(problem, solver)
            .configure(|state| state.max_iters(self.max_iters))
            .run()
            .map_err(|e| FitError::Optimizer(e.to_string()))?;

        let state = result.state();
        if let Some(TerminationReason::MaxItersReached) = state.get_termination_reason() {
            return Err(FitError::NotConverged {
                iterations: state.get_iter(),
            });
        }
        let best = state
            .get_best_param()
            .ok_or_else(|| FitError::Optimizer("solver returned no parameters".to_string()))?;
        if !state.get_best_cost().is_finite() {
            return Err(FitError::InvalidEstimate {
                scale: best[0].exp(),
                shape: best[1],
            });
        }
        GpdFit {
            scale: best[0].exp(),
            shape: best[1],
        }
        .checked()
    }
}
