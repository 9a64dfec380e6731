use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithms::extremal::ThetaMethod;
use crate::algorithms::gpd::FitMethod;
use crate::error::{IndexError, Result};

/// Default threshold quantile of the transformed distances.
pub const DEFAULT_QUANTILE: f64 = 0.98;

fn check_quantile(q: f64) -> Result<()> {
    if q > 0.0 && q < 1.0 {
        Ok(())
    } else {
        Err(IndexError::InvalidQuantile(q))
    }
}

fn resolve_jobs(n_jobs: Option<usize>) -> usize {
    n_jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    })
}

/// Configuration for [`dynamical_local_indexes`](crate::algorithms::indexes::dynamical_local_indexes).
///
/// Defaults: `quantile = 0.98`, Primary GPD fit, Süveges θ, one worker per
/// available CPU, no deadline, no diagnostics returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Threshold quantile, strictly between 0 and 1.
    pub quantile: f64,
    pub fit_method: FitMethod,
    pub theta_method: ThetaMethod,
    /// Worker count for distances and fits; `None` uses the host parallelism.
    pub n_jobs: Option<usize>,
    /// Bound on the wait for GPD worker results.
    pub timeout: Option<Duration>,
    /// Return the fitted GPD shape per row.
    pub return_shape: bool,
    /// Return the `-ln` transformed distance blocks.
    pub return_dist: bool,
    /// Return the exceedance masks.
    pub return_where: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            quantile: DEFAULT_QUANTILE,
            fit_method: FitMethod::default(),
            theta_method: ThetaMethod::default(),
            n_jobs: None,
            timeout: None,
            return_shape: false,
            return_dist: false,
            return_where: false,
        }
    }
}

impl IndexConfig {
    pub fn new(quantile: f64) -> Self {
        Self {
            quantile,
            ..Self::default()
        }
    }

    pub fn with_fit_method(mut self, method: FitMethod) -> Self {
        self.fit_method = method;
        self
    }

    pub fn with_theta_method(mut self, method: ThetaMethod) -> Self {
        self.theta_method = method;
        self
    }

    pub fn with_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_shape(mut self, yes: bool) -> Self {
        self.return_shape = yes;
        self
    }

    pub fn with_dist(mut self, yes: bool) -> Self {
        self.return_dist = yes;
        self
    }

    pub fn with_where(mut self, yes: bool) -> Self {
        self.return_where = yes;
        self
    }

    /// Worker count for this call.
    pub fn resolved_jobs(&self) -> usize {
        resolve_jobs(self.n_jobs)
    }

    /// # Errors
    /// - `InvalidQuantile` unless `0 < quantile < 1`
    /// - `InvalidJobs` for an explicit worker count of 0
    pub fn validate(&self) -> Result<()> {
        check_quantile(self.quantile)?;
        if self.n_jobs == Some(0) {
            return Err(IndexError::InvalidJobs(0));
        }
        Ok(())
    }
}

/// Configuration for the single-variable
/// [`local_dimension`](crate::algorithms::local_dimension::local_dimension) path.
///
/// Its defaults differ from [`IndexConfig`]: θ uses the Ferro estimator and
/// fits run on a single worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalDimensionConfig {
    pub quantile: f64,
    pub fit_method: FitMethod,
    pub theta_method: ThetaMethod,
    pub n_jobs: usize,
    pub timeout: Option<Duration>,
}

impl Default for LocalDimensionConfig {
    fn default() -> Self {
        Self {
            quantile: DEFAULT_QUANTILE,
            fit_method: FitMethod::Primary,
            theta_method: ThetaMethod::Ferro,
            n_jobs: 1,
            timeout: None,
        }
    }
}

impl LocalDimensionConfig {
    pub fn new(quantile: f64) -> Self {
        Self {
            quantile,
            ..Self::default()
        }
    }

    pub fn with_fit_method(mut self, method: FitMethod) -> Self {
        self.fit_method = method;
        self
    }

    pub fn with_theta_method(mut self, method: ThetaMethod) -> Self {
        self.theta_method = method;
        self
    }

    pub fn with_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_quantile(self.quantile)?;
        if self.n_jobs == 0 {
            return Err(IndexError::InvalidJobs(0));
        }
        Ok(())
    }
}
