//! Reference dynamical systems used to generate trajectories.
//!
//! A [`DynamicalSystem`] is either a flow (an ODE integrated with a fixed
//! [`Solver`] over the requested times) or a map (iterated once per
//! requested time step). This is deliberately minimal: enough to feed real
//! attractors into the index pipeline.

pub mod henon;
pub mod lorenz63;

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

pub use henon::Henon;
pub use lorenz63::Lorenz63;

/// Fixed-step integration scheme for flows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Solver {
    /// Classical fourth-order Runge–Kutta.
    #[default]
    Rk4,
    /// Explicit Euler.
    Euler,
}

/// How a system advances its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evolution {
    /// `dx/dt = f(x, t)`, integrated between consecutive times.
    Flow(Solver),
    /// `x_{n+1} = f(x_n)`, one iteration per time step.
    Map,
}

pub trait DynamicalSystem: Send + Sync {
    /// Phase-space dimension.
    fn dim(&self) -> usize;

    /// `(lower, upper)` corners of the box initial conditions are drawn from.
    fn bounds(&self) -> (Vec<f64>, Vec<f64>);

    /// Vector field for flows, next state for maps. `t` is ignored by
    /// autonomous systems.
    fn equation(&self, state: &[f64], t: f64) -> Vec<f64>;

    fn evolution(&self) -> Evolution;

    /// Trajectory starting at `initial` at `times[0]`, shape `(times.len(), dim)`.
    ///
    /// # Errors
    /// - `EmptyInput` if `times` is empty
    /// - `Shape` if `initial` has the wrong dimension, or `times` is not
    ///   increasing for a flow
    fn solve(&self, initial: &[f64], times: &[f64]) -> Result<Array2<f64>> {
        if times.is_empty() {
            return Err(IndexError::EmptyInput { what: "times" });
        }
        if initial.len() != self.dim() {
            return Err(IndexError::Shape(format!(
                "initial condition has {} coordinates, system has dimension {}",
                initial.len(),
                self.dim()
            )));
        }
        match self.evolution() {
            Evolution::Flow(solver) => {
                if times.windows(2).any(|w| !(w[1] > w[0])) {
                    return Err(IndexError::Shape("times must be strictly increasing".to_string()));
                }
                Ok(integrate(self, solver, initial, times))
            }
            Evolution::Map => Ok(iterate(self, initial, times.len())),
        }
    }

    /// Uniform draw inside [`bounds`](Self::bounds).
    fn random_initial_condition<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64>
    where
        Self: Sized,
    {
        let (lower, upper) = self.bounds();
        lower
            .iter()
            .zip(&upper)
            .map(|(&lo, &hi)| if hi > lo { rng.gen_range(lo..hi) } else { lo })
            .collect()
    }

    /// Trajectory from a random initial condition.
    fn orbit<R: Rng + ?Sized>(&self, times: &[f64], rng: &mut R) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        let x0 = self.random_initial_condition(rng);
        self.solve(&x0, times)
    }
}

fn axpy(x: &[f64], a: f64, k: &[f64]) -> Vec<f64> {
    x.iter().zip(k).map(|(x, k)| x + a * k).collect()
}

fn integrate<S: DynamicalSystem + ?Sized>(
    system: &S,
    solver: Solver,
    initial: &[f64],
    times: &[f64],
) -> Array2<f64> {
    let dim = initial.len();
    let mut out = Array2::zeros((times.len(), dim));
    let mut state = initial.to_vec();
    out.row_mut(0).assign(&ndarray::ArrayView1::from(&state[..]));

    for (i, w) in times.windows(2).enumerate() {
        let (t, h) = (w[0], w[1] - w[0]);
        state = match solver {
            Solver::Euler => axpy(&state, h, &system.equation(&state, t)),
            Solver::Rk4 => {
                let k1 = system.equation(&state, t);
                let k2 = system.equation(&axpy(&state, 0.5 * h, &k1), t + 0.5 * h);
                let k3 = system.equation(&axpy(&state, 0.5 * h, &k2), t + 0.5 * h);
                let k4 = system.equation(&axpy(&state, h, &k3), t + h);
                state
                    .iter()
                    .enumerate()
                    .map(|(d, x)| x + h / 6.0 * (k1[d] + 2.0 * k2[d] + 2.0 * k3[d] + k4[d]))
                    .collect()
            }
        };
        out.row_mut(i + 1).assign(&ndarray::ArrayView1::from(&state[..]));
    }
    out
}

fn iterate<S: DynamicalSystem + ?Sized>(system: &S, initial: &[f64], steps: usize) -> Array2<f64> {
    let mut out = Array2::zeros((steps, initial.len()));
    let mut state = initial.to_vec();
    for mut row in out.rows_mut() {
        row.assign(&ndarray::ArrayView1::from(&state[..]));
        state = system.equation(&state, 0.0);
    }
    out
}

/// `n` evenly spaced times `t0, t0 + dt, ...`.
pub fn time_grid(t0: f64, dt: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| t0 + dt * i as f64).collect()
}
