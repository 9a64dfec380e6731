use ndarray::{array, Array2};
use serde::{Deserialize, Serialize};

use super::{DynamicalSystem, Evolution, Solver};

/// Lorenz (1963) convection model:
///
/// ```text
/// dx/dt = s (y - x)
/// dy/dt = r x - y - x z
/// dz/dt = x y - b z
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lorenz63 {
    /// Prandtl number.
    pub s: f64,
    /// Rayleigh number.
    pub r: f64,
    pub b: f64,
    pub solver: Solver,
}

impl Default for Lorenz63 {
    fn default() -> Self {
        Self::new(10.0, 28.0, 2.667)
    }
}

impl Lorenz63 {
    pub fn new(s: f64, r: f64, b: f64) -> Self {
        Self {
            s,
            r,
            b,
            solver: Solver::Rk4,
        }
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    /// Jacobian of the vector field at `state`.
    pub fn jacobian(&self, state: &[f64]) -> Array2<f64> {
        let (x, y, z) = (state[0], state[1], state[2]);
        array![
            [-self.s, self.s, 0.0],
            [self.r - z, -1.0, -x],
            [y, x, -self.b],
        ]
    }
}

impl DynamicalSystem for Lorenz63 {
    fn dim(&self) -> usize {
        3
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![-20.0, -20.0, 0.0], vec![20.0, 20.0, 40.0])
    }

    fn equation(&self, state: &[f64], _t: f64) -> Vec<f64> {
        let (x, y, z) = (state[0], state[1], state[2]);
        vec![self.s * (y - x), self.r * x - y - x * z, x * y - self.b * z]
    }

    fn evolution(&self) -> Evolution {
        Evolution::Flow(self.solver)
    }
}
