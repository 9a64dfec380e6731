use serde::{Deserialize, Serialize};

use super::{DynamicalSystem, Evolution};

/// Hénon map: `x' = y + 1 - a x²`, `y' = b x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Henon {
    pub a: f64,
    pub b: f64,
}

impl Default for Henon {
    fn default() -> Self {
        Self { a: 1.4, b: 0.3 }
    }
}

impl DynamicalSystem for Henon {
    fn dim(&self) -> usize {
        2
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![0.0, 0.0], vec![0.5, 0.5])
    }

    fn equation(&self, state: &[f64], _t: f64) -> Vec<f64> {
        let (x, y) = (state[0], state[1]);
        vec![y + 1.0 - self.a * x * x, self.b * x]
    }

    fn evolution(&self) -> Evolution {
        Evolution::Map
    }
}
