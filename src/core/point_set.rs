use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{IndexError, Result};

/// An immutable set of samples with shape `(samples, features, variables)`.
///
/// Each variable is an independent point cloud over the same sample index
/// (e.g. several trajectories or several fields observed at the same times).
/// A plain `(samples, features)` array is a single variable.
#[derive(Debug, Clone)]
pub struct PointSet {
    data: Array3<f64>,
}

impl PointSet {
    /// Wrap a `(samples, features, variables)` array.
    ///
    /// Rejects empty axes and non-finite coordinates.
    pub fn new(data: Array3<f64>) -> Result<Self> {
        let (n_samples, n_features, n_variables) = data.dim();
        if n_samples == 0 {
            return Err(IndexError::EmptyInput { what: "samples" });
        }
        if n_features == 0 {
            return Err(IndexError::EmptyInput { what: "features" });
        }
        if n_variables == 0 {
            return Err(IndexError::EmptyInput { what: "variables" });
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(IndexError::Shape(format!(
                "non-finite coordinate at flat position {pos}"
            )));
        }
        Ok(Self { data })
    }

    /// Lift a `(samples, features)` array to a single-variable point set.
    pub fn from_2d(data: Array2<f64>) -> Result<Self> {
        Self::new(data.insert_axis(Axis(2)))
    }

    /// Build a single-variable point set from row vectors.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_samples = rows.len();
        if n_samples == 0 {
            return Err(IndexError::EmptyInput { what: "samples" });
        }
        let n_features = rows[0].len();
        if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(IndexError::Shape(format!(
                "row {i} has {} features, expected {n_features}",
                r.len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((n_samples, n_features), flat)
            .map_err(|e| IndexError::Shape(e.to_string()))?;
        Self::from_2d(data)
    }

    pub fn n_samples(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_features(&self) -> usize {
        self.data.dim().1
    }

    pub fn n_variables(&self) -> usize {
        self.data.dim().2
    }

    /// The `(samples, features)` view of variable `v`.
    ///
    /// # Panics
    /// If `v >= n_variables()`.
    pub fn variable(&self, v: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(2), v)
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.data
    }

    /// Check that `reference` can serve as the reference set for `self`.
    pub fn check_compatible(&self, reference: &PointSet) -> Result<()> {
        if self.n_features() != reference.n_features() {
            return Err(IndexError::FeatureMismatch {
                query: self.n_features(),
                reference: reference.n_features(),
            });
        }
        if self.n_variables() != reference.n_variables() {
            return Err(IndexError::VariableMismatch {
                query: self.n_variables(),
                reference: reference.n_variables(),
            });
        }
        Ok(())
    }
}

impl TryFrom<Array2<f64>> for PointSet {
    type Error = IndexError;

    fn try_from(data: Array2<f64>) -> Result<Self> {
        Self::from_2d(data)
    }
}

impl TryFrom<Array3<f64>> for PointSet {
    type Error = IndexError;

    fn try_from(data: Array3<f64>) -> Result<Self> {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_2d_is_single_variable() {
        let ps = PointSet::from_2d(array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]).unwrap();
        assert_eq!(ps.n_samples(), 3);
        assert_eq!(ps.n_features(), 2);
        assert_eq!(ps.n_variables(), 1);
        assert_eq!(ps.variable(0)[[2, 1]], 5.0);
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        let empty = Array3::<f64>::zeros((0, 2, 1));
        assert_eq!(
            PointSet::new(empty).unwrap_err(),
            IndexError::EmptyInput { what: "samples" }
        );
        let bad = array![[0.0, f64::NAN]];
        assert!(matches!(PointSet::from_2d(bad), Err(IndexError::Shape(_))));
    }

    #[test]
    fn test_from_rows_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(PointSet::from_rows(&rows), Err(IndexError::Shape(_))));
    }

    #[test]
    fn test_check_compatible() {
        let a = PointSet::new(Array3::zeros((4, 3, 2))).unwrap();
        let b = PointSet::new(Array3::zeros((5, 2, 2))).unwrap();
        let c = PointSet::new(Array3::zeros((5, 3, 1))).unwrap();
        assert_eq!(
            a.check_compatible(&b),
            Err(IndexError::FeatureMismatch { query: 3, reference: 2 })
        );
        assert_eq!(
            a.check_compatible(&c),
            Err(IndexError::VariableMismatch { query: 2, reference: 1 })
        );
        assert!(a.check_compatible(&a).is_ok());
    }
}
