use std::collections::BTreeMap;

use ndarray::{Array2, Array3};

/// An unordered pair of variable indices, stored as `(lo, hi)` with `lo <= hi`.
///
/// Result tensors are keyed by this type, so there is no lower triangle that
/// could be read by mistake: `(2, 0)` and `(0, 2)` name the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariablePair {
    lo: usize,
    hi: usize,
}

impl VariablePair {
    pub fn new(i: usize, j: usize) -> Self {
        Self {
            lo: i.min(j),
            hi: i.max(j),
        }
    }

    pub fn lo(&self) -> usize {
        self.lo
    }

    pub fn hi(&self) -> usize {
        self.hi
    }

    /// Whether both indices name the same variable.
    pub fn is_diagonal(&self) -> bool {
        self.lo == self.hi
    }

    /// All pairs `(i, j)` with `i <= j < n_variables`, in row-major order.
    pub fn all(n_variables: usize) -> impl Iterator<Item = VariablePair> {
        (0..n_variables).flat_map(move |i| (i..n_variables).map(move |j| VariablePair::new(i, j)))
    }

    /// Off-diagonal pairs `(i, j)` with `i < j < n_variables`.
    pub fn off_diagonal(n_variables: usize) -> impl Iterator<Item = VariablePair> {
        Self::all(n_variables).filter(|p| !p.is_diagonal())
    }
}

/// Per-sample values for every variable pair: the packed form of a
/// `(samples, variables, variables)` tensor with only the upper triangle set.
///
/// Cells that were not computed read as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairTensor {
    n_samples: usize,
    n_variables: usize,
    cells: BTreeMap<VariablePair, Vec<f64>>,
}

impl PairTensor {
    pub fn new(n_samples: usize, n_variables: usize) -> Self {
        Self {
            n_samples,
            n_variables,
            cells: BTreeMap::new(),
        }
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_variables(&self) -> usize {
        self.n_variables
    }

    /// Store the per-sample vector for `pair`.
    ///
    /// # Panics
    /// If the vector length differs from `n_samples` or the pair is out of range.
    pub fn insert(&mut self, pair: VariablePair, values: Vec<f64>) {
        assert_eq!(
            values.len(),
            self.n_samples,
            "pair vector has {} samples, expected {}",
            values.len(),
            self.n_samples
        );
        assert!(
            pair.hi < self.n_variables,
            "variable {} out of range ({} variables)",
            pair.hi,
            self.n_variables
        );
        self.cells.insert(pair, values);
    }

    /// The per-sample vector for the pair `(i, j)`, if computed.
    pub fn get(&self, i: usize, j: usize) -> Option<&[f64]> {
        self.cells.get(&VariablePair::new(i, j)).map(Vec::as_slice)
    }

    /// Value for `sample` and pair `(i, j)`; `NaN` when not computed.
    pub fn value(&self, sample: usize, i: usize, j: usize) -> f64 {
        self.get(i, j)
            .and_then(|v| v.get(sample).copied())
            .unwrap_or(f64::NAN)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&VariablePair, &Vec<f64>)> {
        self.cells.iter()
    }

    /// Expand to a dense `(samples, variables, variables)` array. Only cells
    /// `[.., i, j]` with `i <= j` are filled; everything else is `NaN`.
    pub fn to_dense(&self) -> Array3<f64> {
        let mut out = Array3::from_elem((self.n_samples, self.n_variables, self.n_variables), f64::NAN);
        for (pair, values) in &self.cells {
            for (s, v) in values.iter().enumerate() {
                out[[s, pair.lo, pair.hi]] = *v;
            }
        }
        out
    }

    /// Mean over the finite entries of a pair, `NaN` if there are none.
    pub fn finite_mean(&self, i: usize, j: usize) -> f64 {
        let Some(values) = self.get(i, j) else {
            return f64::NAN;
        };
        let (sum, count) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }
}

/// Per-pair `(query, reference)` blocks: the packed form of a
/// `(query, reference, variables, variables)` tensor.
#[derive(Debug, Clone)]
pub struct PairBlocks<T> {
    blocks: BTreeMap<VariablePair, Array2<T>>,
}

impl<T> Default for PairBlocks<T> {
    fn default() -> Self {
        Self {
            blocks: BTreeMap::new(),
        }
    }
}

impl<T> PairBlocks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pair: VariablePair, block: Array2<T>) {
        self.blocks.insert(pair, block);
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&Array2<T>> {
        self.blocks.get(&VariablePair::new(i, j))
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&VariablePair, &Array2<T>)> {
        self.blocks.iter()
    }

    /// Consume the map, yielding blocks in pair order.
    pub fn into_pairs(self) -> impl Iterator<Item = (VariablePair, Array2<T>)> {
        self.blocks.into_iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
