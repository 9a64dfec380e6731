use ndarray::{Array2, ArrayView1, ArrayView2, Zip};

/// Empirical `q`-quantile with linear interpolation between order statistics
/// (position `q * (n - 1)`), the same convention as numpy's default.
///
/// Uses an O(n) partial sort. Returns `NaN` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let frac = pos - lo as f64;

    let mut buf = values.to_vec();
    let (_, lo_val, upper) = buf.select_nth_unstable_by(lo, f64::total_cmp);
    let lo_val = *lo_val;
    if frac == 0.0 || upper.is_empty() {
        return lo_val;
    }
    // The next order statistic is the minimum of the upper partition.
    let hi_val = upper.iter().copied().fold(f64::INFINITY, f64::min);
    lo_val + (hi_val - lo_val) * frac
}

/// Per-row `q`-quantile thresholds of a transformed distance block.
pub fn row_thresholds(block: ArrayView2<'_, f64>, q: f64) -> Vec<f64> {
    block
        .rows()
        .into_iter()
        .map(|row| quantile(&row.to_vec(), q))
        .collect()
}

/// Boolean exceedance mask: `mask[i, j] = block[i, j] > thresholds[i]`.
///
/// # Panics
/// If `thresholds.len() != block.nrows()`.
pub fn exceedance_mask(block: ArrayView2<'_, f64>, thresholds: &[f64]) -> Array2<bool> {
    assert_eq!(
        thresholds.len(),
        block.nrows(),
        "one threshold per query row is required"
    );
    let mut mask = Array2::from_elem(block.dim(), false);
    Zip::from(mask.rows_mut())
        .and(block.rows())
        .and(thresholds)
        .for_each(|mut m_row, b_row, &t| {
            Zip::from(&mut m_row).and(&b_row).for_each(|m, &v| *m = v > t);
        });
    mask
}

/// The exceedances of one query row: reference indices (increasing) and the
/// matching excesses `value - threshold` (all strictly positive).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exceedances {
    pub indices: Vec<usize>,
    pub excesses: Vec<f64>,
}

impl Exceedances {
    /// Collect the entries of `row` strictly above `threshold`.
    pub fn from_row(row: ArrayView1<'_, f64>, threshold: f64) -> Self {
        let mut out = Self::default();
        for (j, &v) in row.iter().enumerate() {
            if v > threshold {
                out.indices.push(j);
                out.excesses.push(v - threshold);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Reference indices where a boolean mask row is set, in increasing order.
pub fn mask_indices(row: ArrayView1<'_, bool>) -> Vec<usize> {
    row.iter()
        .enumerate()
        .filter_map(|(j, &hit)| hit.then_some(j))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_quantile_interpolates() {
        let v = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(quantile(&v, 0.0), 1.0);
        assert_eq!(quantile(&v, 1.0), 5.0);
        assert_eq!(quantile(&v, 0.5), 3.0);
        // pos = 0.9 * 4 = 3.6 -> 4 + 0.6 * (5 - 4)
        assert!((quantile(&v, 0.9) - 4.6).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_edge_cases() {
        assert!(quantile(&[], 0.5).is_nan());
        assert_eq!(quantile(&[7.0], 0.98), 7.0);
        assert_eq!(quantile(&[2.0, 2.0, 2.0], 0.7), 2.0);
    }

    #[test]
    fn test_exceedance_count_matches_tail_probability() {
        let n = 1000;
        let row: Vec<f64> = (0..n).map(|i| ((i * 7919) % n) as f64).collect();
        for q in [0.9, 0.95, 0.98, 0.99] {
            let t = quantile(&row, q);
            let count = row.iter().filter(|v| **v > t).count();
            let expected = ((1.0 - q) * n as f64).round() as usize;
            assert!(
                count.abs_diff(expected) <= 1,
                "q={q}: {count} exceedances, expected about {expected}"
            );
        }
    }

    #[test]
    fn test_mask_and_exceedances_agree() {
        let block = array![[0.1, 0.9, 0.5, 0.7], [1.0, 0.0, 0.2, 0.3]];
        let thresholds = row_thresholds(block.view(), 0.5);
        let mask = exceedance_mask(block.view(), &thresholds);
        for (i, row) in block.rows().into_iter().enumerate() {
            let exc = Exceedances::from_row(row, thresholds[i]);
            assert_eq!(exc.indices, mask_indices(mask.row(i)));
            assert!(exc.excesses.iter().all(|e| *e > 0.0));
        }
        assert_eq!(mask_indices(mask.row(0)), vec![1, 3]);
        assert_eq!(mask_indices(mask.row(1)), vec![0, 3]);
    }
}
