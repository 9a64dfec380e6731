//! Parallel fan-out of per-row GPD fits.
//!
//! Rows of a transformed distance block are split into contiguous chunks,
//! one per worker. Each worker fits its chunk and sends the local dimensions
//! and shapes back on two one-shot channels; the coordinator reassembles
//! them by the chunk's row range, so output order never depends on
//! scheduling. A worker that panics, drops its channel, or misses the
//! deadline only affects its own rows, which are left as `NaN`.

use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::algorithms::gpd::{FitMethod, GpdEstimator};
use crate::algorithms::threshold::Exceedances;
use crate::error::{IndexError, Result};

/// Outcome of one chunk of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    /// Results arrived; individual rows may still be `NaN` if their fit failed.
    Completed,
    /// The worker panicked while fitting.
    Panicked,
    /// The worker went away without sending results.
    Disconnected,
    /// The results did not arrive before the deadline.
    TimedOut,
}

/// Status and row range of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub start: usize,
    pub end: usize,
    pub status: ChunkStatus,
    /// Rows of this chunk without a finite local dimension.
    pub failed_rows: usize,
}

impl ChunkReport {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Per-row fit results of one block, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFits {
    pub local_dim: Vec<f64>,
    pub shape: Vec<f64>,
    pub chunks: Vec<ChunkReport>,
}

impl RowFits {
    fn unfitted(n_rows: usize) -> Self {
        Self {
            local_dim: vec![f64::NAN; n_rows],
            shape: vec![f64::NAN; n_rows],
            chunks: Vec::new(),
        }
    }

    /// Whether every chunk reported back.
    pub fn is_complete(&self) -> bool {
        self.chunks.iter().all(|c| c.status == ChunkStatus::Completed)
    }

    /// Number of rows without a finite local dimension.
    pub fn failed_rows(&self) -> usize {
        self.local_dim.iter().filter(|v| !v.is_finite()).count()
    }
}

/// Split `0..n_rows` into at most `n_chunks` contiguous ranges whose lengths
/// differ by at most one, longer ranges first. Empty ranges are omitted.
pub fn partition_rows(n_rows: usize, n_chunks: usize) -> Vec<Range<usize>> {
    let k = n_chunks.max(1);
    let base = n_rows / k;
    let extra = n_rows % k;
    let mut out = Vec::with_capacity(k.min(n_rows));
    let mut start = 0;
    for c in 0..k {
        let len = base + usize::from(c < extra);
        if len == 0 {
            continue;
        }
        out.push(start..start + len);
        start += len;
    }
    out
}

/// Fit the rows of `range` on the calling thread.
///
/// Returns `(local_dim, shape)` for the chunk; rows whose fit fails are `NaN`.
fn fit_chunk<E: GpdEstimator + ?Sized>(
    block: &Array2<f64>,
    thresholds: &[f64],
    range: Range<usize>,
    estimator: &E,
) -> (Vec<f64>, Vec<f64>) {
    let mut local_dim = Vec::with_capacity(range.len());
    let mut shape = Vec::with_capacity(range.len());
    for i in range {
        let exc = Exceedances::from_row(block.row(i), thresholds[i]);
        match estimator.fit(&exc.excesses) {
            Ok(fit) => {
                local_dim.push(fit.local_dimension());
                shape.push(fit.shape);
            }
            Err(e) => {
                trace!(row = i, error = %e, "GPD fit failed");
                local_dim.push(f64::NAN);
                shape.push(f64::NAN);
            }
        }
    }
    (local_dim, shape)
}

/// Message sent on each of a worker's two channels.
#[cfg(feature = "parallel")]
type ChunkMessage = std::result::Result<Vec<f64>, ChunkStatus>;

/// Fans per-row GPD fits out over a bounded worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitDispatcher {
    n_jobs: usize,
    timeout: Option<Duration>,
}

impl FitDispatcher {
    /// # Errors
    /// `InvalidJobs` if `n_jobs == 0`.
    pub fn new(n_jobs: usize) -> Result<Self> {
        if n_jobs == 0 {
            return Err(IndexError::InvalidJobs(n_jobs));
        }
        Ok(Self {
            n_jobs,
            timeout: None,
        })
    }

    /// Bound the total wait for worker results. Chunks still running at the
    /// deadline are reported as [`ChunkStatus::TimedOut`].
    ///
    /// Only applies to the threaded path; the synchronous path always
    /// finishes its single chunk.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Fit every row of `block` above its threshold with `method`.
    pub fn fit_rows(
        &self,
        block: Arc<Array2<f64>>,
        thresholds: Arc<[f64]>,
        method: FitMethod,
    ) -> Result<RowFits> {
        self.fit_rows_with_estimator(block, thresholds, Arc::new(method))
    }

    /// As [`fit_rows`](Self::fit_rows), with any [`GpdEstimator`].
    ///
    /// # Errors
    /// - `Shape` if there is not exactly one threshold per row
    /// - `ThreadPool` if the worker pool cannot be created
    pub fn fit_rows_with_estimator<E: GpdEstimator + 'static>(
        &self,
        block: Arc<Array2<f64>>,
        thresholds: Arc<[f64]>,
        estimator: Arc<E>,
    ) -> Result<RowFits> {
        let n_rows = block.nrows();
        if thresholds.len() != n_rows {
            return Err(IndexError::Shape(format!(
                "{} thresholds for {} rows",
                thresholds.len(),
                n_rows
            )));
        }
        if n_rows == 0 {
            return Ok(RowFits::unfitted(0));
        }

        #[cfg(feature = "parallel")]
        if self.n_jobs > 1 {
            return self.fit_parallel(block, thresholds, estimator);
        }

        Ok(Self::fit_serial(&block, &thresholds, estimator.as_ref()))
    }

    fn fit_serial<E: GpdEstimator + ?Sized>(
        block: &Array2<f64>,
        thresholds: &[f64],
        estimator: &E,
    ) -> RowFits {
        let n_rows = block.nrows();
        let mut out = RowFits::unfitted(n_rows);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            fit_chunk(block, thresholds, 0..n_rows, estimator)
        }));
        let status = match outcome {
            Ok((local_dim, shape)) => {
                out.local_dim = local_dim;
                out.shape = shape;
                ChunkStatus::Completed
            }
            Err(_) => {
                warn!(rows = n_rows, "GPD fit panicked; rows left as NaN");
                ChunkStatus::Panicked
            }
        };
        let failed_rows = out.failed_rows();
        out.chunks.push(ChunkReport {
            start: 0,
            end: n_rows,
            status,
            failed_rows,
        });
        out
    }

    #[cfg(feature = "parallel")]
    fn fit_parallel<E: GpdEstimator + 'static>(
        &self,
        block: Arc<Array2<f64>>,
        thresholds: Arc<[f64]>,
        estimator: Arc<E>,
    ) -> Result<RowFits> {
        use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
        use std::time::Instant;

        let n_rows = block.nrows();
        let chunks = partition_rows(n_rows, self.n_jobs);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(chunks.len())
            .thread_name(|i| format!("gpd-fit-{i}"))
            .build()
            .map_err(|e| IndexError::ThreadPool(e.to_string()))?;
        tracing::debug!(rows = n_rows, chunks = chunks.len(), "dispatching GPD fits");

        let mut pending: Vec<(Range<usize>, Receiver<ChunkMessage>, Receiver<ChunkMessage>)> =
            Vec::with_capacity(chunks.len());
        for range in chunks {
            let (ld_tx, ld_rx) = bounded::<ChunkMessage>(1);
            let (shape_tx, shape_rx) = bounded::<ChunkMessage>(1);
            let block = Arc::clone(&block);
            let thresholds = Arc::clone(&thresholds);
            let estimator = Arc::clone(&estimator);
            let rows = range.clone();
            pool.spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    fit_chunk(&block, &thresholds, rows, estimator.as_ref())
                }));
                // The coordinator may have stopped listening after a timeout.
                match outcome {
                    Ok((local_dim, shape)) => {
                        let _ = ld_tx.send(Ok(local_dim));
                        let _ = shape_tx.send(Ok(shape));
                    }
                    Err(_) => {
                        let _ = ld_tx.send(Err(ChunkStatus::Panicked));
                        let _ = shape_tx.send(Err(ChunkStatus::Panicked));
                    }
                }
            });
            pending.push((range, ld_rx, shape_rx));
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let receive = |rx: &Receiver<ChunkMessage>| -> ChunkMessage {
            let received = match deadline {
                Some(d) => rx.recv_deadline(d),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => Err(ChunkStatus::TimedOut),
                Err(RecvTimeoutError::Disconnected) => Err(ChunkStatus::Disconnected),
            }
        };

        let mut out = RowFits::unfitted(n_rows);
        for (range, ld_rx, shape_rx) in pending {
            let status = match receive(&ld_rx).and_then(|ld| receive(&shape_rx).map(|s| (ld, s))) {
                Ok((local_dim, shape)) if local_dim.len() == range.len() && shape.len() == range.len() => {
                    out.local_dim[range.clone()].copy_from_slice(&local_dim);
                    out.shape[range.clone()].copy_from_slice(&shape);
                    ChunkStatus::Completed
                }
                Ok(_) => ChunkStatus::Disconnected,
                Err(status) => status,
            };
            let failed_rows = out.local_dim[range.clone()]
                .iter()
                .filter(|v| !v.is_finite())
                .count();
            if status != ChunkStatus::Completed {
                warn!(
                    start = range.start,
                    end = range.end,
                    ?status,
                    "GPD chunk failed; rows left as NaN"
                );
            }
            out.chunks.push(ChunkReport {
                start: range.start,
                end: range.end,
                status,
                failed_rows,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::gpd::GpdFit;
    use crate::algorithms::threshold::row_thresholds;
    use crate::error::FitError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_block(n_rows: usize, n_cols: usize) -> (Arc<Array2<f64>>, Arc<[f64]>) {
        let block = Array2::from_shape_fn((n_rows, n_cols), |(i, j)| {
            let x = ((i * 131 + j * 977) % 1009) as f64 / 1009.0;
            -(x + 1e-3).ln()
        });
        let thresholds: Arc<[f64]> = row_thresholds(block.view(), 0.9).into();
        (Arc::new(block), thresholds)
    }

    struct PanicOnce {
        calls: AtomicUsize,
    }

    impl GpdEstimator for PanicOnce {
        fn fit(&self, excesses: &[f64]) -> std::result::Result<GpdFit, FitError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("injected failure");
            }
            FitMethod::Mean.fit(excesses)
        }
    }

    struct Sleepy(Duration);

    impl GpdEstimator for Sleepy {
        fn fit(&self, excesses: &[f64]) -> std::result::Result<GpdFit, FitError> {
            std::thread::sleep(self.0);
            FitMethod::Mean.fit(excesses)
        }
    }

    #[test]
    fn test_partition_rows() {
        assert_eq!(partition_rows(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition_rows(4, 4), vec![0..1, 1..2, 2..3, 3..4]);
        assert_eq!(partition_rows(2, 5), vec![0..1, 1..2]);
        assert_eq!(partition_rows(7, 1), vec![0..7]);
        assert!(partition_rows(0, 3).is_empty());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert_eq!(FitDispatcher::new(0), Err(IndexError::InvalidJobs(0)));
    }

    #[test]
    fn test_threshold_count_checked() {
        let (block, _) = test_block(5, 50);
        let short: Arc<[f64]> = vec![0.0; 4].into();
        let err = FitDispatcher::new(1)
            .unwrap()
            .fit_rows(block, short, FitMethod::Mean)
            .unwrap_err();
        assert!(matches!(err, IndexError::Shape(_)));
    }

    #[test]
    fn test_serial_fits_every_row() {
        let (block, thresholds) = test_block(12, 200);
        let fits = FitDispatcher::new(1)
            .unwrap()
            .fit_rows(block, thresholds, FitMethod::Primary)
            .unwrap();
        assert_eq!(fits.local_dim.len(), 12);
        assert!(fits.is_complete());
        assert_eq!(fits.chunks.len(), 1);
        assert_eq!(fits.failed_rows(), 0);
    }

    #[test]
    fn test_jobs_do_not_change_results() {
        let (block, thresholds) = test_block(37, 300);
        let one = FitDispatcher::new(1)
            .unwrap()
            .fit_rows(Arc::clone(&block), Arc::clone(&thresholds), FitMethod::Primary)
            .unwrap();
        let four = FitDispatcher::new(4)
            .unwrap()
            .fit_rows(block, thresholds, FitMethod::Primary)
            .unwrap();
        assert_eq!(one.local_dim, four.local_dim);
        assert_eq!(one.shape, four.shape);
        assert!(four.is_complete());
    }

    #[test]
    fn test_degenerate_row_is_nan_only_there() {
        let mut block = Array2::from_shape_fn((3, 100), |(i, j)| (i + j) as f64 * 0.01 + 0.1);
        block.row_mut(1).fill(1.0);
        let thresholds: Arc<[f64]> = row_thresholds(block.view(), 0.9).into();
        let fits = FitDispatcher::new(1)
            .unwrap()
            .fit_rows(Arc::new(block), thresholds, FitMethod::Mean)
            .unwrap();
        assert!(fits.local_dim[0].is_finite());
        assert!(fits.local_dim[1].is_nan());
        assert!(fits.shape[1].is_nan());
        assert!(fits.local_dim[2].is_finite());
        assert!(fits.is_complete());
        assert_eq!(fits.chunks[0].failed_rows, 1);
    }

    #[test]
    fn test_serial_panic_is_contained() {
        let (block, thresholds) = test_block(6, 100);
        let fits = FitDispatcher::new(1)
            .unwrap()
            .fit_rows_with_estimator(
                block,
                thresholds,
                Arc::new(PanicOnce {
                    calls: AtomicUsize::new(0),
                }),
            )
            .unwrap();
        assert_eq!(fits.chunks[0].status, ChunkStatus::Panicked);
        assert!(fits.local_dim.iter().all(|v| v.is_nan()));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_worker_panic_marks_one_chunk() {
        let (block, thresholds) = test_block(40, 100);
        let fits = FitDispatcher::new(4)
            .unwrap()
            .fit_rows_with_estimator(
                block,
                thresholds,
                Arc::new(PanicOnce {
                    calls: AtomicUsize::new(0),
                }),
            )
            .unwrap();
        assert_eq!(fits.chunks.len(), 4);
        let panicked: Vec<&ChunkReport> = fits
            .chunks
            .iter()
            .filter(|c| c.status == ChunkStatus::Panicked)
            .collect();
        assert_eq!(panicked.len(), 1);
        assert_eq!(panicked[0].failed_rows, 10);
        for chunk in &fits.chunks {
            let all_nan = fits.local_dim[chunk.rows()].iter().all(|v| v.is_nan());
            let all_finite = fits.local_dim[chunk.rows()].iter().all(|v| v.is_finite());
            match chunk.status {
                ChunkStatus::Panicked => assert!(all_nan),
                _ => assert!(all_finite),
            }
        }
        assert_eq!(fits.failed_rows(), 10);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_deadline_abandons_slow_chunks() {
        let (block, thresholds) = test_block(4, 100);
        let fits = FitDispatcher::new(2)
            .unwrap()
            .with_timeout(Some(Duration::from_millis(20)))
            .fit_rows_with_estimator(block, thresholds, Arc::new(Sleepy(Duration::from_millis(400))))
            .unwrap();
        assert!(!fits.is_complete());
        assert!(fits.chunks.iter().all(|c| c.status == ChunkStatus::TimedOut));
        assert!(fits.local_dim.iter().all(|v| v.is_nan()));
    }
}
