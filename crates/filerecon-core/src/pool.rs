use crate::cancel::CancelToken;
use crate::error::Error;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::mpsc;
use tracing::debug;

/// Bounded worker pool shared by every scan an engine runs.
///
/// Each job owns one input and returns one output; nothing is shared between
/// jobs except the cancellation flag. Results are handed back to the caller's
/// thread in completion order, so merging never needs a lock.
pub struct WorkerPool {
    pool: ThreadPool,
    size: usize,
}

/// Summary of one `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub completed: usize,
    pub total: usize,
    pub cancelled: bool,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, Error> {
        let size = size.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("filerecon-worker-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build worker pool: {}", e)))?;
        debug!("Worker pool started with {} threads", size);
        Ok(Self { pool, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` over every input and feed each result to `on_result` on the
    /// calling thread as soon as it completes.
    ///
    /// Cancellation is checked before each result is accepted. Once it is
    /// observed, the remaining results are discarded and jobs that have not
    /// started yet return without doing any work.
    pub fn run<I, R, F, C>(
        &self,
        inputs: Vec<I>,
        cancel: &CancelToken,
        job: F,
        mut on_result: C,
    ) -> BatchOutcome
    where
        I: Send,
        R: Send,
        F: Fn(I) -> R + Sync,
        C: FnMut(usize, R),
    {
        let total = inputs.len();
        let mut completed = 0;
        let mut cancelled = false;

        if total == 0 {
            return BatchOutcome {
                completed,
                total,
                cancelled: cancel.is_cancelled(),
            };
        }

        let (tx, rx) = mpsc::channel::<Option<R>>();
        let job = &job;

        self.pool.in_place_scope(|scope| {
            for input in inputs {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = if cancel.is_cancelled() {
                        None
                    } else {
                        Some(job(input))
                    };
                    let _ = tx.send(result);
                });
            }
            drop(tx);

            for result in rx.iter() {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                if let Some(result) = result {
                    completed += 1;
                    on_result(completed, result);
                }
            }
        });

        BatchOutcome {
            completed,
            total,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_collects_every_result() {
        let pool = WorkerPool::new(4).unwrap();
        let cancel = CancelToken::new();
        let mut sum = 0;
        let outcome = pool.run((1..=100).collect(), &cancel, |n: u64| n * 2, |_, r| sum += r);
        assert_eq!(sum, 10_100);
        assert_eq!(outcome.completed, 100);
        assert_eq!(outcome.total, 100);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_cancel_from_result_handler_stops_batch() {
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        let outcome = pool.run((0..50).collect(), &cancel, |n: u32| n, |done, _| {
            if done == 3 {
                cancel.cancel();
            }
        });
        assert_eq!(outcome.completed, 3);
        assert!(outcome.cancelled);
    }

    #[test]
    fn test_cancel_after_last_result_is_not_reported() {
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        let outcome = pool.run((0..10).collect(), &cancel, |n: u32| n, |done, _| {
            if done == 10 {
                cancel.cancel();
            }
        });
        assert_eq!(outcome.completed, 10);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_cancelled_before_start_does_no_work() {
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = pool.run((0..10).collect(), &cancel, |n: u32| n, |_, _| {});
        assert_eq!(outcome.completed, 0);
        assert!(outcome.cancelled);
    }

    #[test]
    fn test_empty_input() {
        let pool = WorkerPool::new(1).unwrap();
        let outcome = pool.run(Vec::<u8>::new(), &CancelToken::new(), |n| n, |_, _| {});
        assert_eq!(outcome.completed, 0);
        assert!(!outcome.cancelled);
    }
}
