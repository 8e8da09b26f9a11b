//! Fixed-size pool of fallible worker tasks with first-error-wins joining.

use crate::error::DrainError;
use std::future::Future;
use tokio::task::JoinSet;
use tracing::warn;

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;

/// Worker tasks belonging to one stage of a run
///
/// Joining waits for every worker to report back. The first failure aborts
/// the remaining workers and is returned; later outcomes are discarded.
pub struct WorkerPool<T> {
    stage: &'static str,
    workers: JoinSet<Result<T, DrainError>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            workers: JoinSet::new(),
        }
    }

    /// Start a worker on the runtime
    pub fn spawn<F>(&mut self, worker: F)
    where
        F: Future<Output = Result<T, DrainError>> + Send + 'static,
    {
        self.workers.spawn(worker);
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Wait until every worker has completed, in completion order
    pub async fn join_all(mut self) -> Result<Vec<T>, DrainError> {
        let mut completed = Vec::with_capacity(self.workers.len());

        while let Some(joined) = self.workers.join_next().await {
            let outcome = joined.unwrap_or_else(|join_error| {
                Err(DrainError::WorkerAborted {
                    stage: self.stage,
                    message: join_error.to_string(),
                })
            });

            match outcome {
                Ok(report) => completed.push(report),
                Err(error) => {
                    warn!(
                        stage = self.stage,
                        error = %error,
                        transient = ?error.is_transient(),
                        remaining = self.workers.len(),
                        "Worker failed; aborting remaining workers"
                    );
                    self.workers.shutdown().await;
                    return Err(error);
                }
            }
        }

        Ok(completed)
    }
}
