//! Bounded worker pool for restore jobs.
//!
//! At most `concurrency` jobs of a batch run at once. Jobs are pulled from the
//! iterator only when a slot frees up. A job returning `Err` is fatal to the
//! batch: nothing new is dispatched, in-flight jobs finish, and the first
//! error is returned.

use crate::utils::errors::{RestoreError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    /// A pool running up to `concurrency` jobs at once; 0 behaves as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Run `job` over every item, returning results in item order.
    pub async fn run<I, F, Fut, T>(&self, items: I, job: F) -> Result<Vec<T>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let cancel = CancellationToken::new();
        let mut handles = Vec::new();

        for item in items {
            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|e| RestoreError::Worker(format!("Semaphore closed: {e}")))?
                }
                _ = cancel.cancelled() => break,
            };

            if cancel.is_cancelled() {
                break;
            }

            let future = job(item);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let result = future.await;
                if result.is_err() {
                    cancel.cancel();
                }
                drop(permit);
                result
            }));
        }

        if cancel.is_cancelled() {
            debug!(dispatched = handles.len(), "Batch aborted, waiting for running jobs");
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut first_error = None;

        for handle in handles {
            match handle.await {
                Ok(Ok(value)) => results.push(value),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!("Restore task panicked: {}", e);
                    first_error.get_or_insert(RestoreError::Worker(e.to_string()));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
