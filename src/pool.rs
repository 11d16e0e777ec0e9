use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use futures::future::join_all;
use log::{debug, warn};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::error::Result;

pub const DEFAULT_WORKERS: usize = 30;

/// Fixed-width fan-out over a batch of keyed work items.
///
/// Every call to [`WorkerPool::dispatch`] starts a fresh set of workers; nothing is
/// shared between batches.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Runs `work` for every item and returns the successful results keyed by item.
    ///
    /// All items are queued up front and the queue is closed; `workers` workers drain it
    /// concurrently. A failed item is logged and left out of the result. The call returns
    /// once the queue is empty and every worker has finished.
    pub async fn dispatch<K, V, I, F, Fut>(&self, stage: &str, items: I, work: F) -> HashMap<K, V>
    where
        I: IntoIterator<Item = K>,
        K: Eq + Hash + Clone + Display,
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut queued = 0usize;
        for item in items {
            if tx.send(item).is_err() {
                break;
            }
            queued += 1;
        }
        drop(tx);
        debug!("{stage}: dispatching {queued} items to {} workers", self.workers);

        let queue = AsyncMutex::new(rx);
        let results = Mutex::new(HashMap::with_capacity(queued));

        let queue = &queue;
        let results = &results;
        let work = &work;
        let workers = (0..self.workers).map(|_| async move {
            loop {
                let next = {
                    let mut rx = queue.lock().await;
                    rx.recv().await
                };
                let Some(key) = next else {
                    break;
                };

                match work(key.clone()).await {
                    Ok(value) => {
                        results
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(key, value);
                    }
                    Err(e) => warn!("{stage}: dropping {key}: {e}"),
                }
            }
        });
        join_all(workers).await;

        let results = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));
        debug!("{stage}: {} of {queued} items succeeded", results.len());
        results
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}
