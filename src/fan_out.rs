//! Bounded fan-out / fan-in over independent async tasks.
//!
//! One Tokio task is spawned per item. A semaphore caps how many run their
//! body at once, and every task reports through an mpsc channel sized to the
//! item count so no producer ever waits on a full queue. The collector drains
//! the channel until every sender is gone, which is the completion barrier.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};

/// Runs `task` once per item with at most `max_concurrency` bodies in flight,
/// returning every result in completion order.
///
/// A task that panics contributes no result; the panic is logged.
pub(crate) async fn fan_out<T, R, F, Fut>(items: Vec<T>, max_concurrency: usize, task: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let count = items.len();
    if count == 0 {
        return Vec::new();
    }

    let (tx, mut rx) = mpsc::channel(count);
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let task = Arc::new(task);
    let mut handles = Vec::with_capacity(count);

    for item in items {
        let tx = tx.clone();
        let semaphore = Arc::clone(&semaphore);
        let task = Arc::clone(&task);
        handles.push(tokio::spawn(async move {
            // Permit is dropped when this block exits (RAII)
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let result = task(item).await;
            if tx.send(result).await.is_err() {
                debug!("result collector went away");
            }
        }));
    }
    drop(tx);

    let mut results = Vec::with_capacity(count);
    while let Some(result) = rx.recv().await {
        results.push(result);
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "fan-out task panicked");
        }
    }

    debug!(tasks = count, results = results.len(), "fan-in complete");
    results
}
