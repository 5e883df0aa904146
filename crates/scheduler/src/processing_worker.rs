use std::future::Future;

use parking_lot::Mutex;

/// Ensures at most one receive-queue drain task runs at a time, mirroring
/// `__runProcessingTimer`/`__cancelProcessingTimer`'s `_processingTimerRunning`
/// flag guarded by its own small lock (distinct from the registry lock).
#[derive(Default)]
pub struct ProcessingWorker {
    running: Mutex<bool>,
}

impl ProcessingWorker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// If no worker is running, spawn one by calling `spawn` and mark it
    /// running; otherwise do nothing. `spawn` is invoked synchronously but
    /// the future it returns is handed to `tokio::spawn`, so the caller does
    /// not need to hold anything across an await point.
    pub fn ensure_running<F, Fut>(&self, spawn: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock();
        if *running {
            tracing::debug!("processing worker already running");
            return;
        }

        *running = true;
        drop(running);

        tracing::debug!("starting processing worker");
        tokio::spawn(spawn());
    }

    /// Called by the worker itself once the queue is drained.
    pub fn mark_stopped(&self) {
        *self.running.lock() = false;
        tracing::debug!("processing worker stopped");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn second_ensure_running_is_a_no_op_while_first_runs() {
        let worker = Arc::new(ProcessingWorker::new());
        let spawn_count = Arc::new(AtomicUsize::new(0));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let count_clone = spawn_count.clone();
        worker.ensure_running(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                let _ = rx.await;
            }
        });

        assert!(worker.is_running());

        let count_clone = spawn_count.clone();
        worker.ensure_running(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
            async {}
        });

        assert_eq!(spawn_count.load(Ordering::SeqCst), 1);

        let _ = tx.send(());
    }

    #[tokio::test]
    async fn mark_stopped_allows_a_new_worker_to_start() {
        let worker = ProcessingWorker::new();
        worker.ensure_running(|| async {});
        worker.mark_stopped();
        assert!(!worker.is_running());
    }
}
