use std::future::Future;
use std::time::Duration;

/// A cancellable one-shot delayed task, standing in for the source's
/// `threading.Timer(period, callback).start()` / `.cancel()`.
///
/// Only the delay phase is cancellable. Once the delay elapses, the callback
/// is handed off to its own, untracked task before this task's own future
/// returns — there is no `.await` between the sleep completing and that
/// hand-off, so `abort()` can never land inside it. This matters because the
/// source guarantees "an already-firing timer is allowed to complete" and
/// "no cancellation of in-flight subprocesses": tracking the callback under
/// the same `JoinHandle` as the sleep would let a racing `disable`/`delete`
/// abort the callback mid-subprocess, orphaning the child process and
/// skipping its counter update entirely.
pub struct PollTimer {
    handle: tokio::task::JoinHandle<()>,
}

impl PollTimer {
    /// Spawn `task` to run once, after `delay` has elapsed.
    pub fn spawn<F, Fut>(delay: Duration, task: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(task());
        });

        Self { handle }
    }

    /// Cancel the timer's delay phase. A no-op if the delay has already
    /// elapsed and the callback has since been handed off to its own task.
    pub fn cancel(self) {
        self.handle.abort();
    }
}
