use std::collections::VecDeque;

use parking_lot::Mutex;

/// An unbounded FIFO queue of `(applicationName, applicationData)` pairs
/// awaiting processing by the receive-mode worker.
///
/// `pop` checks emptiness and dequeues under a single lock acquisition, so a
/// `push` racing with the worker's last `pop` before it exits is never lost —
/// see `DESIGN.md`'s note on the source's `qsize()`-then-`get()` race.
#[derive(Default)]
pub struct ReceiveQueue {
    inner: Mutex<VecDeque<(String, Vec<u8>)>>,
}

impl ReceiveQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, application_name: impl Into<String>, data: Vec<u8>) {
        self.inner.lock().push_back((application_name.into(), data));
    }

    #[must_use]
    pub fn pop(&self) -> Option<(String, Vec<u8>)> {
        self.inner.lock().pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
