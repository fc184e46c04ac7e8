//! Cooperative shutdown signal.
//!
//! Every worker loop checks [`Shutdown::is_triggered`] at the top of an
//! iteration and sleeps only through [`Shutdown::wait`], so a trigger
//! wakes all of them at once instead of after their current backoff.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    stop: Mutex<bool>,
    wake: Condvar,
}

/// Cloneable shutdown handle.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake every waiter.
    pub fn trigger(&self) {
        let mut stop = self
            .inner
            .stop
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *stop = true;
        self.inner.wake.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self
            .inner
            .stop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for up to `timeout`.  Returns `true` if shutdown was
    /// requested (possibly before the call).
    pub fn wait(&self, timeout: Duration) -> bool {
        let stop = self
            .inner
            .stop
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (stop, _) = self
            .inner
            .wake
            .wait_timeout_while(stop, timeout, |stop| !*stop)
            .unwrap_or_else(PoisonError::into_inner);
        *stop
    }
}
