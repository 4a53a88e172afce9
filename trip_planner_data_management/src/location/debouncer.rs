use std::{future::Future, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncerState {
    Idle,
    /// Waiting for the quiet period to pass.
    Pending,
    /// The resolution callback is running.
    Resolving,
}

#[derive(Debug)]
struct Inner {
    generation: u64,
    state: DebouncerState,
    text: Option<String>,
    task: Option<AbortHandle>,
}

/// Turns a burst of query changes into one resolution after the input has been
/// quiet for `quiet_period`.
///
/// A change cancels the pending timer, or the running resolution, and starts over.
/// Repeating the text that is already pending or resolving changes nothing.
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct SearchDebouncer {
    quiet_period: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl SearchDebouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            inner: Arc::new(Mutex::new(Inner {
                generation: 0,
                state: DebouncerState::Idle,
                text: None,
                task: None,
            })),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn state(&self) -> DebouncerState {
        self.inner.lock().state
    }

    /// Records `text` and schedules `resolve(text)` for when the quiet period
    /// elapses without another change.
    pub fn on_query_changed<F, Fut>(&self, text: impl Into<String>, resolve: F)
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let text = text.into();
        let mut inner = self.inner.lock();

        if inner.state != DebouncerState::Idle && inner.text.as_deref() == Some(text.as_str()) {
            return;
        }

        if let Some(task) = inner.task.take() {
            debug!("Superseding pending search");
            task.abort();
        }

        inner.generation += 1;
        inner.state = DebouncerState::Pending;
        inner.text = Some(text.clone());

        let generation = inner.generation;
        let shared = self.inner.clone();
        let quiet_period = self.quiet_period;

        let task = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;

            {
                let mut inner = shared.lock();
                if inner.generation != generation {
                    return;
                }
                inner.state = DebouncerState::Resolving;
            }

            resolve(text).await;

            let mut inner = shared.lock();
            if inner.generation == generation {
                inner.state = DebouncerState::Idle;
                inner.task = None;
            }
        });
        inner.task = Some(task.abort_handle());
    }

    /// Drops the pending resolution, or aborts the running one.
    pub fn cancel_all(&self) {
        let mut inner = self.inner.lock();
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.generation += 1;
        inner.state = DebouncerState::Idle;
        inner.text = None;
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        if let Some(task) = self.inner.lock().task.take() {
            task.abort();
        }
    }
}
