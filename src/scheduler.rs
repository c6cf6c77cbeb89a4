//! Cancellable delayed callbacks and a cooperative cancellation signal
//!
//! Each timer runs on its own named thread and sleeps on a [`CancelToken`], so
//! cancelling wakes it immediately and the callback never runs afterwards
//! (unless it had already started).

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{FishingError, Result};

/// Upper bound for a single uninterrupted wait.
pub const POLL_SLICE: Duration = Duration::from_millis(100);

#[derive(Default)]
struct CancelInner {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Shared one-way cancellation flag with interruptible sleeps.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Sleep for `duration`, waking early on cancellation.
    /// Returns true if the token was (or became) cancelled.
    pub fn wait_cancelled(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = self.inner.cancelled.lock();
        loop {
            if *cancelled {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let slice = (deadline - now).min(POLL_SLICE);
            self.inner.wakeup.wait_for(&mut cancelled, slice);
        }
    }
}

/// Handle to a scheduled timer. Dropping it cancels the timer.
pub struct TimerHandle {
    name: String,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once the timer thread has returned (fired, or observed cancellation).
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        // Not joined: a callback may drop its own handle.
        self.cancel.cancel();
    }
}

fn spawn_timer<F>(name: &str, body: F) -> Result<TimerHandle>
where
    F: FnOnce(CancelToken) + Send + 'static,
{
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let thread = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || body(token))
        .map_err(|source| FishingError::Spawn {
            name: name.to_string(),
            source,
        })?;

    Ok(TimerHandle {
        name: name.to_string(),
        cancel,
        thread: Some(thread),
    })
}

/// Run `callback` once after `delay` unless cancelled first.
pub fn schedule_once<F>(name: &str, delay: Duration, callback: F) -> Result<TimerHandle>
where
    F: FnOnce() + Send + 'static,
{
    spawn_timer(name, move |token| {
        if !token.wait_cancelled(delay) {
            callback();
        }
    })
}

/// Run `callback` every `period` until cancelled.
pub fn schedule_repeating<F>(name: &str, period: Duration, mut callback: F) -> Result<TimerHandle>
where
    F: FnMut() + Send + 'static,
{
    spawn_timer(name, move |token| {
        while !token.wait_cancelled(period) {
            callback();
        }
    })
}

/// Holds at most one timer; arming a new one cancels the previous.
#[derive(Default)]
pub struct TimerSlot {
    current: Mutex<Option<TimerHandle>>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, handle: TimerHandle) {
        if let Some(previous) = self.current.lock().replace(handle) {
            if !previous.is_finished() {
                tracing::trace!("[TIMER] Replacing pending {}", previous.name());
            }
        }
    }

    pub fn cancel(&self) {
        self.current.lock().take();
    }

    /// True while a timer is held that has not yet run to completion.
    #[cfg(test)]
    fn is_armed(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
