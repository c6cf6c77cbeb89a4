//! Shared engine state and the status stream for the presentation layer

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::cast::CastDuration;
use super::state::{count_label, Activity, CycleFlags, FishingState};

/// One status change pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub text: String,
    pub state: FishingState,
    pub fish_count: u32,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct Phase {
    state: FishingState,
    activity: Activity,
}

/// What the status display needs to pick a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayView {
    pub running: bool,
    pub state: FishingState,
    pub activity: Activity,
    pub fish_count: u32,
    pub waiting_epoch: u64,
}

/// State shared between the fishing thread, the status timer and callers.
///
/// Only the fishing thread changes the phase and the counter while a run is
/// active; everything else reads.
pub struct EngineShared {
    running: AtomicBool,
    protected: AtomicBool,
    closing: AtomicBool,
    fish_count: AtomicU32,
    waiting_epoch: AtomicU64,
    phase: RwLock<Phase>,
    cast_duration: RwLock<CastDuration>,
    shown: Mutex<(String, u32)>,
    subscribers: Mutex<Vec<Sender<StatusUpdate>>>,
}

impl EngineShared {
    pub fn new(cast_duration: CastDuration) -> Self {
        Self {
            running: AtomicBool::new(false),
            protected: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            fish_count: AtomicU32::new(0),
            waiting_epoch: AtomicU64::new(0),
            phase: RwLock::new(Phase {
                state: FishingState::Idle,
                activity: Activity::Idle,
            }),
            cast_duration: RwLock::new(cast_duration),
            shown: Mutex::new((Activity::Idle.description().to_string(), 0)),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Mark the engine as closing; returns false if it already was.
    pub fn begin_closing(&self) -> bool {
        !self.closing.swap(true, Ordering::SeqCst)
    }

    pub fn is_protected(&self) -> bool {
        self.protected.load(Ordering::SeqCst)
    }

    /// Take the re-entrancy guard. `None` if a reel is already in progress.
    pub fn try_protect(&self) -> Option<ProtectedGuard<'_>> {
        self.protected
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ProtectedGuard { shared: self })
    }

    pub fn flags(&self) -> CycleFlags {
        CycleFlags {
            running: self.is_running(),
            protected: self.is_protected(),
            closing: self.is_closing(),
        }
    }

    pub fn state(&self) -> FishingState {
        self.phase.read().state
    }

    pub fn activity(&self) -> Activity {
        self.phase.read().activity
    }

    /// Move to a new phase and publish its label.
    pub fn set_phase(&self, state: FishingState, activity: Activity) {
        self.update_phase(state, activity, false);
    }

    /// Enter `WaitingForBite` and restart the label alternation.
    pub fn enter_waiting(&self) {
        self.update_phase(FishingState::WaitingForBite, Activity::WaitingForBite, true);
    }

    fn update_phase(&self, state: FishingState, activity: Activity, new_wait: bool) {
        let mut phase = self.phase.write();
        if new_wait {
            self.waiting_epoch.fetch_add(1, Ordering::SeqCst);
        }
        *phase = Phase { state, activity };
        // Published under the write lock so no display label computed for the
        // previous phase can follow it.
        self.publish(activity.description().to_string(), state);
    }

    pub fn fish_count(&self) -> u32 {
        self.fish_count.load(Ordering::SeqCst)
    }

    pub fn increment_catch(&self) -> u32 {
        self.fish_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_count(&self) {
        self.fish_count.store(0, Ordering::SeqCst);
    }

    pub fn cast_duration(&self) -> CastDuration {
        *self.cast_duration.read()
    }

    pub fn set_cast_duration(&self, duration: CastDuration) {
        *self.cast_duration.write() = duration;
    }

    fn view_of(&self, phase: &Phase) -> DisplayView {
        DisplayView {
            running: self.is_running(),
            state: phase.state,
            activity: phase.activity,
            fish_count: self.fish_count(),
            waiting_epoch: self.waiting_epoch.load(Ordering::SeqCst),
        }
    }

    /// Label currently shown.
    pub fn status_text(&self) -> String {
        self.shown.lock().0.clone()
    }

    /// Compute a label from a consistent view and publish it before the phase
    /// can change.
    pub fn refresh_display(&self, label: impl FnOnce(&DisplayView) -> String) {
        let phase = self.phase.read();
        let text = label(&self.view_of(&phase));
        self.publish(text, phase.state);
    }

    /// Notify subscribers if the label or counter changed. Callers hold the
    /// phase lock.
    fn publish(&self, text: String, state: FishingState) {
        let fish_count = self.fish_count();
        {
            let mut shown = self.shown.lock();
            if shown.0 == text && shown.1 == fish_count {
                return;
            }
            *shown = (text.clone(), fish_count);
        }

        let update = StatusUpdate {
            text,
            state,
            fish_count,
            at: Utc::now(),
        };
        self.subscribers
            .lock()
            .retain(|tx| tx.send(update.clone()).is_ok());
    }

    pub fn subscribe(&self) -> Receiver<StatusUpdate> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Get status as JSON string for the presentation layer
    pub fn to_json(&self) -> String {
        let phase = *self.phase.read();
        serde_json::json!({
            "running": self.is_running(),
            "state": phase.state,
            "activity": phase.activity.description(),
            "status": self.status_text(),
            "fish_count": self.fish_count(),
            "cast_duration": self.cast_duration().as_secs_f64(),
        })
        .to_string()
    }
}

/// Clears the re-entrancy flag when dropped, including during unwinding.
pub struct ProtectedGuard<'a> {
    shared: &'a EngineShared,
}

impl Drop for ProtectedGuard<'_> {
    fn drop(&mut self) {
        self.shared.protected.store(false, Ordering::SeqCst);
    }
}

/// Alternates the waiting label with the catch count while waiting for a bite.
#[derive(Debug)]
pub struct StatusDisplay {
    showing_count: bool,
    last_switch: Instant,
    epoch: u64,
    waiting_for: Duration,
    count_for: Duration,
}

impl StatusDisplay {
    pub fn new(now: Instant, waiting_for: Duration, count_for: Duration) -> Self {
        Self {
            showing_count: false,
            last_switch: now,
            epoch: 0,
            waiting_for,
            count_for,
        }
    }

    pub fn tick(&mut self, now: Instant, view: &DisplayView) -> String {
        if !view.running || view.state != FishingState::WaitingForBite {
            self.showing_count = false;
            return view.activity.description().to_string();
        }

        if view.waiting_epoch != self.epoch {
            self.epoch = view.waiting_epoch;
            self.showing_count = false;
            self.last_switch = now;
        }

        let elapsed = now.saturating_duration_since(self.last_switch);
        if self.showing_count && elapsed >= self.count_for {
            self.showing_count = false;
            self.last_switch = now;
        } else if !self.showing_count && elapsed >= self.waiting_for {
            self.showing_count = true;
            self.last_switch = now;
        }

        if self.showing_count {
            count_label(view.fish_count)
        } else {
            Activity::WaitingForBite.description().to_string()
        }
    }
}
