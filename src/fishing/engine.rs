//! The fishing state machine
//!
//! A run owns one background thread (the worker) that casts, waits for a bite
//! and reels. Everything that happens "later" (bite timeout, reel-back pulse,
//! the delayed arming of the timeout after a pulse) is a one-shot timer that
//! posts a [`WorkerEvent`] back to the worker, which is the only place cycle
//! state changes. Timer events carry the cast generation they were armed for;
//! anything from an older cast is dropped, never re-queued.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{FishingError, Result};
use crate::log_monitor::{LogDirWatcher, LogMarkers, LogTailer, CATCH_MARKER};
use crate::osc::InputSink;
use crate::scheduler::{schedule_once, schedule_repeating, CancelToken, TimerSlot};

use super::cast::{CastDuration, CastPlan};
use super::reel::{MarkerVerdict, ReelDetection, ReelOutcome};
use super::state::{Activity, BiteSource, CycleState, FishingState};
use super::status::{EngineShared, StatusDisplay, StatusUpdate};
use super::timings::EngineTimings;

/// Construction options for [`FishingEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub timings: EngineTimings,
    pub cast_duration: CastDuration,
    /// Follow newly created log files through filesystem notifications.
    pub watch_log_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerEvent {
    /// Nudge the worker to re-check its exit conditions.
    Wake,
    ReelBack { generation: u64, pulse: Duration },
    ArmBiteTimeout { generation: u64 },
    BiteTimeout { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReelKind {
    Bite,
    Timeout,
}

/// Serialises presses against the final release of a run.
///
/// Once closed no press can go out, so a worker that outlives its run can
/// never leave the button held.
struct InputGate {
    sink: Arc<dyn InputSink>,
    open: Mutex<bool>,
}

impl InputGate {
    fn new(sink: Arc<dyn InputSink>) -> Self {
        Self {
            sink,
            open: Mutex::new(true),
        }
    }

    /// Press unless the gate is closed. Returns whether the press was sent.
    fn press(&self) -> bool {
        let open = self.open.lock();
        if *open {
            self.sink.send_use_right(true);
        }
        *open
    }

    fn release(&self) {
        let _open = self.open.lock();
        self.sink.send_use_right(false);
    }

    fn close(&self) {
        let mut open = self.open.lock();
        *open = false;
        self.sink.send_use_right(false);
    }
}

#[derive(Default)]
struct CycleTimers {
    bite_timeout: TimerSlot,
    reel_back: TimerSlot,
    timeout_chain: TimerSlot,
}

impl CycleTimers {
    fn cancel_all(&self) {
        self.bite_timeout.cancel();
        self.reel_back.cancel();
        self.timeout_chain.cancel();
    }
}

/// Handles the engine keeps for the active run.
struct RunHandle {
    cancel: CancelToken,
    gate: Arc<InputGate>,
    timers: Arc<CycleTimers>,
    wake: Sender<WorkerEvent>,
    thread: Option<JoinHandle<()>>,
}

impl RunHandle {
    /// Stop the run without waiting for its thread.
    fn halt(&self) {
        self.timers.cancel_all();
        self.gate.close();
        self.cancel.cancel();
        let _ = self.wake.send(WorkerEvent::Wake);
    }

    /// Wait up to `grace` for the worker. Returns false if it had to be detached.
    fn join(mut self, grace: Duration) -> bool {
        let Some(thread) = self.thread.take() else {
            return true;
        };

        let deadline = Instant::now() + grace;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                tracing::error!(
                    "[ENGINE] Fishing thread did not exit within {:?}; detaching it",
                    grace
                );
                // The gate is closed, so this release is final.
                self.gate.close();
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }

        if thread.join().is_err() {
            tracing::error!("[ENGINE] Fishing thread panicked");
        }
        true
    }
}

/// Automates casting and reeling for as long as a run is active.
pub struct FishingEngine {
    shared: Arc<EngineShared>,
    input: Arc<dyn InputSink>,
    tailer: Arc<LogTailer>,
    timings: EngineTimings,
    run: Mutex<Option<RunHandle>>,
    display: TimerSlot,
    watcher: Mutex<Option<LogDirWatcher>>,
}

impl FishingEngine {
    /// Create an idle engine. The button is released immediately so the game
    /// starts from a known input state.
    pub fn new(
        input: Arc<dyn InputSink>,
        tailer: Arc<LogTailer>,
        options: EngineOptions,
    ) -> Result<Self> {
        let shared = Arc::new(EngineShared::new(options.cast_duration));
        input.send_use_right(false);

        let watcher = if options.watch_log_dir {
            match LogDirWatcher::spawn(Arc::clone(&tailer)) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!("[ENGINE] Not watching for new logs: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let timings = options.timings;
        let display = TimerSlot::new();
        let display_shared = Arc::clone(&shared);
        let mut status_display = StatusDisplay::new(
            Instant::now(),
            timings.status_waiting_label(),
            timings.status_count_label(),
        );
        display.arm(schedule_repeating(
            "status-display",
            timings.status_tick(),
            move || {
                display_shared
                    .refresh_display(|view| status_display.tick(Instant::now(), view));
            },
        )?);

        Ok(Self {
            shared,
            input,
            tailer,
            timings,
            run: Mutex::new(None),
            display,
            watcher: Mutex::new(watcher),
        })
    }

    /// Begin a run. Returns `Ok(false)` if one is already active.
    pub fn start(&self) -> Result<bool> {
        if self.shared.is_closing() {
            return Err(FishingError::Closing);
        }

        let mut run = self.run.lock();
        if self.shared.is_running() {
            tracing::info!("[ENGINE] Already running");
            return Ok(false);
        }
        if let Some(previous) = run.take() {
            previous.halt();
            previous.join(self.timings.shutdown_grace());
        }

        let cancel = CancelToken::new();
        let gate = Arc::new(InputGate::new(Arc::clone(&self.input)));
        let timers = Arc::new(CycleTimers::default());
        let (events_tx, events_rx) = mpsc::channel();

        let worker = Worker {
            shared: Arc::clone(&self.shared),
            gate: Arc::clone(&gate),
            tailer: Arc::clone(&self.tailer),
            timings: self.timings.clone(),
            cancel: cancel.clone(),
            timers: Arc::clone(&timers),
            events_tx: events_tx.clone(),
            events_rx,
            cycle: CycleState::new(Instant::now()),
            generation: 0,
        };

        self.shared.reset_count();
        self.shared.set_running(true);
        self.shared
            .set_phase(FishingState::Casting, Activity::StartingCast);

        let thread = thread::Builder::new()
            .name("fishing-loop".to_string())
            .spawn(move || worker_main(worker));
        let thread = match thread {
            Ok(thread) => thread,
            Err(source) => {
                self.shared.set_running(false);
                self.shared.set_phase(FishingState::Stopped, Activity::Stopped);
                return Err(FishingError::Spawn {
                    name: "fishing-loop".to_string(),
                    source,
                });
            }
        };

        *run = Some(RunHandle {
            cancel,
            gate,
            timers,
            wake: events_tx,
            thread: Some(thread),
        });

        tracing::info!(
            "[ENGINE] Started, cast duration {}",
            self.shared.cast_duration()
        );
        Ok(true)
    }

    /// Stop the current run: release the button, cancel timers and wait (bounded)
    /// for the fishing thread. Safe to call in any state.
    pub fn stop(&self) {
        let handle = self.run.lock().take();
        self.shared.set_running(false);

        match &handle {
            Some(handle) => handle.halt(),
            None => self.input.send_use_right(false),
        }
        self.shared.set_phase(FishingState::Stopped, Activity::Stopped);

        if let Some(handle) = handle {
            handle.join(self.timings.shutdown_grace());
            // The worker may have published one last phase before exiting.
            self.shared.set_phase(FishingState::Stopped, Activity::Stopped);
        }
        tracing::info!("[ENGINE] Stopped");
    }

    /// Stop everything for good. Later `start` calls fail with `Closing`.
    pub fn shutdown(&self) {
        if !self.shared.begin_closing() {
            return;
        }
        tracing::info!("[ENGINE] Shutting down");
        self.display.cancel();
        self.stop();
        self.watcher.lock().take();
    }

    /// Change the cast duration; takes effect on the next cast.
    pub fn set_cast_duration(&self, secs: f64) -> Result<CastDuration> {
        let duration = CastDuration::from_secs(secs)?;
        self.shared.set_cast_duration(duration);
        tracing::info!("[ENGINE] Cast duration set to {}", duration);
        Ok(duration)
    }

    pub fn cast_duration(&self) -> CastDuration {
        self.shared.cast_duration()
    }

    pub fn subscribe(&self) -> Receiver<StatusUpdate> {
        self.shared.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn state(&self) -> FishingState {
        self.shared.state()
    }

    pub fn activity(&self) -> Activity {
        self.shared.activity()
    }

    pub fn fish_count(&self) -> u32 {
        self.shared.fish_count()
    }

    pub fn status_text(&self) -> String {
        self.shared.status_text()
    }

    pub fn status_json(&self) -> String {
        self.shared.to_json()
    }

    pub fn tailer(&self) -> &Arc<LogTailer> {
        &self.tailer
    }
}

impl Drop for FishingEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_main(mut worker: Worker) {
    let shared = Arc::clone(&worker.shared);
    let gate = Arc::clone(&worker.gate);
    let cancel = worker.cancel.clone();

    let result = panic::catch_unwind(AssertUnwindSafe(|| worker.run()));
    let failure = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(
            payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string()),
        ),
    };

    if let Some(message) = failure {
        tracing::error!("[ENGINE] Fishing loop failed: {}", message);
        gate.close();
        if !cancel.is_cancelled() {
            shared.set_running(false);
            shared.set_phase(FishingState::Stopped, Activity::Stopped);
        }
    }
    tracing::debug!("[ENGINE] Fishing loop exited");
}

/// The fishing thread of one run.
struct Worker {
    shared: Arc<EngineShared>,
    gate: Arc<InputGate>,
    tailer: Arc<LogTailer>,
    timings: EngineTimings,
    cancel: CancelToken,
    timers: Arc<CycleTimers>,
    events_tx: Sender<WorkerEvent>,
    events_rx: Receiver<WorkerEvent>,
    cycle: CycleState,
    generation: u64,
}

impl Worker {
    fn should_exit(&self) -> bool {
        self.cancel.is_cancelled() || !self.shared.is_running() || self.shared.is_closing()
    }

    fn run(&mut self) -> Result<()> {
        self.tailer.skip_backlog();
        self.cast()?;

        while !self.should_exit() {
            match self.events_rx.recv_timeout(self.timings.poll_interval()) {
                Ok(event) => self.handle_event(event)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if self.should_exit() {
                break;
            }
            self.poll_log()?;
        }
        Ok(())
    }

    fn handle_event(&mut self, event: WorkerEvent) -> Result<()> {
        match event {
            WorkerEvent::Wake => {}
            WorkerEvent::ReelBack { generation, pulse } if generation == self.generation => {
                self.reel_back(pulse);
            }
            WorkerEvent::ArmBiteTimeout { generation } if generation == self.generation => {
                self.arm_bite_timeout()?;
            }
            WorkerEvent::BiteTimeout { generation } if generation == self.generation => {
                self.on_bite_timeout()?;
            }
            stale => tracing::debug!("[ENGINE] Dropping stale {:?}", stale),
        }
        Ok(())
    }

    /// Hold the button for `duration`. Returns false if the hold was cut short.
    fn hold(&self, duration: Duration) -> bool {
        if !self.gate.press() {
            return false;
        }
        let interrupted = self.cancel.wait_cancelled(duration);
        self.gate.release();
        !interrupted
    }

    fn cast(&mut self) -> Result<()> {
        if self.should_exit() {
            return Ok(());
        }

        if self.cycle.first_cast {
            self.cycle.first_cast = false;
        } else {
            self.shared
                .set_phase(FishingState::Casting, Activity::Preparing);
            if self.cancel.wait_cancelled(self.timings.recast_delay()) {
                return Ok(());
            }
        }

        self.generation += 1;
        self.timers.cancel_all();

        let plan = CastPlan::for_duration(self.shared.cast_duration());
        self.shared
            .set_phase(FishingState::Casting, Activity::ChargingCast);
        tracing::debug!(
            "[CAST] Holding {:?}, reel-back {:?}",
            plan.press,
            plan.reel_back
        );

        if !self.hold(plan.press) || self.should_exit() {
            return Ok(());
        }

        self.cycle.last_cast_at = Some(Instant::now());
        self.shared.enter_waiting();

        match plan.reel_back {
            Some(pulse) => self.schedule_reel_back(pulse),
            None => self.arm_bite_timeout(),
        }
    }

    fn schedule_reel_back(&self, pulse: Duration) -> Result<()> {
        let generation = self.generation;
        let delay = self.timings.reel_back_delay();

        let tx = self.events_tx.clone();
        self.timers.reel_back.arm(schedule_once("reel-back", delay, move || {
            let _ = tx.send(WorkerEvent::ReelBack { generation, pulse });
        })?);

        let tx = self.events_tx.clone();
        let chain = delay + pulse + self.timings.reel_back_slack();
        self.timers
            .timeout_chain
            .arm(schedule_once("bite-timeout-chain", chain, move || {
                let _ = tx.send(WorkerEvent::ArmBiteTimeout { generation });
            })?);
        Ok(())
    }

    fn arm_bite_timeout(&self) -> Result<()> {
        if self.should_exit() {
            return Ok(());
        }
        let generation = self.generation;
        let tx = self.events_tx.clone();
        self.timers.bite_timeout.arm(schedule_once(
            "bite-timeout",
            self.timings.bite_timeout(),
            move || {
                let _ = tx.send(WorkerEvent::BiteTimeout { generation });
            },
        )?);
        tracing::debug!(
            "[CAST] Bite timeout armed for {:?}",
            self.timings.bite_timeout()
        );
        Ok(())
    }

    fn reel_back(&self, pulse: Duration) {
        if self.should_exit() {
            return;
        }
        tracing::debug!("[CAST] Reel-back pulse for {:?}", pulse);
        self.hold(pulse);
    }

    fn poll_log(&mut self) -> Result<()> {
        let text = self.tailer.poll_new_content();
        if text.is_empty() {
            return Ok(());
        }

        let markers = LogMarkers::scan(&text);
        if !markers.any() {
            return Ok(());
        }
        if markers.catch && self.on_bite(BiteSource::CatchMarker)? {
            return Ok(());
        }
        if markers.pickup {
            self.on_bite(BiteSource::Pickup)?;
        }
        Ok(())
    }

    /// React to a bite marker. Returns whether a reel cycle ran.
    fn on_bite(&mut self, source: BiteSource) -> Result<bool> {
        let now = Instant::now();
        if let Err(reason) = self.cycle.check_bite(self.shared.flags(), now, &self.timings) {
            tracing::debug!("[ENGINE] Ignoring {:?}: {:?}", source, reason);
            return Ok(false);
        }

        let shared = Arc::clone(&self.shared);
        let Some(_guard) = shared.try_protect() else {
            tracing::debug!("[ENGINE] Ignoring {:?}: reel in progress", source);
            return Ok(false);
        };

        tracing::info!("[ENGINE] Bite detected ({:?})", source);
        self.cycle.last_cycle_end = now;
        self.reel(ReelKind::Bite);
        let recast = self.cast();
        self.cycle.last_cycle_end = Instant::now();
        recast.map(|()| true)
    }

    fn on_bite_timeout(&mut self) -> Result<()> {
        if let Err(reason) = CycleState::check_timeout(self.shared.flags(), self.shared.state()) {
            tracing::debug!("[ENGINE] Ignoring bite timeout: {:?}", reason);
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let Some(_guard) = shared.try_protect() else {
            tracing::debug!("[ENGINE] Ignoring bite timeout: reel in progress");
            return Ok(());
        };

        tracing::info!("[ENGINE] No bite within {:?}, reeling", self.timings.bite_timeout());
        self.shared
            .set_phase(FishingState::TimedOutReeling, Activity::TimeoutReel);
        self.reel(ReelKind::Timeout);
        self.cast()
    }

    fn reel(&mut self, kind: ReelKind) -> ReelOutcome {
        self.timers.cancel_all();
        let state = match kind {
            ReelKind::Bite => FishingState::Reeling,
            ReelKind::Timeout => FishingState::TimedOutReeling,
        };
        self.shared.set_phase(state, Activity::Reeling);

        let mut detection = ReelDetection::new(
            self.timings.marker_debounce(),
            self.timings.single_marker_timeout(),
        );
        let started = Instant::now();

        if self.gate.press() {
            while started.elapsed() < self.timings.reel_max() {
                if self.tailer.poll_new_content().contains(CATCH_MARKER) {
                    match detection.observe(Instant::now()) {
                        MarkerVerdict::First => tracing::debug!("[REEL] First catch marker"),
                        MarkerVerdict::Confirmed => {
                            tracing::debug!(
                                "[REEL] Second catch marker after {:?}",
                                started.elapsed()
                            );
                            break;
                        }
                        verdict => tracing::debug!("[REEL] Catch marker ignored: {:?}", verdict),
                    }
                }
                if detection.single_expired(Instant::now()) {
                    tracing::debug!("[REEL] No second catch marker in time");
                    break;
                }
                if self.cancel.wait_cancelled(self.timings.poll_interval()) {
                    break;
                }
            }
        }
        self.gate.release();

        let outcome = detection.outcome();
        tracing::debug!(
            "[REEL] {:?} after {:?} with {} catch marker(s)",
            outcome,
            started.elapsed(),
            detection.marker_count()
        );
        if self.should_exit() {
            return outcome;
        }

        let activity = match outcome {
            ReelOutcome::Complete => {
                let count = self.shared.increment_catch();
                tracing::info!("[REEL] Catch #{} landed", count);
                Activity::ReelComplete
            }
            ReelOutcome::SingleTimeout => Activity::ReelSingleTimeout,
            ReelOutcome::Timeout => Activity::ReelTimeout,
        };
        self.shared.set_phase(state, activity);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<bool>>,
    }

    impl InputSink for Recorder {
        fn send_use_right(&self, active: bool) {
            self.sent.lock().push(active);
        }
    }

    #[test]
    fn test_closed_gate_refuses_press() {
        let recorder = Arc::new(Recorder::default());
        let gate = InputGate::new(recorder.clone());

        assert!(gate.press());
        gate.close();
        assert!(!gate.press());
        gate.release();

        assert_eq!(*recorder.sent.lock(), vec![true, false, false]);
    }

    #[test]
    fn test_new_engine_releases_input() {
        let recorder = Arc::new(Recorder::default());
        let tailer = Arc::new(LogTailer::new("/definitely/not/here", "output_log_*.txt"));
        let engine = FishingEngine::new(recorder.clone(), tailer, EngineOptions::default()).unwrap();

        assert_eq!(*recorder.sent.lock(), vec![false]);
        assert_eq!(engine.state(), FishingState::Idle);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_start_after_shutdown_fails() {
        let recorder = Arc::new(Recorder::default());
        let tailer = Arc::new(LogTailer::new("/definitely/not/here", "output_log_*.txt"));
        let engine = FishingEngine::new(recorder, tailer, EngineOptions::default()).unwrap();

        engine.shutdown();
        assert!(matches!(engine.start(), Err(FishingError::Closing)));
        assert_eq!(engine.state(), FishingState::Stopped);
    }

    #[test]
    fn test_invalid_cast_duration_keeps_previous() {
        let recorder = Arc::new(Recorder::default());
        let tailer = Arc::new(LogTailer::new("/definitely/not/here", "output_log_*.txt"));
        let engine = FishingEngine::new(recorder, tailer, EngineOptions::default()).unwrap();

        engine.set_cast_duration(0.4).unwrap();
        assert!(engine.set_cast_duration(2.5).is_err());
        assert_eq!(engine.cast_duration().as_millis(), 400);
    }
}
