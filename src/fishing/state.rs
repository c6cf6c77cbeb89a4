//! Cycle states, status labels and the guards that decide whether to reel

use std::time::Instant;

use serde::Serialize;

use super::timings::EngineTimings;

/// Logical state of the fishing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FishingState {
    Idle,
    Casting,
    WaitingForBite,
    Reeling,
    /// Reeling because nothing bit before the bite timeout.
    TimedOutReeling,
    Stopped,
}

/// Fine-grained activity shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Activity {
    Idle,
    StartingCast,
    Preparing,
    ChargingCast,
    WaitingForBite,
    TimeoutReel,
    Reeling,
    ReelComplete,
    ReelSingleTimeout,
    ReelTimeout,
    Stopped,
}

impl Activity {
    /// Status label for this activity.
    pub fn description(&self) -> &'static str {
        match self {
            Activity::Idle => "Idle",
            Activity::StartingCast => "Starting cast",
            Activity::Preparing => "Preparing",
            Activity::ChargingCast => "Charging cast",
            Activity::WaitingForBite => "Waiting for bite",
            Activity::TimeoutReel => "Timeout, reeling",
            Activity::Reeling => "Reeling",
            Activity::ReelComplete => "Reel complete",
            Activity::ReelSingleTimeout => "Reel timeout (single)",
            Activity::ReelTimeout => "Reel timeout",
            Activity::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Label shown in place of the waiting label every few seconds.
pub fn count_label(fish_count: u32) -> String {
    format!("Caught: {}", fish_count)
}

/// What triggered a reel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiteSource {
    CatchMarker,
    Pickup,
}

/// Why an event did not lead to a reel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotRunning,
    Closing,
    /// A reel or cast is already in progress.
    Protected,
    /// Residual marker from the previous cycle.
    TooSoonAfterCast,
    CycleCooldown,
    NotWaiting,
}

/// Snapshot of the shared run flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleFlags {
    pub running: bool,
    pub protected: bool,
    pub closing: bool,
}

/// Per-run bookkeeping owned by the fishing thread.
#[derive(Debug, Clone)]
pub struct CycleState {
    pub first_cast: bool,
    pub last_cast_at: Option<Instant>,
    pub last_cycle_end: Instant,
}

impl CycleState {
    pub fn new(now: Instant) -> Self {
        Self {
            first_cast: true,
            last_cast_at: None,
            last_cycle_end: now,
        }
    }

    /// Decide whether a catch marker or pickup may start a reel.
    pub fn check_bite(
        &self,
        flags: CycleFlags,
        now: Instant,
        timings: &EngineTimings,
    ) -> Result<(), Rejection> {
        if let Some(cast_at) = self.last_cast_at {
            if now.saturating_duration_since(cast_at) < timings.cast_ignore_window() {
                return Err(Rejection::TooSoonAfterCast);
            }
        }
        Self::check_flags(flags)?;
        if now.saturating_duration_since(self.last_cycle_end) < timings.cycle_cooldown() {
            return Err(Rejection::CycleCooldown);
        }
        Ok(())
    }

    /// Decide whether the bite timeout may force a reel.
    pub fn check_timeout(flags: CycleFlags, state: FishingState) -> Result<(), Rejection> {
        Self::check_flags(flags)?;
        if state != FishingState::WaitingForBite {
            return Err(Rejection::NotWaiting);
        }
        Ok(())
    }

    fn check_flags(flags: CycleFlags) -> Result<(), Rejection> {
        if !flags.running {
            Err(Rejection::NotRunning)
        } else if flags.closing {
            Err(Rejection::Closing)
        } else if flags.protected {
            Err(Rejection::Protected)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const RUNNING: CycleFlags = CycleFlags {
        running: true,
        protected: false,
        closing: false,
    };

    fn settled_cycle(start: Instant) -> CycleState {
        let mut cycle = CycleState::new(start);
        cycle.last_cast_at = Some(start);
        cycle
    }

    #[test]
    fn test_marker_right_after_cast_ignored() {
        let start = Instant::now();
        let cycle = settled_cycle(start);
        let timings = EngineTimings::default();

        assert_eq!(
            cycle.check_bite(RUNNING, start + Duration::from_millis(2900), &timings),
            Err(Rejection::TooSoonAfterCast)
        );
        assert_eq!(
            cycle.check_bite(RUNNING, start + Duration::from_secs(3), &timings),
            Ok(())
        );
    }

    #[test]
    fn test_protected_blocks_bite_and_timeout() {
        let start = Instant::now();
        let cycle = settled_cycle(start);
        let flags = CycleFlags {
            protected: true,
            ..RUNNING
        };

        assert_eq!(
            cycle.check_bite(flags, start + Duration::from_secs(5), &EngineTimings::default()),
            Err(Rejection::Protected)
        );
        assert_eq!(
            CycleState::check_timeout(flags, FishingState::WaitingForBite),
            Err(Rejection::Protected)
        );
    }

    #[test]
    fn test_cycle_cooldown() {
        let start = Instant::now();
        let mut cycle = CycleState::new(start);
        let timings = EngineTimings {
            cast_ignore_window_ms: 0,
            ..EngineTimings::default()
        };
        cycle.last_cycle_end = start;

        assert_eq!(
            cycle.check_bite(RUNNING, start + Duration::from_millis(1500), &timings),
            Err(Rejection::CycleCooldown)
        );
        assert!(cycle
            .check_bite(RUNNING, start + Duration::from_secs(2), &timings)
            .is_ok());
    }

    #[test]
    fn test_stopped_or_closing_rejects() {
        let start = Instant::now();
        let cycle = settled_cycle(start);
        let later = start + Duration::from_secs(10);
        let timings = EngineTimings::default();

        let stopped = CycleFlags {
            running: false,
            ..RUNNING
        };
        assert_eq!(cycle.check_bite(stopped, later, &timings), Err(Rejection::NotRunning));

        let closing = CycleFlags {
            closing: true,
            ..RUNNING
        };
        assert_eq!(cycle.check_bite(closing, later, &timings), Err(Rejection::Closing));
    }

    #[test]
    fn test_timeout_only_while_waiting() {
        assert_eq!(
            CycleState::check_timeout(RUNNING, FishingState::Reeling),
            Err(Rejection::NotWaiting)
        );
        assert!(CycleState::check_timeout(RUNNING, FishingState::WaitingForBite).is_ok());
    }
}
