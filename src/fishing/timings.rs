//! Timing rules of the cast/reel cycle

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Every delay and window the engine uses, in milliseconds.
///
/// Defaults are the values the game's fishing minigame was tuned against;
/// tests shrink them to keep runs short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTimings {
    /// Pause before every cast except the first of a run.
    pub recast_delay_ms: u64,
    /// Reel anyway if nothing bites for this long.
    pub bite_timeout_ms: u64,
    /// Delay between a short cast's release and its reel-back pulse.
    pub reel_back_delay_ms: u64,
    /// Extra wait after the pulse before the bite timeout is armed.
    pub reel_back_slack_ms: u64,
    /// Catch markers this soon after a cast belong to the previous cycle.
    pub cast_ignore_window_ms: u64,
    /// Minimum gap between the end of one cycle and the next bite.
    pub cycle_cooldown_ms: u64,
    /// Longest a reel holds the button.
    pub reel_max_ms: u64,
    /// Minimum gap between the two markers of a landed catch.
    pub marker_debounce_ms: u64,
    /// Give up on a second marker after this long.
    pub single_marker_timeout_ms: u64,
    /// Log poll and cancellation check interval.
    pub poll_interval_ms: u64,
    pub status_tick_ms: u64,
    pub status_waiting_label_ms: u64,
    pub status_count_label_ms: u64,
    /// How long shutdown waits for the fishing thread.
    pub shutdown_grace_ms: u64,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            recast_delay_ms: 500,
            bite_timeout_ms: 3 * 60 * 1000,
            reel_back_delay_ms: 1000,
            reel_back_slack_ms: 100,
            cast_ignore_window_ms: 3000,
            cycle_cooldown_ms: 2000,
            reel_max_ms: 30_000,
            marker_debounce_ms: 1000,
            single_marker_timeout_ms: 10_000,
            poll_interval_ms: 100,
            status_tick_ms: 100,
            status_waiting_label_ms: 5000,
            status_count_label_ms: 2000,
            shutdown_grace_ms: 2000,
        }
    }
}

impl EngineTimings {
    pub fn recast_delay(&self) -> Duration {
        Duration::from_millis(self.recast_delay_ms)
    }

    pub fn bite_timeout(&self) -> Duration {
        Duration::from_millis(self.bite_timeout_ms)
    }

    pub fn reel_back_delay(&self) -> Duration {
        Duration::from_millis(self.reel_back_delay_ms)
    }

    pub fn reel_back_slack(&self) -> Duration {
        Duration::from_millis(self.reel_back_slack_ms)
    }

    pub fn cast_ignore_window(&self) -> Duration {
        Duration::from_millis(self.cast_ignore_window_ms)
    }

    pub fn cycle_cooldown(&self) -> Duration {
        Duration::from_millis(self.cycle_cooldown_ms)
    }

    pub fn reel_max(&self) -> Duration {
        Duration::from_millis(self.reel_max_ms)
    }

    pub fn marker_debounce(&self) -> Duration {
        Duration::from_millis(self.marker_debounce_ms)
    }

    pub fn single_marker_timeout(&self) -> Duration {
        Duration::from_millis(self.single_marker_timeout_ms)
    }

    /// Clamped to at most 100ms so stop requests are honoured promptly.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(1, 100))
    }

    pub fn status_tick(&self) -> Duration {
        Duration::from_millis(self.status_tick_ms.max(1))
    }

    pub fn status_waiting_label(&self) -> Duration {
        Duration::from_millis(self.status_waiting_label_ms)
    }

    pub fn status_count_label(&self) -> Duration {
        Duration::from_millis(self.status_count_label_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
