//! Cast duration and the press plan derived from it

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FishingError, Result};

/// Longest configurable cast, in milliseconds.
pub const MAX_CAST_MS: u32 = 1700;

/// Shorter casts are held for this long and followed by a reel-back pulse.
const MIN_PRESS_MS: u32 = 200;
/// Below this the pulse is the long one.
const SHORT_CAST_MS: u32 = 100;
const LONG_PULSE: Duration = Duration::from_millis(500);
const SHORT_PULSE: Duration = Duration::from_millis(300);

/// Configured cast charge time, 0.0 to 1.7 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CastDuration {
    millis: u32,
}

impl CastDuration {
    pub const MAX: Self = Self { millis: MAX_CAST_MS };

    pub fn from_secs(secs: f64) -> Result<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(FishingError::InvalidCastDuration(secs));
        }
        let millis = (secs * 1000.0).round();
        if millis > f64::from(MAX_CAST_MS) {
            return Err(FishingError::InvalidCastDuration(secs));
        }
        Ok(Self {
            millis: millis as u32,
        })
    }

    pub fn as_millis(self) -> u32 {
        self.millis
    }

    pub fn as_secs_f64(self) -> f64 {
        f64::from(self.millis) / 1000.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_millis(u64::from(self.millis))
    }
}

impl Default for CastDuration {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<f64> for CastDuration {
    type Error = FishingError;

    fn try_from(secs: f64) -> Result<Self> {
        Self::from_secs(secs)
    }
}

impl From<CastDuration> for f64 {
    fn from(duration: CastDuration) -> f64 {
        duration.as_secs_f64()
    }
}

impl fmt::Display for CastDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}s", self.as_secs_f64())
    }
}

/// How one cast is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastPlan {
    /// How long the button is held.
    pub press: Duration,
    /// Reel-back pulse length for casts shorter than the minimum press.
    pub reel_back: Option<Duration>,
}

impl CastPlan {
    pub fn for_duration(configured: CastDuration) -> Self {
        let millis = configured.as_millis();
        if millis >= MIN_PRESS_MS {
            return Self {
                press: configured.as_duration(),
                reel_back: None,
            };
        }

        let pulse = if millis < SHORT_CAST_MS {
            LONG_PULSE
        } else {
            SHORT_PULSE
        };
        Self {
            press: Duration::from_millis(u64::from(MIN_PRESS_MS)),
            reel_back: Some(pulse),
        }
    }
}
