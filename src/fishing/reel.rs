//! Catch confirmation while reeling
//!
//! A landed fish writes the catch marker twice. The two writes must be at
//! least the debounce apart (one log line can straddle two reads) and the
//! second must arrive before the single-marker timeout.

use std::time::{Duration, Instant};

/// Result of one reel attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReelOutcome {
    /// Two markers seen; the catch counts.
    Complete,
    /// One marker, no confirmation in time.
    SingleTimeout,
    /// No marker at all.
    Timeout,
}

/// What a marker observation meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerVerdict {
    First,
    Confirmed,
    /// Inside the debounce window of the first marker.
    TooSoon,
    /// The first marker already expired.
    Expired,
}

#[derive(Debug, Clone)]
pub struct ReelDetection {
    saved_count: u8,
    first_at: Option<Instant>,
    debounce: Duration,
    single_timeout: Duration,
}

impl ReelDetection {
    pub fn new(debounce: Duration, single_timeout: Duration) -> Self {
        Self {
            saved_count: 0,
            first_at: None,
            debounce,
            single_timeout,
        }
    }

    pub fn marker_count(&self) -> u8 {
        self.saved_count
    }

    pub fn observe(&mut self, now: Instant) -> MarkerVerdict {
        match (self.saved_count, self.first_at) {
            (0, _) | (_, None) => {
                self.saved_count = 1;
                self.first_at = Some(now);
                MarkerVerdict::First
            }
            (1, Some(first)) => {
                let gap = now.saturating_duration_since(first);
                if gap > self.single_timeout {
                    MarkerVerdict::Expired
                } else if gap >= self.debounce {
                    self.saved_count = 2;
                    MarkerVerdict::Confirmed
                } else {
                    MarkerVerdict::TooSoon
                }
            }
            _ => MarkerVerdict::Confirmed,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.saved_count >= 2
    }

    /// First marker seen and its confirmation window has passed.
    pub fn single_expired(&self, now: Instant) -> bool {
        self.saved_count == 1
            && self
                .first_at
                .is_some_and(|first| now.saturating_duration_since(first) > self.single_timeout)
    }

    pub fn outcome(&self) -> ReelOutcome {
        match self.saved_count {
            0 => ReelOutcome::Timeout,
            1 => ReelOutcome::SingleTimeout,
            _ => ReelOutcome::Complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection() -> ReelDetection {
        ReelDetection::new(Duration::from_secs(1), Duration::from_secs(10))
    }

    #[test]
    fn test_two_markers_confirm() {
        let start = Instant::now();
        let mut d = detection();
        assert_eq!(d.observe(start), MarkerVerdict::First);
        assert_eq!(d.observe(start + Duration::from_millis(1500)), MarkerVerdict::Confirmed);
        assert!(d.is_confirmed());
        assert_eq!(d.outcome(), ReelOutcome::Complete);
    }

    #[test]
    fn test_second_marker_inside_debounce_ignored() {
        let start = Instant::now();
        let mut d = detection();
        d.observe(start);
        assert_eq!(d.observe(start + Duration::from_millis(400)), MarkerVerdict::TooSoon);
        assert_eq!(d.marker_count(), 1);
        assert_eq!(d.observe(start + Duration::from_secs(1)), MarkerVerdict::Confirmed);
    }

    #[test]
    fn test_single_marker_expires() {
        let start = Instant::now();
        let mut d = detection();
        d.observe(start);
        assert!(!d.single_expired(start + Duration::from_secs(10)));
        assert!(d.single_expired(start + Duration::from_millis(10_100)));
        assert_eq!(
            d.observe(start + Duration::from_millis(10_100)),
            MarkerVerdict::Expired
        );
        assert_eq!(d.outcome(), ReelOutcome::SingleTimeout);
    }

    #[test]
    fn test_no_marker_is_timeout() {
        let d = detection();
        assert!(!d.single_expired(Instant::now() + Duration::from_secs(60)));
        assert_eq!(d.outcome(), ReelOutcome::Timeout);
    }
}
