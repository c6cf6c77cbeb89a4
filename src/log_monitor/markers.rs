//! Log markers the engine reacts to

/// Written when the game saves after a fish is landed.
pub const CATCH_MARKER: &str = "SAVED DATA";

/// Written when a fish attaches to the rod; fallback bite signal.
pub const PICKUP_MARKER: &str = "Fish Pickup attached to rod Toggles(True)";

/// Markers found in one chunk of log text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogMarkers {
    pub catch: bool,
    pub pickup: bool,
}

impl LogMarkers {
    pub fn scan(text: &str) -> Self {
        Self {
            catch: text.contains(CATCH_MARKER),
            pickup: text.contains(PICKUP_MARKER),
        }
    }

    pub fn any(&self) -> bool {
        self.catch || self.pickup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_markers() {
        let text = "2024.01.01 12:00:00 Log - [Behaviour] SAVED DATA\n";
        assert_eq!(
            LogMarkers::scan(text),
            LogMarkers {
                catch: true,
                pickup: false
            }
        );

        let text = "[Fishing] Fish Pickup attached to rod Toggles(True)\n";
        assert!(LogMarkers::scan(text).pickup);
        assert!(!LogMarkers::scan(text).catch);

        assert!(!LogMarkers::scan("Fish Pickup attached to rod Toggles(False)").any());
        assert!(!LogMarkers::scan("").any());
    }
}
