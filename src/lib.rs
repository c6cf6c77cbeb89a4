//! VRChat auto fishing engine
//!
//! Holds the in-game "use" button over OSC to cast, watches VRChat's
//! `output_log_*.txt` for the markers the fishing system writes, and reels in
//! when a fish bites or the wait times out.

pub mod console;
pub mod error;
pub mod fishing;
pub mod log_monitor;
pub mod osc;
pub mod scheduler;
pub mod utils;

// Re-exports for convenience
pub use error::{FishingError, Result};
pub use fishing::{
    Activity, CastDuration, EngineOptions, EngineTimings, FishingEngine, FishingState, StatusUpdate,
};
pub use log_monitor::{LogDirWatcher, LogMarkers, LogTailer};
pub use osc::{InputSink, OscClient};
pub use utils::{get_data_dir, vrchat_log_dir, Settings};
