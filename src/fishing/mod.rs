//! Fishing engine: cast/wait/reel state machine and its status output

pub mod cast;
pub mod engine;
pub mod reel;
pub mod state;
pub mod status;
pub mod timings;

pub use cast::{CastDuration, CastPlan, MAX_CAST_MS};
pub use engine::{EngineOptions, FishingEngine};
pub use reel::{MarkerVerdict, ReelDetection, ReelOutcome};
pub use state::{count_label, Activity, BiteSource, CycleFlags, CycleState, FishingState, Rejection};
pub use status::{DisplayView, EngineShared, StatusDisplay, StatusUpdate};
pub use timings::EngineTimings;
