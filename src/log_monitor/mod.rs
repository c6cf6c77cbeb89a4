//! Game log monitoring: tailing, marker detection and new-file notification

pub mod markers;
pub mod tailer;
pub mod watcher;

pub use markers::{LogMarkers, CATCH_MARKER, PICKUP_MARKER};
pub use tailer::{FilePattern, LogTailer, DEFAULT_LOG_GLOB};
pub use watcher::LogDirWatcher;
