//! Error types for the fishing engine

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by engine construction and configuration.
///
/// Nothing on the running cycle path returns these to the caller: transport and
/// log I/O failures are logged and absorbed where they happen.
#[derive(Debug, Error)]
pub enum FishingError {
    #[error("Invalid OSC target {target}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to bind OSC socket: {0}")]
    SocketBind(#[source] std::io::Error),
    #[error("Cast duration {0} is outside 0.0..=1.7 seconds")]
    InvalidCastDuration(f64),
    #[error("Log directory not found: {0:?}")]
    LogDirMissing(PathBuf),
    #[error("Could not watch log directory: {0}")]
    Watch(#[from] notify::Error),
    #[error("Invalid settings file {path:?}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Engine is shutting down")]
    Closing,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FishingError>;
