//! Directory watcher that points the tailer at newly created logs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{FishingError, Result};

use super::tailer::LogTailer;

/// Keeps a filesystem watch on the log directory for as long as it lives.
pub struct LogDirWatcher {
    dir: PathBuf,
    _watcher: RecommendedWatcher,
}

impl LogDirWatcher {
    /// Start watching the tailer's directory for created log files.
    pub fn spawn(tailer: Arc<LogTailer>) -> Result<Self> {
        let dir = tailer.dir().to_path_buf();
        let pattern = tailer.pattern().clone();
        if !dir.is_dir() {
            return Err(FishingError::LogDirMissing(dir));
        }

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Create(_))
                    && event.paths.iter().any(|p| tailer.matches(p))
                {
                    tailer.refresh();
                }
            }
            Err(e) => tracing::warn!("[LOG] Watch error: {}", e),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(
            "[LOG] Watching {:?} for new {} files",
            dir,
            pattern.as_str()
        );
        Ok(Self {
            dir,
            _watcher: watcher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_monitor::DEFAULT_LOG_GLOB;
    use std::time::{Duration, Instant};

    #[test]
    fn test_missing_directory_is_reported() {
        let tailer = Arc::new(LogTailer::new("/definitely/not/here", DEFAULT_LOG_GLOB));
        let result = LogDirWatcher::spawn(tailer);
        assert!(matches!(result, Err(FishingError::LogDirMissing(_))));
    }

    #[test]
    fn test_watches_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tailer = Arc::new(LogTailer::new(dir.path(), DEFAULT_LOG_GLOB));
        let watcher = LogDirWatcher::spawn(tailer).unwrap();
        assert_eq!(watcher.dir(), dir.path());
    }

    #[test]
    fn test_created_log_is_adopted_without_polling() {
        let dir = tempfile::tempdir().unwrap();
        let tailer = Arc::new(LogTailer::new(dir.path(), DEFAULT_LOG_GLOB));
        let _watcher = LogDirWatcher::spawn(Arc::clone(&tailer)).unwrap();
        assert!(tailer.current_file().is_none());

        std::fs::write(dir.path().join("notes.txt"), "ignored\n").unwrap();
        let log = dir.path().join("output_log_x.txt");
        std::fs::write(&log, "hello\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while tailer.current_file().as_ref() != Some(&log) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(tailer.current_file(), Some(log));
        assert_eq!(tailer.offset(), 0);
    }
}
