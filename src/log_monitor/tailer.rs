//! Incremental reader for the newest game log in a directory

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;

/// Default log file glob written by the game.
pub const DEFAULT_LOG_GLOB: &str = "output_log_*.txt";

/// Filename matcher supporting `*` and `?` wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern {
    glob: String,
}

impl FilePattern {
    pub fn new(glob: impl Into<String>) -> Self {
        Self { glob: glob.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Check a bare file name against the pattern.
    pub fn matches(&self, name: &str) -> bool {
        let pattern: Vec<char> = self.glob.chars().collect();
        let name: Vec<char> = name.chars().collect();

        let (mut p, mut n) = (0, 0);
        let mut backtrack: Option<(usize, usize)> = None;

        while n < name.len() {
            if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
                p += 1;
                n += 1;
            } else if p < pattern.len() && pattern[p] == '*' {
                backtrack = Some((p, n));
                p += 1;
            } else if let Some((star_p, star_n)) = backtrack {
                p = star_p + 1;
                n = star_n + 1;
                backtrack = Some((star_p, star_n + 1));
            } else {
                return false;
            }
        }

        pattern[p..].iter().all(|&c| c == '*')
    }
}

/// Read position within the currently tracked file.
#[derive(Debug, Default)]
struct LogCursor {
    path: Option<PathBuf>,
    offset: u64,
}

/// Tails the most recently modified matching file in a directory.
///
/// Every call re-resolves the newest file, so a log created by a restarted
/// game is adopted without restarting the tailer. All cursor access happens
/// under one lock; the engine's poll and the directory watcher both use it.
pub struct LogTailer {
    dir: PathBuf,
    pattern: FilePattern,
    cursor: Mutex<LogCursor>,
}

impl LogTailer {
    pub fn new(dir: impl Into<PathBuf>, glob: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            pattern: FilePattern::new(glob),
            cursor: Mutex::new(LogCursor::default()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pattern(&self) -> &FilePattern {
        &self.pattern
    }

    /// Whether `path` names a file this tailer would consider.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.pattern.matches(n))
    }

    /// File currently being tailed.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.cursor.lock().path.clone()
    }

    /// Byte offset already consumed in the current file.
    pub fn offset(&self) -> u64 {
        self.cursor.lock().offset
    }

    /// Find the matching file with the newest modification time.
    pub fn find_latest(&self) -> Option<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("[LOG] Cannot list {:?}: {}", self.dir, e);
                return None;
            }
        };

        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if !self.matches(&path) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            if latest.as_ref().map_or(true, |(t, _)| modified > *t) {
                latest = Some((modified, path));
            }
        }

        latest.map(|(_, path)| path)
    }

    /// Re-resolve the newest file; returns true when a different file was adopted.
    pub fn refresh(&self) -> bool {
        let mut cursor = self.cursor.lock();
        self.follow_latest(&mut cursor)
    }

    /// Point the cursor at the newest file. Must run under the cursor lock so
    /// a stale resolution can never replace a newer one and rewind the offset.
    fn follow_latest(&self, cursor: &mut LogCursor) -> bool {
        let latest = self.find_latest();
        if cursor.path == latest {
            return false;
        }
        match &latest {
            Some(path) => tracing::info!("[LOG] Detected new log file: {:?}", path),
            None => tracing::debug!("[LOG] No log file to follow"),
        }
        cursor.path = latest;
        cursor.offset = 0;
        true
    }

    /// Return text appended since the previous call.
    ///
    /// Never fails: an unreadable or missing file yields an empty string and
    /// the next call tries again.
    pub fn poll_new_content(&self) -> String {
        let mut cursor = self.cursor.lock();
        self.follow_latest(&mut cursor);

        let Some(path) = cursor.path.clone() else {
            return String::new();
        };

        match Self::read_from(&path, cursor.offset) {
            Ok((text, start, end)) => {
                if start < cursor.offset {
                    tracing::debug!("[LOG] {:?} shrank, reading from start", path);
                }
                cursor.offset = end;
                text
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("[LOG] {:?} disappeared", path);
                String::new()
            }
            Err(e) => {
                tracing::warn!("[LOG] Failed to read {:?}: {}", path, e);
                String::new()
            }
        }
    }

    /// Move the cursor to the end of the current log without reading it.
    /// Returns the number of bytes skipped.
    pub fn skip_backlog(&self) -> u64 {
        let mut cursor = self.cursor.lock();
        self.follow_latest(&mut cursor);

        let Some(path) = cursor.path.clone() else {
            return 0;
        };
        let len = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::debug!("[LOG] Cannot stat {:?}: {}", path, e);
                return 0;
            }
        };

        // A file shorter than the cursor was truncated; its whole content is backlog.
        let start = if cursor.offset > len { 0 } else { cursor.offset };
        cursor.offset = len;
        let skipped = len - start;
        if skipped > 0 {
            tracing::debug!("[LOG] Skipped {} bytes of backlog", skipped);
        }
        skipped
    }

    /// Read from `offset` (clamped to 0 past EOF) to the end.
    /// Returns the text, the effective start offset and the new end offset.
    fn read_from(path: &Path, offset: u64) -> io::Result<(String, u64, u64)> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        let start = if offset > len { 0 } else { offset };
        if start == len {
            return Ok((String::new(), start, start));
        }

        file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::with_capacity((len - start) as usize);
        file.read_to_end(&mut buf)?;
        let end = start + buf.len() as u64;

        Ok((String::from_utf8_lossy(&buf).into_owned(), start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::time::Duration;

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn set_mtime(path: &Path, secs_after_epoch: u64) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
            .unwrap();
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = FilePattern::new(DEFAULT_LOG_GLOB);
        assert!(pattern.matches("output_log_2024-01-01_12-00-00.txt"));
        assert!(pattern.matches("output_log_.txt"));
        assert!(!pattern.matches("output_log_1.txt.bak"));
        assert!(!pattern.matches("player_log_1.txt"));
        assert!(FilePattern::new("a?c").matches("abc"));
        assert!(!FilePattern::new("a?c").matches("ac"));
        assert!(FilePattern::new("*").matches("anything"));
    }

    #[test]
    fn test_missing_directory_reads_empty() {
        let tailer = LogTailer::new("/definitely/not/here", DEFAULT_LOG_GLOB);
        assert_eq!(tailer.poll_new_content(), "");
        assert!(tailer.current_file().is_none());
    }

    #[test]
    fn test_only_new_content_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("output_log_a.txt");
        append(&log, "first line\n");

        let tailer = LogTailer::new(dir.path(), DEFAULT_LOG_GLOB);
        assert_eq!(tailer.poll_new_content(), "first line\n");
        assert_eq!(tailer.poll_new_content(), "");

        append(&log, "SAVED DATA\n");
        assert_eq!(tailer.poll_new_content(), "SAVED DATA\n");
        assert_eq!(tailer.offset(), "first line\nSAVED DATA\n".len() as u64);
    }

    #[test]
    fn test_ignores_non_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        append(&dir.path().join("notes.txt"), "SAVED DATA\n");

        let tailer = LogTailer::new(dir.path(), DEFAULT_LOG_GLOB);
        assert_eq!(tailer.poll_new_content(), "");
    }

    #[test]
    fn test_truncation_restarts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("output_log_a.txt");
        append(&log, "a long line that will be truncated\n");

        let tailer = LogTailer::new(dir.path(), DEFAULT_LOG_GLOB);
        tailer.poll_new_content();

        fs::write(&log, "short\n").unwrap();
        assert_eq!(tailer.poll_new_content(), "short\n");
        assert_eq!(tailer.offset(), 6);
    }

    #[test]
    fn test_switches_to_newer_file() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("output_log_old.txt");
        append(&old, "old content\n");
        set_mtime(&old, 1_000);

        let tailer = LogTailer::new(dir.path(), DEFAULT_LOG_GLOB);
        assert_eq!(tailer.poll_new_content(), "old content\n");

        let new = dir.path().join("output_log_new.txt");
        append(&new, "new content\n");
        set_mtime(&new, 2_000);

        assert_eq!(tailer.poll_new_content(), "new content\n");
        assert_eq!(tailer.current_file(), Some(new));
    }

    #[test]
    fn test_refresh_reports_change_once() {
        let dir = tempfile::tempdir().unwrap();
        append(&dir.path().join("output_log_a.txt"), "x\n");

        let tailer = LogTailer::new(dir.path(), DEFAULT_LOG_GLOB);
        assert!(tailer.refresh());
        assert!(!tailer.refresh());
    }

    #[test]
    fn test_skip_backlog_jumps_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("output_log_a.txt");
        append(&log, "some history\n");

        let tailer = LogTailer::new(dir.path(), DEFAULT_LOG_GLOB);
        tailer.poll_new_content();
        append(&log, "SAVED DATA\n");

        assert_eq!(tailer.skip_backlog(), 11);
        assert_eq!(tailer.offset(), fs::metadata(&log).unwrap().len());
        assert_eq!(tailer.skip_backlog(), 0);
        assert_eq!(tailer.poll_new_content(), "");
    }

    #[test]
    fn test_skip_backlog_on_missing_directory() {
        let tailer = LogTailer::new("/definitely/not/here", DEFAULT_LOG_GLOB);
        assert_eq!(tailer.skip_backlog(), 0);
        assert_eq!(tailer.offset(), 0);
    }

    #[test]
    fn test_refresh_racing_rotation_never_rereads() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("output_log_000.txt");
        append(&first, "start\n");
        set_mtime(&first, 1_000);

        let tailer = Arc::new(LogTailer::new(dir.path(), DEFAULT_LOG_GLOB));
        let mut seen = tailer.poll_new_content();
        let mut expected = String::from("start\n");

        let stop = Arc::new(AtomicBool::new(false));
        let refresher = {
            let tailer = Arc::clone(&tailer);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    tailer.refresh();
                }
            })
        };

        for i in 1..=50u64 {
            let log = dir.path().join(format!("output_log_{:03}.txt", i));
            let text = format!("session {} a\nsession {} b\n", i, i);
            append(&log, &text);
            set_mtime(&log, 1_000 + i);
            expected.push_str(&text);
            seen.push_str(&tailer.poll_new_content());
        }
        stop.store(true, Ordering::SeqCst);
        refresher.join().unwrap();
        seen.push_str(&tailer.poll_new_content());

        assert_eq!(seen, expected);
    }

    #[test]
    fn test_skip_backlog() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("output_log_a.txt");
        append(&log, "SAVED DATA\nSAVED DATA\n");

        let tailer = LogTailer::new(dir.path(), DEFAULT_LOG_GLOB);
        assert_eq!(tailer.skip_backlog(), 22);

        append(&log, "fresh\n");
        assert_eq!(tailer.poll_new_content(), "fresh\n");
    }
}
