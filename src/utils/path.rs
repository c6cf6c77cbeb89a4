//! Path utilities for finding data and log directories

use std::env;
use std::path::PathBuf;

use directories::BaseDirs;

/// Returns the folder holding `config/` and `debug/`.
/// Uses the executable directory when a `config` folder sits next to it,
/// otherwise the current working directory.
pub fn get_data_dir() -> PathBuf {
    if let Ok(exe_path) = env::current_exe() {
        if let Some(parent) = exe_path.parent() {
            if parent.join("config").exists() {
                return parent.to_path_buf();
            }
        }
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Directory VRChat writes `output_log_*.txt` into.
///
/// On Windows this is `%AppData%\..\LocalLow\VRChat\VRChat`: the sibling of the
/// roaming application data folder.
pub fn vrchat_log_dir() -> Option<PathBuf> {
    let dirs = BaseDirs::new()?;
    let roaming = dirs.data_dir();
    let app_data = roaming.parent().unwrap_or(roaming);
    Some(app_data.join("LocalLow").join("VRChat").join("VRChat"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir() {
        let dir = get_data_dir();
        assert!(dir.exists() || dir == PathBuf::from("."));
    }

    #[test]
    fn test_vrchat_log_dir_shape() {
        if let Some(dir) = vrchat_log_dir() {
            assert!(dir.ends_with("LocalLow/VRChat/VRChat"));
        }
    }
}
