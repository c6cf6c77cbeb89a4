//! Paths and settings

pub mod path;
pub mod settings;

pub use path::{get_data_dir, vrchat_log_dir};
pub use settings::Settings;
