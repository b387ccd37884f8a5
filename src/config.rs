use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Wardbook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Wardbook/ on all platforms (user-visible flat files by design)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Wardbook")
}

/// Get the records directory, where the flat-file store lives
pub fn records_dir() -> PathBuf {
    app_data_dir().join("records")
}
