//! Platform-specific locations for local note data and credentials

use std::path::PathBuf;

const APP_DIR: &str = "notesync";

/// Directory holding `notes.db`.
///
/// The per-user local data dir (`~/.local/share/notesync` on Linux),
/// falling back to the roaming data dir, then `~/.data/notesync`, then
/// `./notesync` when no home directory is known.
pub fn get_data_dir() -> PathBuf {
    app_dir(
        dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".data"))),
    )
}

/// Directory holding `notesync.toml` and `credentials.json`.
///
/// Same fallback order as [`get_data_dir`], rooted at the user config dir
/// (`~/.config/notesync` on Linux).
pub fn get_config_dir() -> PathBuf {
    app_dir(
        dirs::config_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config"))),
    )
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

/// Get the default local note database path
pub fn get_default_database_path() -> PathBuf {
    get_data_dir().join("notes.db")
}

/// Get the default credentials file path
pub fn get_default_credentials_path() -> PathBuf {
    get_config_dir().join("credentials.json")
}

/// Get the default configuration file path
pub fn get_default_config_path() -> PathBuf {
    get_config_dir().join("notesync.toml")
}
