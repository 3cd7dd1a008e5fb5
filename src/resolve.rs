//! Path resolution for gmail-token config and files.
//!
//! Resolution order for the config file:
//!   1. explicit --config PATH
//!   2. .gmail-token.toml in cwd (per-project workflow)
//!   3. {user_config_dir}/gmail-token/config.toml
//!
//! Relative credential/token paths are taken relative to the cwd, like the
//! script this tool replaces.

use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = ".gmail-token.toml";

/// Return the OS-native gmail-token config directory.
pub fn app_config_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "gmail-token") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        home_dir().join(".config").join("gmail-token")
    }
}

/// Return the path to the app-level config.toml.
pub fn app_config_path() -> PathBuf {
    app_config_dir().join("config.toml")
}

/// Locate the config file to read, if any.
pub fn config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(expand_tilde(&p.to_string_lossy()));
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    let global = app_config_path();
    if global.is_file() {
        return Some(global);
    }
    None
}

/// Get the user's home directory.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Expand ~ to home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}
