//! Default paths for safeplayd components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/safeplayd/safeplayd.sock` or `/tmp/safeplayd-$USER/safeplayd.sock`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const SAFEPLAY_SOCKET_ENV: &str = "SAFEPLAY_SOCKET";

/// Socket filename within the socket directory
const SOCKET_FILENAME: &str = "safeplayd.sock";

/// Application subdirectory name
const APP_DIR: &str = "safeplayd";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$SAFEPLAY_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/safeplayd/safeplayd.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/safeplayd-$USER/safeplayd.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(SAFEPLAY_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the default config file path: `~/.config/safeplay/config.toml`
pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("safeplay")
        .join("config.toml")
}

/// Get the socket path without checking SAFEPLAY_SOCKET env var.
/// Used for default values in configs where the env var is checked separately.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_safeplayd() {
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("safeplayd"));
        assert!(path.to_string_lossy().contains(".sock"));
    }
}
