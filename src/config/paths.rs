//! Platform settings location, resolved with the `dirs` crate.
//!
//! | Platform | Settings file |
//! |----------|---------------|
//! | Windows | `%APPDATA%\voice-autoclean\settings.toml` |
//! | macOS | `~/Library/Application Support/voice-autoclean/settings.toml` |
//! | Linux | `~/.config/voice-autoclean/settings.toml` |

use std::path::{Path, PathBuf};

/// Resolved location of `settings.toml`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-autoclean";
    const SETTINGS_FILE: &'static str = "settings.toml";

    /// Platform config directory, or `./voice-autoclean` when the platform
    /// has none.
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(base.join(Self::APP_NAME))
    }

    /// Settings rooted at an explicit directory.
    pub fn in_dir(config_dir: impl AsRef<Path>) -> Self {
        let config_dir = config_dir.as_ref().to_path_buf();
        Self {
            settings_file: config_dir.join(Self::SETTINGS_FILE),
            config_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
