//! Cross-platform configuration path using the `dirs` crate.
//!
//! Layout:
//!
//!   Windows: %APPDATA%\mic-conditioner\pipeline.toml
//!   macOS:   ~/Library/Application Support/mic-conditioner/pipeline.toml
//!   Linux:   ~/.config/mic-conditioner/pipeline.toml

use std::path::PathBuf;

/// Resolved configuration locations.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `pipeline.toml`.
    pub config_dir: PathBuf,
    /// Full path to `pipeline.toml`.
    pub settings_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "mic-conditioner";

    /// Falls back to the current directory if the platform cannot provide a
    /// standard config path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);
        let settings_file = config_dir.join("pipeline.toml");

        Self {
            config_dir,
            settings_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "pipeline.toml"));
        assert!(paths.settings_file.starts_with(&paths.config_dir));
    }
}
