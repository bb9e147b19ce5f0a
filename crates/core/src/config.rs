//! Overlay configuration
//!
//! Settings shared by the text and annotation overlays of one viewer.
//! Configuration can be created programmatically, loaded from environment
//! variables, or read from a TOML file.

use crate::geometry::ScrollMargin;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Text layers with more nodes than this are never committed
pub const MAX_TEXT_NODES: usize = 100_000;

/// Quiet period before committing text layout after scrolling (ms)
pub const RENDER_DELAY_MS: u64 = 200;

/// Overlay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Quiet period after the last scroll before layout is committed
    pub render_delay_ms: u64,

    /// Maximum number of text nodes a page may commit
    pub max_text_nodes: usize,

    /// Presentation mode suppresses scroll-into-view
    pub presentation_mode: bool,

    /// Render form fields as interactive widgets
    pub render_interactive_forms: bool,

    /// Offset applied when scrolling the selected match into view
    pub scroll_margin: ScrollMargin,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            render_delay_ms: RENDER_DELAY_MS,
            max_text_nodes: MAX_TEXT_NODES,
            scroll_margin: ScrollMargin::default(),
            presentation_mode: false,
            render_interactive_forms: false,
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_text_nodes(mut self, max: usize) -> Self {
        self.max_text_nodes = max;
        self
    }

    pub fn with_scroll_margin(mut self, margin: ScrollMargin) -> Self {
        self.scroll_margin = margin;
        self
    }

    pub fn with_presentation_mode(mut self, enabled: bool) -> Self {
        self.presentation_mode = enabled;
        self
    }

    pub fn with_interactive_forms(mut self, enabled: bool) -> Self {
        self.render_interactive_forms = enabled;
        self
    }

    pub fn render_delay(&self) -> Duration {
        Duration::from_millis(self.render_delay_ms)
    }

    /// Default location of the configuration file
    ///
    /// - macOS: ~/Library/Application Support/pdf-overlay/overlay.toml
    /// - Linux: ~/.config/pdf-overlay/overlay.toml
    /// - Windows: %APPDATA%\pdf-overlay\overlay.toml
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("pdf-overlay").join("overlay.toml"),
            None => PathBuf::from("overlay.toml"),
        }
    }

    /// Apply environment variable overrides on top of the defaults
    ///
    /// - `PDF_OVERLAY_RENDER_DELAY_MS`: quiet period in milliseconds
    /// - `PDF_OVERLAY_MAX_TEXT_NODES`: text node cap
    /// - `PDF_OVERLAY_PRESENTATION_MODE`: `true` / `false`
    /// - `PDF_OVERLAY_INTERACTIVE_FORMS`: `true` / `false`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = env_value("PDF_OVERLAY_RENDER_DELAY_MS")? {
            config.render_delay_ms = value;
        }
        if let Some(value) = env_value("PDF_OVERLAY_MAX_TEXT_NODES")? {
            config.max_text_nodes = value;
        }
        if let Some(value) = env_value("PDF_OVERLAY_PRESENTATION_MODE")? {
            config.presentation_mode = value;
        }
        if let Some(value) = env_value("PDF_OVERLAY_INTERACTIVE_FORMS")? {
            config.render_interactive_forms = value;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Write configuration to a TOML file, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;
        }

        std::fs::write(path, contents)
            .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => {
            raw.trim().parse::<T>().map(Some).map_err(|_| ConfigError::InvalidValue(key.to_string()))
        }
        Err(_) => Ok(None),
    }
}

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),

    #[error("failed to read config file at {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to write config file at {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config file at {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        for key in [
            "PDF_OVERLAY_RENDER_DELAY_MS",
            "PDF_OVERLAY_MAX_TEXT_NODES",
            "PDF_OVERLAY_PRESENTATION_MODE",
            "PDF_OVERLAY_INTERACTIVE_FORMS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = OverlayConfig::default();
        assert_eq!(config.render_delay(), Duration::from_millis(200));
        assert_eq!(config.max_text_nodes, 100_000);
        assert_eq!(config.scroll_margin, ScrollMargin { top: -50.0, left: -400.0 });
        assert!(!config.presentation_mode);
    }

    #[test]
    fn test_builder_methods() {
        let config = OverlayConfig::new()
            .with_render_delay(Duration::from_millis(50))
            .with_max_text_nodes(10)
            .with_presentation_mode(true)
            .with_interactive_forms(true);

        assert_eq!(config.render_delay_ms, 50);
        assert_eq!(config.max_text_nodes, 10);
        assert!(config.presentation_mode);
        assert!(config.render_interactive_forms);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("PDF_OVERLAY_RENDER_DELAY_MS", "75");
        env::set_var("PDF_OVERLAY_PRESENTATION_MODE", "true");

        let config = OverlayConfig::from_env().unwrap();
        assert_eq!(config.render_delay_ms, 75);
        assert!(config.presentation_mode);
        assert_eq!(config.max_text_nodes, MAX_TEXT_NODES);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_value() {
        clear_env();
        env::set_var("PDF_OVERLAY_MAX_TEXT_NODES", "lots");

        let result = OverlayConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue(key)) if key == "PDF_OVERLAY_MAX_TEXT_NODES"));

        clear_env();
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("overlay.toml");

        let config = OverlayConfig::default().with_max_text_nodes(500).with_presentation_mode(true);
        config.save_to_file(&path).unwrap();

        let loaded = OverlayConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.toml");
        std::fs::write(&path, "render_delay_ms = 10\n").unwrap();

        let loaded = OverlayConfig::from_file(&path).unwrap();
        assert_eq!(loaded.render_delay_ms, 10);
        assert_eq!(loaded.max_text_nodes, MAX_TEXT_NODES);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.toml");
        std::fs::write(&path, "render_delay_ms = \"soon\"\n").unwrap();

        assert!(matches!(OverlayConfig::from_file(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            OverlayConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
