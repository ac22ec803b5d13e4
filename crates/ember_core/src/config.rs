//! # Bridge Configuration
//!
//! Loaded once when a plugin instance is created. Every field has a default,
//! so an empty file (or no file) yields a working bridge.
//!
//! ```toml
//! channel_name = "dev.ember.bridge/event"
//!
//! [rendering]
//! enabled_on_start = false
//! frame_interval_secs = 0.016666
//!
//! [assets]
//! bundle_root = "flutter_assets"
//! hot_reload_roots = ["/tmp/app/build"]
//!
//! [platform]
//! dedicated_thread = true
//! thread_name = "ember-platform"
//! ```

use crate::state::{is_valid_frame_interval, DEFAULT_FRAME_INTERVAL_SECS, MAX_FRAME_INTERVAL_SECS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {reason}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        reason: String,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Frame pump settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Whether the pump renders before any `setRendering` command.
    pub enabled_on_start: bool,
    /// Seconds between fixed-interval ticks.
    pub frame_interval_secs: f64,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            enabled_on_start: false,
            frame_interval_secs: DEFAULT_FRAME_INTERVAL_SECS,
        }
    }
}

/// Asset resolution settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Root of the packaged asset bundle.
    pub bundle_root: PathBuf,
    /// Directories searched for hot-reload overrides.
    pub hot_reload_roots: Vec<PathBuf>,
    /// Code-cache directory scanned for hot-reload roots.
    pub code_cache_dir: Option<PathBuf>,
    /// Package short name used when scanning `code_cache_dir`.
    pub hot_reload_package: Option<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            bundle_root: PathBuf::from("flutter_assets"),
            hot_reload_roots: Vec::new(),
            code_cache_dir: None,
            hot_reload_package: None,
        }
    }
}

/// Platform thread settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Marshal every command onto one dedicated thread.
    pub dedicated_thread: bool,
    /// Name of that thread.
    pub thread_name: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            dedicated_thread: false,
            thread_name: "ember-platform".to_string(),
        }
    }
}

/// Top-level configuration for one plugin instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host channel the command facade is registered on.
    pub channel_name: String,
    /// Frame pump settings.
    pub rendering: RenderingConfig,
    /// Asset resolution settings.
    pub assets: AssetConfig,
    /// Platform thread settings.
    pub platform: PlatformConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: "dev.ember.bridge/event".to_string(),
            rendering: RenderingConfig::default(),
            assets: AssetConfig::default(),
            platform: PlatformConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(path = %path.display(), channel = %config.channel_name, "loaded bridge config");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.rendering.frame_interval_secs;
        if !is_valid_frame_interval(interval) {
            return Err(ConfigError::Invalid(format!(
                "rendering.frame_interval_secs must be finite, > 0 and <= {MAX_FRAME_INTERVAL_SECS}, got {interval}"
            )));
        }
        if self.channel_name.is_empty() {
            return Err(ConfigError::Invalid("channel_name must not be empty".to_string()));
        }
        if self.platform.thread_name.is_empty() {
            return Err(ConfigError::Invalid("platform.thread_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Sets the asset bundle root.
    #[must_use]
    pub fn with_bundle_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets.bundle_root = root.into();
        self
    }

    /// Adds a hot-reload override root.
    #[must_use]
    pub fn with_hot_reload_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets.hot_reload_roots.push(root.into());
        self
    }

    /// Sets the fixed frame interval.
    #[must_use]
    pub fn with_frame_interval(mut self, secs: f64) -> Self {
        self.rendering.frame_interval_secs = secs;
        self
    }

    /// Sets whether rendering starts enabled.
    #[must_use]
    pub fn with_rendering_on_start(mut self, enabled: bool) -> Self {
        self.rendering.enabled_on_start = enabled;
        self
    }

    /// Enables or disables the dedicated platform thread.
    #[must_use]
    pub fn with_dedicated_thread(mut self, dedicated: bool) -> Self {
        self.platform.dedicated_thread = dedicated;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert!(!config.rendering.enabled_on_start);
        assert_eq!(config.assets.bundle_root, PathBuf::from("flutter_assets"));
    }

    #[test]
    fn test_partial_document() {
        let config = BridgeConfig::from_toml_str(
            r#"
            channel_name = "app.viewer/event"

            [rendering]
            frame_interval_secs = 0.033

            [assets]
            hot_reload_roots = ["/tmp/a", "/tmp/b"]
            "#,
        )
        .unwrap();
        assert_eq!(config.channel_name, "app.viewer/event");
        assert!((config.rendering.frame_interval_secs - 0.033).abs() < 1e-12);
        assert_eq!(config.assets.hot_reload_roots.len(), 2);
        assert_eq!(config.platform, PlatformConfig::default());
    }

    #[test]
    fn test_rejects_bad_interval() {
        let err = BridgeConfig::from_toml_str("[rendering]\nframe_interval_secs = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = BridgeConfig::from_toml_str("[rendering]\nframe_interval_secs = 1e20").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = BridgeConfig::from_toml_str("channel_name = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("ember_config_does_not_exist.toml");
        let err = BridgeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("test_bridge_config_{id}.toml"));
        std::fs::write(&path, "[platform]\ndedicated_thread = true\n").unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert!(config.platform.dedicated_thread);
        assert_eq!(config.platform.thread_name, "ember-platform");

        let _ = std::fs::remove_file(&path);
    }
}
