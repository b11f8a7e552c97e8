//! Editor configuration for GarmentKit
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML files stored in the platform config directory.
//!
//! Configuration is organized into logical sections:
//! - Canvas size (surface and flattened texture resolution)
//! - Brush and eraser defaults
//! - Manipulation handles and resize limits
//! - Layer ordering steps and depth offsets
//! - History depth

use garmentkit_core::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// Surface size in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

/// Paint stroke defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    pub width: f64,
    pub color: Color,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            width: 8.0,
            color: Color::BLACK,
        }
    }
}

/// Erase stroke defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EraserSettings {
    pub width: f64,
}

impl Default for EraserSettings {
    fn default() -> Self {
        Self { width: 24.0 }
    }
}

/// Selection handles and resize limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManipulationSettings {
    /// Smallest width/height a resize can produce
    pub min_size: f64,
    /// Pointer distance at which a handle is grabbed
    pub handle_radius: f64,
    /// Distance of the rotate handle above the top edge
    pub rotate_handle_offset: f64,
}

impl Default for ManipulationSettings {
    fn default() -> Self {
        Self {
            min_size: 8.0,
            handle_radius: 8.0,
            rotate_handle_offset: 30.0,
        }
    }
}

/// Layer ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSettings {
    /// Gap left by bring-to-front / send-to-back
    pub step: i64,
    pub color_base: i64,
    pub texture_base: i64,
    pub text_base: i64,
    pub logo_base: i64,
    /// 3D depth offset covered by one `step` of zIndex
    pub depth_epsilon: f64,
    /// Position offset applied to duplicated elements
    pub duplicate_offset: [f64; 3],
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            step: 20,
            color_base: 0,
            texture_base: 100,
            text_base: 200,
            logo_base: 300,
            depth_epsilon: 0.1,
            duplicate_offset: [0.05, -0.05, 0.0],
        }
    }
}

/// Undo/redo depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Oldest entries are dropped past this count; 0 keeps everything
    pub max_entries: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_entries: 200 }
    }
}

/// Complete editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas: CanvasSettings,
    pub brush: BrushSettings,
    pub eraser: EraserSettings,
    pub manipulation: ManipulationSettings,
    pub layers: LayerSettings,
    pub history: HistorySettings,
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML, by extension)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded editor config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML, by extension)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Load `editor.toml` from the config directory, or defaults if absent
    pub fn load_or_default() -> SettingsResult<Self> {
        let path = config_dir()?.join("editor.toml");
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        fn out_of_range(key: &str, value: impl ToString) -> ConfigError {
            ConfigError::ValueOutOfRange {
                key: key.to_string(),
                value: value.to_string(),
            }
        }

        if self.canvas.width == 0 {
            return Err(out_of_range("canvas.width", self.canvas.width));
        }
        if self.canvas.height == 0 {
            return Err(out_of_range("canvas.height", self.canvas.height));
        }
        if self.brush.width <= 0.0 || !self.brush.width.is_finite() {
            return Err(out_of_range("brush.width", self.brush.width));
        }
        if self.eraser.width <= 0.0 || !self.eraser.width.is_finite() {
            return Err(out_of_range("eraser.width", self.eraser.width));
        }
        if self.manipulation.min_size <= 0.0 {
            return Err(out_of_range(
                "manipulation.min_size",
                self.manipulation.min_size,
            ));
        }
        if self.manipulation.handle_radius <= 0.0 {
            return Err(out_of_range(
                "manipulation.handle_radius",
                self.manipulation.handle_radius,
            ));
        }
        if self.layers.step <= 0 {
            return Err(out_of_range("layers.step", self.layers.step));
        }
        if self.layers.depth_epsilon < 0.0 || !self.layers.depth_epsilon.is_finite() {
            return Err(out_of_range(
                "layers.depth_epsilon",
                self.layers.depth_epsilon,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Platform config directory for GarmentKit (created if missing)
pub fn config_dir() -> SettingsResult<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        SettingsError::ConfigDirectory("no config directory on this platform".to_string())
    })?;
    let dir = base.join("garmentkit");
    std::fs::create_dir_all(&dir)
        .map_err(|e| SettingsError::ConfigDirectory(format!("{}: {}", dir.display(), e)))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layers.step, 20);
        assert_eq!(config.layers.text_base, 200);
    }

    #[test]
    fn test_validate_rejects_zero_step() {
        let mut config = EditorConfig::default();
        config.layers.step = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValueOutOfRange { ref key, .. }) if key == "layers.step"
        ));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: EditorConfig = toml::from_str("[brush]\nwidth = 3.5\n").unwrap();
        assert_eq!(config.brush.width, 3.5);
        assert_eq!(config.brush.color, Color::BLACK);
        assert_eq!(config.canvas, CanvasSettings::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = EditorConfig::default()
            .save_to_file(Path::new("editor.yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Config(ConfigError::UnsupportedFormat(_))
        ));
    }
}
