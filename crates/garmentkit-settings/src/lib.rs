//! GarmentKit Settings Crate
//!
//! Editor configuration: canvas size, brush/eraser defaults, manipulation
//! limits, layer ordering steps and history depth.

pub mod config;
pub mod error;

pub use config::{
    config_dir, BrushSettings, CanvasSettings, EditorConfig, EraserSettings, HistorySettings,
    LayerSettings, ManipulationSettings,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
