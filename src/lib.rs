//! # GarmentKit
//!
//! Design-surface engine for a 3D garment customizer: users paint, letter
//! and place logos on each part of a garment model, and every part's
//! surface is published as a texture for the 3D renderer.
//!
//! ## Architecture
//!
//! GarmentKit is organized as a workspace:
//!
//! 1. **garmentkit-core** - Ids, colors, garment models, errors, event bus, session context, asset boundaries
//! 2. **garmentkit-settings** - Editor configuration (canvas, brush, eraser, layers, history)
//! 3. **garmentkit-designer** - Surfaces, history, manipulation, layers, rasterizer, texture sync, save/load
//! 4. **garmentkit** - This crate: logging setup and the `garmentkit` command-line tool
//!
//! ## Features
//!
//! - **Per-part surfaces**: brush, eraser, text runs, images and a fill-texture base layer
//! - **Undo/redo**: one snapshot per committed change, per part
//! - **Unified layers**: colors, textures, text and logos ordered by zIndex
//! - **Texture sync**: flattened surfaces republished after every commit
//! - **Persistence**: camelCase JSON design files, stored per user

pub use garmentkit_core as core;
pub use garmentkit_designer as designer;
pub use garmentkit_settings as settings;

pub use garmentkit_core::{
    Color, DesignEvent, Error, EventBus, GarmentModel, ImageRef, ModelCatalog, PartId, Result,
    SessionContext, UserId,
};
pub use garmentkit_designer::{
    DesignFile, DesignSession, DesignStore, DrawingMode, LayerId, Point, ReorderOp, TextStyle,
};
pub use garmentkit_settings::EditorConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output to stderr, so piped command output stays clean
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
