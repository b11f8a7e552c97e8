//! # GarmentKit Designer
//!
//! The design-surface engine behind the garment customizer. Each garment part
//! owns a 2D surface that users paint on, letter and decorate with images;
//! every committed change is snapshotted for undo/redo and the flattened
//! surface is published as the part's texture.
//!
//! ## Architecture
//!
//! ```text
//! DesignSession (host facade)
//!   ├── DesignState (model, colors, fill textures, text/logo elements, lighting)
//!   │     └── Layers (unified zIndex ordering, depth mapping)
//!   ├── SurfaceArena (one SurfaceEngine per activated part)
//!   │     └── SurfaceEngine (objects, strokes, gestures, HistoryStack)
//!   ├── ModeMachine (select / brush / eraser / text / logo)
//!   ├── TextureSync (dirty parts -> raster -> published texture)
//!   └── AssetCache (decoded images)
//!
//! DesignFile (JSON save/load) ── DesignStore (per-user files)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use garmentkit_designer::{DesignSession, DrawingMode, Point};
//!
//! let mut session = DesignSession::with_defaults("tshirt")?;
//! session.set_mode(DrawingMode::Brush);
//! session.pointer_down(Point::new(10.0, 10.0))?;
//! session.pointer_up(Point::new(80.0, 40.0))?;
//! session.undo();
//! ```

pub mod arena;
pub mod assets;
pub mod design_file;
pub mod design_state;
pub mod elements;
pub mod engine;
pub mod font_manager;
pub mod geometry;
pub mod history;
pub mod layers;
pub mod manipulation;
pub mod mode;
pub mod object;
pub mod raster;
pub mod session;
pub mod store;
pub mod surface;
pub mod texture_sync;

pub use arena::SurfaceArena;
pub use assets::{AssetCache, DecodedImage};
pub use design_file::{DesignFile, StagedDesign, DESIGN_FILE_VERSION};
pub use design_state::{DesignState, Lighting, PartLayerState};
pub use elements::{LogoElement, OverlayElement, OverlayRecord, TextElement, TextUpdate};
pub use engine::{CommandOutcome, SurfaceCommand, SurfaceEngine};
pub use geometry::{Handle, Placement, Point};
pub use history::HistoryStack;
pub use layers::{
    apply_reorder, build_layers, depth_offset_for, reorder, DepthMapping, Layer, LayerId,
    LayerKind, ReorderOp, ReorderPlan, ZChange,
};
pub use manipulation::GestureKind;
pub use mode::{DrawingMode, ModeMachine, ModeTransition};
pub use object::{
    FontStyle, FontWeight, ObjectKind, StrokeMode, StrokeStyle, SurfaceObject, TextAlign,
    TextStyle,
};
pub use session::{
    DesignSession, ImageLoad, ImageOutcome, ImageTarget, PartFrame, PendingImage, PlacedElement,
    RenderFrame,
};
pub use store::DesignStore;
pub use surface::{SurfaceBlob, SurfaceState};
pub use texture_sync::{PublishedTexture, TextureSync};
