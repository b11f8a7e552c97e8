//! Event type definitions for the event bus.
//!
//! Events are what the engine tells its hosts: a texture is ready for the
//! renderer, history moved, the layer list changed. They are cloneable and
//! serializable for logging/replay.

use serde::{Deserialize, Serialize};

use crate::ids::{ElementId, ImageRef, ObjectId, PartId};

/// Root event enum for all design events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DesignEvent {
    /// Part texture publication
    Texture(TextureEvent),
    /// Undo/redo stack changes
    History(HistoryEvent),
    /// Layer list changes
    Layers(LayerEvent),
    /// Whole-design lifecycle
    Design(DesignLifecycleEvent),
    /// Drawing mode changes
    Mode(ModeEvent),
    /// Asset load outcomes
    Asset(AssetEvent),
}

impl DesignEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            DesignEvent::Texture(_) => EventCategory::Texture,
            DesignEvent::History(_) => EventCategory::History,
            DesignEvent::Layers(_) => EventCategory::Layers,
            DesignEvent::Design(_) => EventCategory::Design,
            DesignEvent::Mode(_) => EventCategory::Mode,
            DesignEvent::Asset(_) => EventCategory::Asset,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            DesignEvent::Texture(e) => e.description(),
            DesignEvent::History(e) => e.description(),
            DesignEvent::Layers(e) => e.description(),
            DesignEvent::Design(e) => e.description(),
            DesignEvent::Mode(e) => e.description(),
            DesignEvent::Asset(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Texture publication events.
    Texture,
    /// History events.
    History,
    /// Layer list events.
    Layers,
    /// Design lifecycle events.
    Design,
    /// Drawing mode events.
    Mode,
    /// Asset events.
    Asset,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Texture => write!(f, "Texture"),
            EventCategory::History => write!(f, "History"),
            EventCategory::Layers => write!(f, "Layers"),
            EventCategory::Design => write!(f, "Design"),
            EventCategory::Mode => write!(f, "Mode"),
            EventCategory::Asset => write!(f, "Asset"),
        }
    }
}

/// Texture events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextureEvent {
    /// A part's flattened, flipped raster replaced its live texture.
    Published {
        /// Part whose texture changed.
        part: PartId,
        /// Monotonic publication counter for this session.
        generation: u64,
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
    },
    /// All published textures were dropped (model switch or load).
    Cleared,
}

impl TextureEvent {
    fn description(&self) -> String {
        match self {
            TextureEvent::Published {
                part, generation, ..
            } => format!("Texture for {} published (gen {})", part, generation),
            TextureEvent::Cleared => "Textures cleared".to_string(),
        }
    }
}

/// History events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryEvent {
    /// A snapshot was pushed after a committed mutation.
    Pushed {
        /// Part whose history grew.
        part: PartId,
        /// New cursor position.
        cursor: usize,
        /// Number of entries after the push.
        len: usize,
    },
    /// Undo restored an older snapshot.
    Undone {
        /// Part affected.
        part: PartId,
        /// New cursor position.
        cursor: usize,
    },
    /// Redo restored a newer snapshot.
    Redone {
        /// Part affected.
        part: PartId,
        /// New cursor position.
        cursor: usize,
    },
    /// A stored snapshot could not be restored; cursor unchanged.
    RestoreFailed {
        /// Part affected.
        part: PartId,
        /// Error message.
        error: String,
    },
}

impl HistoryEvent {
    fn description(&self) -> String {
        match self {
            HistoryEvent::Pushed { part, cursor, len } => {
                format!("History push on {} ({}/{})", part, cursor + 1, len)
            }
            HistoryEvent::Undone { part, cursor } => format!("Undo on {} -> {}", part, cursor),
            HistoryEvent::Redone { part, cursor } => format!("Redo on {} -> {}", part, cursor),
            HistoryEvent::RestoreFailed { part, error } => {
                format!("History restore failed on {}: {}", part, error)
            }
        }
    }
}

/// Layer events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerEvent {
    /// The derived layer list was recomputed.
    Rebuilt {
        /// Number of layers in the list.
        count: usize,
    },
    /// A layer's zIndex changed through a reorder.
    Reordered {
        /// Layer id as displayed (`kind:source`).
        layer: String,
        /// zIndex before.
        from: i64,
        /// zIndex after.
        to: i64,
    },
    /// An overlay element was added.
    ElementAdded {
        /// The new element.
        element: ElementId,
    },
    /// An overlay element was removed.
    ElementRemoved {
        /// The removed element.
        element: ElementId,
    },
}

impl LayerEvent {
    fn description(&self) -> String {
        match self {
            LayerEvent::Rebuilt { count } => format!("Layer list rebuilt ({} layers)", count),
            LayerEvent::Reordered { layer, from, to } => {
                format!("Layer {} moved {} -> {}", layer, from, to)
            }
            LayerEvent::ElementAdded { element } => format!("Element {} added", element),
            LayerEvent::ElementRemoved { element } => format!("Element {} removed", element),
        }
    }
}

/// Design lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DesignLifecycleEvent {
    /// A model was selected and the design state reset.
    ModelSelected {
        /// Model name.
        model: String,
    },
    /// The active part changed.
    PartSelected {
        /// New active part.
        part: PartId,
    },
    /// A design document was loaded and swapped in.
    Loaded {
        /// Model name of the loaded design.
        model: String,
    },
    /// A design document was produced for saving.
    Saved {
        /// Model name of the saved design.
        model: String,
    },
    /// A surface object was selected or deselected.
    SelectionChanged {
        /// The selected object, if any.
        object: Option<ObjectId>,
    },
}

impl DesignLifecycleEvent {
    fn description(&self) -> String {
        match self {
            DesignLifecycleEvent::ModelSelected { model } => format!("Model {} selected", model),
            DesignLifecycleEvent::PartSelected { part } => format!("Part {} selected", part),
            DesignLifecycleEvent::Loaded { model } => format!("Design loaded ({})", model),
            DesignLifecycleEvent::Saved { model } => format!("Design saved ({})", model),
            DesignLifecycleEvent::SelectionChanged { object } => match object {
                Some(id) => format!("Object {} selected", id),
                None => "Selection cleared".to_string(),
            },
        }
    }
}

/// Drawing mode events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModeEvent {
    /// The drawing mode changed.
    Changed {
        /// Previous mode name.
        from: String,
        /// New mode name.
        to: String,
    },
}

impl ModeEvent {
    fn description(&self) -> String {
        match self {
            ModeEvent::Changed { from, to } => format!("Mode {} -> {}", from, to),
        }
    }
}

/// Asset events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssetEvent {
    /// An image was decoded and cached.
    Loaded {
        /// The image reference.
        image: ImageRef,
    },
    /// An image failed to load; nothing was changed.
    Failed {
        /// The image reference.
        image: ImageRef,
        /// Error message.
        error: String,
    },
    /// A decoded image arrived after its part was evicted and was dropped.
    Discarded {
        /// The image reference.
        image: ImageRef,
        /// Part it was meant for.
        part: PartId,
    },
}

impl AssetEvent {
    fn description(&self) -> String {
        match self {
            AssetEvent::Loaded { image } => format!("Image {} loaded", image),
            AssetEvent::Failed { image, error } => format!("Image {} failed: {}", image, error),
            AssetEvent::Discarded { image, part } => {
                format!("Image {} for {} discarded", image, part)
            }
        }
    }
}
