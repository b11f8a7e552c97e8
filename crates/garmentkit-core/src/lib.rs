//! # GarmentKit Core
//!
//! Core types shared by every GarmentKit crate: identifiers, colors, the
//! garment model catalog, error types, the event bus, the injected session
//! context and the async asset boundaries.

pub mod asset;
pub mod color;
pub mod context;
pub mod error;
pub mod event_bus;
pub mod ids;
pub mod model;

pub use asset::{AssetSource, AssetUploader, FileAssetSource, MemoryAssetStore, UploadedAsset};
pub use color::Color;
pub use context::{SessionContext, UserId};
pub use error::{
    AssetLoadError, ColorError, DeserializeError, DesignFileError, Error, HistoryError, ModelError,
    Result,
};
pub use ids::{ElementId, ImageRef, ObjectId, PartId};
pub use model::{GarmentModel, ModelCatalog};

pub use event_bus::{
    event_bus, AssetEvent, DesignEvent, DesignLifecycleEvent, EventBus, EventBusConfig,
    EventCategory, EventFilter, HistoryEvent, LayerEvent, ModeEvent, SubscriptionId, TextureEvent,
};
