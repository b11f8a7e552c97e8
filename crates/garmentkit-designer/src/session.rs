//! Design session.
//!
//! [`DesignSession`] is the host-facing facade: it owns the design state,
//! the per-part surface arena, the drawing mode, the texture synchronizer
//! and the decoded-image cache, and keeps them consistent. Every public
//! mutator finishes by flushing dirty textures.
//!
//! Text and logo elements created through the insert modes are linked to
//! the surface object they were authored with. Their state travels in that
//! part's history snapshots, so undo and redo restore them with the
//! surface.

use garmentkit_core::{
    AssetEvent, AssetLoadError, AssetSource, Color, DesignEvent, DesignFileError,
    DesignLifecycleEvent, ElementId, Error, EventBus, HistoryEvent, ImageRef, LayerEvent,
    ModeEvent, ModelCatalog, ObjectId, PartId, Result, SessionContext,
};
use garmentkit_settings::EditorConfig;
use image::RgbaImage;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::arena::SurfaceArena;
use crate::assets::{self, AssetCache, DecodedImage};
use crate::design_file::DesignFile;
use crate::design_state::{DesignState, Lighting};
use crate::elements::{LogoElement, OverlayElement, TextElement, TextUpdate};
use crate::engine::{CommandOutcome, SurfaceCommand, SurfaceEngine};
use crate::geometry::{Handle, Placement, Point};
use crate::layers::{self, DepthMapping, Layer, LayerId, LayerKind, ReorderOp, ReorderPlan};
use crate::manipulation;
use crate::mode::{DrawingMode, ModeMachine, ModeTransition};
use crate::object::{ObjectKind, StrokeMode, StrokeStyle, SurfaceObject, TextStyle};
use crate::store::DesignStore;
use crate::texture_sync::{PublishedTexture, TextureSync};

/// What a decoded image is for.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageTarget {
    /// Logo insert: an image object linked to a new logo element
    Logo,
    /// Plain image object on the surface
    Object { placement: Option<Placement> },
    /// The part's fill texture and surface base layer
    FillTexture,
}

/// An image load bound to the part and arena epoch it was started for.
#[derive(Debug, Clone)]
pub struct PendingImage {
    part: PartId,
    epoch: u64,
    image: ImageRef,
    target: ImageTarget,
}

impl PendingImage {
    pub fn part(&self) -> &PartId {
        &self.part
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn target(&self) -> &ImageTarget {
        &self.target
    }

    /// Fetch and decode; the session is not borrowed meanwhile
    pub async fn fetch(self, source: &dyn AssetSource) -> ImageLoad {
        let result = assets::load(source, &self.image).await;
        ImageLoad {
            pending: self,
            result,
        }
    }
}

/// A finished fetch waiting to be applied.
#[derive(Debug)]
pub struct ImageLoad {
    pending: PendingImage,
    result: std::result::Result<DecodedImage, AssetLoadError>,
}

impl ImageLoad {
    pub fn pending(&self) -> &PendingImage {
        &self.pending
    }
}

/// Result of applying an image load.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    /// An image object was added to the captured part
    Inserted {
        part: PartId,
        object: ObjectId,
        element: Option<ElementId>,
    },
    /// The captured part's fill texture and base layer were replaced
    FillTextureSet { part: PartId },
    /// The model changed while loading; nothing was applied
    Discarded,
}

/// A part as the renderer needs it.
#[derive(Debug, Clone)]
pub struct PartFrame {
    pub part: PartId,
    pub color: Color,
    pub texture: Option<Arc<RgbaImage>>,
    pub texture_generation: Option<u64>,
    pub visible: bool,
    pub color_visible: bool,
    pub texture_visible: bool,
}

/// A text or logo element with its depth offset.
#[derive(Debug, Clone)]
pub struct PlacedElement<T> {
    pub element: T,
    pub depth_offset: f64,
}

/// Everything the renderer pulls for one frame.
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub model: String,
    pub parts: Vec<PartFrame>,
    pub text_elements: Vec<PlacedElement<TextElement>>,
    pub logo_elements: Vec<PlacedElement<LogoElement>>,
    pub lighting: Lighting,
    pub background_color: Color,
}

/// Host-facing design session.
#[derive(Debug)]
pub struct DesignSession {
    catalog: ModelCatalog,
    config: EditorConfig,
    state: DesignState,
    arena: SurfaceArena,
    modes: ModeMachine,
    textures: TextureSync,
    images: AssetCache,
    bus: Arc<EventBus>,
}

impl DesignSession {
    /// Start a session on `model`
    pub fn new(
        catalog: ModelCatalog,
        config: EditorConfig,
        model: &str,
        bus: Arc<EventBus>,
    ) -> Result<Self> {
        let state = DesignState::new(catalog.get(model)?.clone(), config.layers.clone())?;
        let mut session = Self {
            arena: SurfaceArena::new(config.clone()),
            catalog,
            config,
            state,
            modes: ModeMachine::new(),
            textures: TextureSync::new(),
            images: AssetCache::new(),
            bus,
        };
        session.activate(&session.state.selected_part().clone());
        session.finish();
        Ok(session)
    }

    /// Built-in catalog, default config and the process-wide event bus
    pub fn with_defaults(model: &str) -> Result<Self> {
        Self::new(
            ModelCatalog::builtin(),
            EditorConfig::default(),
            model,
            garmentkit_core::event_bus(),
        )
    }

    pub fn state(&self) -> &DesignState {
        &self.state
    }

    pub fn arena(&self) -> &SurfaceArena {
        &self.arena
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn mode(&self) -> DrawingMode {
        self.modes.mode()
    }

    pub fn images(&self) -> &AssetCache {
        &self.images
    }

    pub fn active_part(&self) -> &PartId {
        self.state.selected_part()
    }

    /// Engine of the active part
    pub fn active_engine(&self) -> Option<&SurfaceEngine> {
        self.arena.get(self.state.selected_part())
    }

    pub fn engine(&self, part: &PartId) -> Option<&SurfaceEngine> {
        self.arena.get(part)
    }

    /// Objects of the active surface, in draw order
    pub fn objects(&self) -> &[SurfaceObject] {
        self.active_engine().map(SurfaceEngine::objects).unwrap_or_default()
    }

    pub fn texture(&self, part: &PartId) -> Option<&PublishedTexture> {
        self.textures.texture(part)
    }

    /// Unified layer list, zIndex descending
    pub fn layers(&self) -> Vec<Layer> {
        layers::build_layers(&self.state)
    }

    fn emit(&self, event: DesignEvent) {
        self.bus.publish(event);
    }

    fn activate(&mut self, part: &PartId) {
        if !self.arena.contains(part) {
            self.arena.get_or_create(part);
            self.textures.mark_dirty(part);
        }
    }

    /// Engine for `part` with the part's overlay elements staged for the next snapshot
    fn staged_engine(&mut self, part: &PartId) -> &mut SurfaceEngine {
        let overlays = self.state.overlays_for(part);
        if !self.arena.contains(part) {
            self.textures.mark_dirty(part);
        }
        let engine = self.arena.get_or_create(part);
        engine.stage_overlays(overlays);
        engine
    }

    fn after_command(&mut self, part: &PartId, outcome: &CommandOutcome) {
        if !outcome.committed {
            return;
        }
        self.textures.mark_dirty(part);
        if let Some(engine) = self.arena.get(part) {
            self.emit(DesignEvent::History(HistoryEvent::Pushed {
                part: part.clone(),
                cursor: engine.history().cursor(),
                len: engine.history().len(),
            }));
        }
    }

    fn finish(&mut self) {
        let state = &self.state;
        self.textures
            .flush(&self.arena, |part| state.color(part), &self.images, &self.bus);
    }

    /// Flatten and publish every dirty part now
    pub fn flush_textures(&mut self) -> Vec<PartId> {
        let state = &self.state;
        self.textures
            .flush(&self.arena, |part| state.color(part), &self.images, &self.bus)
    }

    /// Switch to another garment model; the whole design and every surface reset
    pub fn select_model(&mut self, name: &str) -> Result<()> {
        let model = self.catalog.get(name)?.clone();
        let state = DesignState::new(model, self.config.layers.clone())?;
        self.state = state;
        let evicted = self.arena.reset();
        self.textures.clear(&self.bus);
        self.images = AssetCache::new();
        let transition = self.modes.switch(DrawingMode::Select);
        self.emit_mode(transition);
        tracing::info!("Selected model {} ({} surfaces evicted)", name, evicted);
        self.emit(DesignEvent::Design(DesignLifecycleEvent::ModelSelected {
            model: name.to_string(),
        }));
        self.activate(&self.state.selected_part().clone());
        self.finish();
        Ok(())
    }

    /// Make `part` the active surface; an in-progress stroke or gesture on the old part is aborted
    pub fn select_part(&mut self, part: &PartId) -> Result<()> {
        self.state.model().require_part(part)?;
        let previous = self.state.selected_part().clone();
        if &previous != part {
            if let Some(engine) = self.arena.get_mut(&previous) {
                engine.abort_interaction();
            }
            self.state.select_part(part)?;
            self.emit(DesignEvent::Design(DesignLifecycleEvent::PartSelected {
                part: part.clone(),
            }));
        }
        self.activate(part);
        self.finish();
        Ok(())
    }

    fn emit_mode(&self, transition: ModeTransition) {
        if transition.is_change() {
            self.emit(DesignEvent::Mode(ModeEvent::Changed {
                from: transition.from.to_string(),
                to: transition.to.to_string(),
            }));
        }
    }

    /// Switch drawing mode; deselects and cancels any stroke or gesture without a snapshot
    pub fn set_mode(&mut self, mode: DrawingMode) {
        let transition = self.modes.switch(mode);
        if !transition.is_change() {
            return;
        }
        let part = self.state.selected_part().clone();
        if let Some(engine) = self.arena.get_mut(&part) {
            engine.abort_interaction();
            // Deselecting cannot fail.
            let _ = engine.apply_command(SurfaceCommand::Select(None));
        }
        self.emit_mode(transition);
        self.emit(DesignEvent::Design(DesignLifecycleEvent::SelectionChanged {
            object: None,
        }));
        self.finish();
    }

    fn stroke_style(&self) -> StrokeStyle {
        match self.modes.mode() {
            DrawingMode::Eraser => StrokeStyle {
                mode: StrokeMode::Erase,
                color: self.state.color(self.state.selected_part()),
                width: self.config.eraser.width,
            },
            _ => StrokeStyle {
                mode: StrokeMode::Paint,
                color: self.config.brush.color,
                width: self.config.brush.width,
            },
        }
    }

    /// Pointer press on the active surface
    pub fn pointer_down(&mut self, point: Point) -> Result<CommandOutcome> {
        let mode = self.modes.mode();
        if mode.draws_strokes() {
            let style = self.stroke_style();
            self.apply_surface_command(SurfaceCommand::BeginStroke { point, style })
        } else if mode.manipulates() {
            let outcome = self.apply_surface_command(SurfaceCommand::BeginGesture(point))?;
            self.emit(DesignEvent::Design(DesignLifecycleEvent::SelectionChanged {
                object: outcome.object,
            }));
            Ok(outcome)
        } else {
            Ok(CommandOutcome::default())
        }
    }

    /// Pointer move; only the live view changes
    pub fn pointer_move(&mut self, point: Point) -> Result<CommandOutcome> {
        let mode = self.modes.mode();
        if mode.draws_strokes() {
            self.apply_surface_command(SurfaceCommand::ExtendStroke(point))
        } else if mode.manipulates() {
            self.apply_surface_command(SurfaceCommand::UpdateGesture(point))
        } else {
            Ok(CommandOutcome::default())
        }
    }

    /// Pointer release, inside or outside the canvas; concludes the stroke or gesture
    pub fn pointer_up(&mut self, point: Point) -> Result<CommandOutcome> {
        let mode = self.modes.mode();
        if mode.draws_strokes() {
            self.apply_surface_command(SurfaceCommand::ExtendStroke(point))?;
            self.apply_surface_command(SurfaceCommand::EndStroke)
        } else if mode.manipulates() {
            self.apply_surface_command(SurfaceCommand::UpdateGesture(point))?;
            self.apply_surface_command(SurfaceCommand::Release)
        } else {
            Ok(CommandOutcome::default())
        }
    }

    fn check_mode(&self, command: &SurfaceCommand) -> Result<()> {
        let mode = self.modes.mode();
        let allowed = match command {
            SurfaceCommand::BeginStroke { .. }
            | SurfaceCommand::ExtendStroke(_)
            | SurfaceCommand::EndStroke => mode.draws_strokes(),
            SurfaceCommand::BeginGesture(_)
            | SurfaceCommand::UpdateGesture(_)
            | SurfaceCommand::Drag { .. }
            | SurfaceCommand::Resize { .. }
            | SurfaceCommand::Rotate { .. }
            | SurfaceCommand::Select(Some(_)) => mode.manipulates(),
            _ => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidOperation(format!(
                "surface command not available in {} mode",
                mode
            )))
        }
    }

    /// Run one command against the active surface.
    ///
    /// Overlay elements linked to objects the command removes are removed
    /// with them, inside the same snapshot.
    pub fn apply_surface_command(&mut self, command: SurfaceCommand) -> Result<CommandOutcome> {
        self.check_mode(&command)?;
        let part = self.state.selected_part().clone();
        self.run_on(&part, command)
    }

    fn run_on(&mut self, part: &PartId, command: SurfaceCommand) -> Result<CommandOutcome> {
        let doomed: Vec<ElementId> = match (&command, self.arena.get(part)) {
            (SurfaceCommand::Clear, Some(engine)) => engine
                .objects()
                .iter()
                .filter_map(|o| o.kind.overlay())
                .collect(),
            (SurfaceCommand::RemoveObject(id), Some(engine)) => engine
                .surface()
                .get(*id)
                .and_then(|o| o.kind.overlay())
                .into_iter()
                .collect(),
            _ => Vec::new(),
        };
        for element in &doomed {
            if self.state.remove_element(*element).is_some() {
                self.emit(DesignEvent::Layers(LayerEvent::ElementRemoved {
                    element: *element,
                }));
            }
        }

        let outcome = self.staged_engine(part).apply_command(command)?;
        self.after_command(part, &outcome);
        self.finish();
        Ok(outcome)
    }

    /// Remove every object but the base layer from the active surface
    pub fn clear(&mut self) -> Result<CommandOutcome> {
        self.apply_surface_command(SurfaceCommand::Clear)
    }

    /// Remove one object from the active surface
    pub fn remove_object(&mut self, object: ObjectId) -> Result<CommandOutcome> {
        self.apply_surface_command(SurfaceCommand::RemoveObject(object))
    }

    /// Change an object's draw index on the active surface
    pub fn reorder_object(&mut self, object: ObjectId, op: ReorderOp) -> Result<CommandOutcome> {
        self.apply_surface_command(SurfaceCommand::Reorder { object, op })
    }

    fn overlay_position(&self, at: Point, z_index: i64) -> [f64; 3] {
        let canvas = &self.config.canvas;
        let depth = DepthMapping::new(&self.config.layers).offset_for(z_index);
        [
            at.x / f64::from(canvas.width.max(1)) - 0.5,
            0.5 - at.y / f64::from(canvas.height.max(1)),
            depth,
        ]
    }

    fn canvas_center(&self) -> Point {
        Point::new(
            f64::from(self.config.canvas.width) / 2.0,
            f64::from(self.config.canvas.height) / 2.0,
        )
    }

    /// The text-insert "apply" action.
    ///
    /// Adds a glyph run at the canvas center linked to a new text element,
    /// takes one snapshot and returns to select mode with the run selected.
    pub fn apply_text(&mut self, text: &str, style: TextStyle) -> Result<ElementId> {
        if self.modes.mode() != DrawingMode::TextInsert {
            return Err(Error::InvalidOperation(format!(
                "text apply needs text-insert mode, not {}",
                self.modes.mode()
            )));
        }
        let part = self.state.selected_part().clone();
        let at = self.canvas_center();
        let z_index = self.state.next_z_index(LayerKind::Text);
        let mut element =
            TextElement::new(text, style.clone(), self.overlay_position(at, z_index), z_index);
        element.part = Some(part.clone());
        let id = self.state.push_text(element);

        let command = SurfaceCommand::InsertText {
            text: text.to_string(),
            style,
            at,
            overlay: Some(id),
        };
        let outcome = match self.staged_engine(&part).apply_command(command) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state.remove_element(id);
                return Err(e);
            }
        };
        self.after_command(&part, &outcome);
        self.emit(DesignEvent::Layers(LayerEvent::ElementAdded { element: id }));
        if let Some(transition) = self.modes.complete_insert() {
            self.emit_mode(transition);
        }
        self.emit(DesignEvent::Design(DesignLifecycleEvent::SelectionChanged {
            object: outcome.object,
        }));
        self.finish();
        Ok(id)
    }

    fn begin_image(&self, image: ImageRef, target: ImageTarget) -> PendingImage {
        PendingImage {
            part: self.state.selected_part().clone(),
            epoch: self.arena.epoch(),
            image,
            target,
        }
    }

    /// The logo-insert "apply" action: capture the active part for a logo load
    pub fn begin_logo(&self, image: ImageRef) -> Result<PendingImage> {
        if self.modes.mode() != DrawingMode::LogoInsert {
            return Err(Error::InvalidOperation(format!(
                "logo apply needs logo-insert mode, not {}",
                self.modes.mode()
            )));
        }
        Ok(self.begin_image(image, ImageTarget::Logo))
    }

    /// Capture the active part for a plain image insert
    pub fn begin_image_insert(&self, image: ImageRef, placement: Option<Placement>) -> PendingImage {
        self.begin_image(image, ImageTarget::Object { placement })
    }

    /// Capture the active part for a fill texture load
    pub fn begin_fill_texture(&self, image: ImageRef) -> PendingImage {
        self.begin_image(image, ImageTarget::FillTexture)
    }

    /// Apply a finished load to the part it was started for.
    ///
    /// A failed load changes nothing. A load that finishes after a model
    /// switch or design load is discarded.
    pub fn complete_image(&mut self, load: ImageLoad) -> Result<ImageOutcome> {
        let ImageLoad { pending, result } = load;
        let decoded = match result {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Image {} failed to load: {}", pending.image, e);
                self.emit(DesignEvent::Asset(AssetEvent::Failed {
                    image: pending.image.clone(),
                    error: e.to_string(),
                }));
                return Err(e.into());
            }
        };

        if pending.epoch != self.arena.epoch() || !self.state.model().has_part(&pending.part) {
            tracing::debug!(
                "Image {} for {} arrived after a reset, discarded",
                pending.image,
                pending.part
            );
            self.emit(DesignEvent::Asset(AssetEvent::Discarded {
                image: pending.image.clone(),
                part: pending.part.clone(),
            }));
            return Ok(ImageOutcome::Discarded);
        }

        self.images.insert(&decoded);
        self.emit(DesignEvent::Asset(AssetEvent::Loaded {
            image: pending.image.clone(),
        }));

        let part = pending.part.clone();
        let outcome = match pending.target {
            ImageTarget::FillTexture => {
                self.state
                    .set_fill_texture(&part, Some(pending.image.clone()))?;
                let outcome = self
                    .staged_engine(&part)
                    .apply_command(SurfaceCommand::SetBaseLayer(Some(pending.image.clone())))?;
                self.after_command(&part, &outcome);
                ImageOutcome::FillTextureSet { part }
            }
            ImageTarget::Object { placement } => {
                let outcome = self.staged_engine(&part).apply_command(SurfaceCommand::InsertImage {
                    image: pending.image.clone(),
                    natural_width: decoded.width(),
                    natural_height: decoded.height(),
                    placement,
                    overlay: None,
                })?;
                self.after_command(&part, &outcome);
                ImageOutcome::Inserted {
                    part,
                    object: outcome.object.ok_or_else(|| Error::other("insert produced no object"))?,
                    element: None,
                }
            }
            ImageTarget::Logo => self.insert_logo(&part, &pending.image, &decoded)?,
        };

        self.finish();
        Ok(outcome)
    }

    fn insert_logo(
        &mut self,
        part: &PartId,
        image: &ImageRef,
        decoded: &DecodedImage,
    ) -> Result<ImageOutcome> {
        let at = self.canvas_center();
        let z_index = self.state.next_z_index(LayerKind::Logo);
        let mut element = LogoElement::new(image.clone(), self.overlay_position(at, z_index), z_index);
        element.part = Some(part.clone());
        let id = self.state.push_logo(element);

        let command = SurfaceCommand::InsertImage {
            image: image.clone(),
            natural_width: decoded.width(),
            natural_height: decoded.height(),
            placement: None,
            overlay: Some(id),
        };
        let outcome = match self.staged_engine(part).apply_command(command) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state.remove_element(id);
                return Err(e);
            }
        };
        self.after_command(part, &outcome);
        self.emit(DesignEvent::Layers(LayerEvent::ElementAdded { element: id }));

        if let Some(transition) = self.modes.complete_insert() {
            self.emit_mode(transition);
        }
        Ok(ImageOutcome::Inserted {
            part: part.clone(),
            object: outcome.object.ok_or_else(|| Error::other("insert produced no object"))?,
            element: Some(id),
        })
    }

    /// Logo apply, fetch and insert in one call
    pub async fn insert_logo_from(
        &mut self,
        source: &dyn AssetSource,
        image: ImageRef,
    ) -> Result<ImageOutcome> {
        let pending = self.begin_logo(image)?;
        let load = pending.fetch(source).await;
        self.complete_image(load)
    }

    /// Fetch an image and insert it on the active part
    pub async fn insert_image(
        &mut self,
        source: &dyn AssetSource,
        image: ImageRef,
        placement: Option<Placement>,
    ) -> Result<ImageOutcome> {
        let load = self.begin_image_insert(image, placement).fetch(source).await;
        self.complete_image(load)
    }

    /// Fetch a fill texture for the active part and make it the base layer
    pub async fn set_fill_texture(
        &mut self,
        source: &dyn AssetSource,
        image: ImageRef,
    ) -> Result<ImageOutcome> {
        let load = self.begin_fill_texture(image).fetch(source).await;
        self.complete_image(load)
    }

    /// Remove the fill texture and base layer of `part`
    pub fn clear_fill_texture(&mut self, part: &PartId) -> Result<()> {
        self.state.set_fill_texture(part, None)?;
        let outcome = self
            .staged_engine(part)
            .apply_command(SurfaceCommand::SetBaseLayer(None))?;
        self.after_command(part, &outcome);
        self.finish();
        Ok(())
    }

    /// Fetch every referenced image that is not decoded yet.
    ///
    /// Failures are returned, not raised; the rest still load.
    pub async fn preload_images(&mut self, source: &dyn AssetSource) -> Vec<AssetLoadError> {
        let mut wanted: BTreeSet<ImageRef> = self.state.fill_textures().values().flatten().cloned().collect();
        wanted.extend(self.state.logo_elements().iter().map(|l| l.image.clone()));
        for engine in self.arena.engines() {
            for object in engine.objects() {
                match &object.kind {
                    ObjectKind::Image(data) => {
                        wanted.insert(data.image.clone());
                    }
                    ObjectKind::BaseLayer { image } => {
                        wanted.insert(image.clone());
                    }
                    _ => {}
                }
            }
        }
        wanted.retain(|image| !self.images.contains(image));

        let mut failures = Vec::new();
        for image in wanted {
            match assets::load(source, &image).await {
                Ok(decoded) => self.images.insert(&decoded),
                Err(e) => {
                    tracing::warn!("Preloading {} failed: {}", image, e);
                    failures.push(e);
                }
            }
        }
        let parts: Vec<PartId> = self.arena.parts().cloned().collect();
        for part in &parts {
            self.textures.mark_dirty(part);
        }
        self.finish();
        failures
    }

    pub fn set_part_color(&mut self, part: &PartId, color: Color) -> Result<()> {
        self.state.set_color(part, color)?;
        if self.arena.contains(part) {
            self.textures.mark_dirty(part);
        }
        self.finish();
        Ok(())
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.state.set_background_color(color);
    }

    pub fn set_lighting(&mut self, lighting: Lighting) {
        self.state.set_lighting(lighting);
    }

    /// Step the active part back one snapshot; `false` if nothing changed
    pub fn undo(&mut self) -> bool {
        self.step_history(true)
    }

    /// Step the active part forward one snapshot; `false` if nothing changed
    pub fn redo(&mut self) -> bool {
        self.step_history(false)
    }

    fn step_history(&mut self, back: bool) -> bool {
        let part = self.state.selected_part().clone();
        let Some(engine) = self.arena.get_mut(&part) else {
            return false;
        };
        let outcome = if back { engine.undo() } else { engine.redo() };
        let cursor = engine.history().cursor();
        let base_image = engine.surface().base_layer().and_then(|base| match &base.kind {
            ObjectKind::BaseLayer { image } => Some(image.clone()),
            _ => None,
        });

        let changed = match outcome {
            None => false,
            Some(Ok(overlays)) => {
                self.state.restore_overlays(&part, &overlays);
                // The fill texture follows whatever base layer the entry holds.
                if self.state.fill_texture(&part) != base_image.as_ref() {
                    if let Err(e) = self.state.set_fill_texture(&part, base_image) {
                        tracing::warn!("Could not restore fill texture of {}: {}", part, e);
                    }
                }
                self.textures.mark_dirty(&part);
                let event = if back {
                    HistoryEvent::Undone {
                        part: part.clone(),
                        cursor,
                    }
                } else {
                    HistoryEvent::Redone {
                        part: part.clone(),
                        cursor,
                    }
                };
                self.emit(DesignEvent::History(event));
                true
            }
            Some(Err(e)) => {
                tracing::warn!("History entry for {} is corrupt: {}", part, e);
                self.emit(DesignEvent::History(HistoryEvent::RestoreFailed {
                    part: part.clone(),
                    error: e.to_string(),
                }));
                false
            }
        };
        self.finish();
        changed
    }

    /// Add an unlinked text element
    pub fn add_text(&mut self, text: &str, style: TextStyle, position: [f64; 3]) -> ElementId {
        let id = self.state.add_text(text, style, position);
        self.emit(DesignEvent::Layers(LayerEvent::ElementAdded { element: id }));
        id
    }

    /// Add an unlinked logo element
    pub fn add_logo(&mut self, image: ImageRef, position: [f64; 3]) -> ElementId {
        let id = self.state.add_logo(image, position);
        self.emit(DesignEvent::Layers(LayerEvent::ElementAdded { element: id }));
        id
    }

    /// The part and surface object an element is linked to, if both still exist
    fn linked_object(&self, element: ElementId) -> Option<(PartId, Option<ObjectId>)> {
        let part = self.state.element(element)?.part()?.clone();
        let object = self.arena.get(&part).and_then(|engine| {
            engine
                .objects()
                .iter()
                .find(|o| o.kind.overlay() == Some(element))
                .map(|o| o.id)
        });
        Some((part, object))
    }

    /// Snapshot `part` after a linked element changed, running `command` on its object if any
    fn commit_linked(&mut self, part: &PartId, command: Option<SurfaceCommand>) -> Result<()> {
        let engine = self.staged_engine(part);
        let outcome = match command {
            Some(command) => engine.apply_command(command)?,
            None => CommandOutcome::default(),
        };
        let outcome = if outcome.committed {
            outcome
        } else {
            engine.checkpoint();
            CommandOutcome {
                committed: true,
                ..outcome
            }
        };
        self.after_command(part, &outcome);
        Ok(())
    }

    /// Edit a text element; a linked glyph run follows
    pub fn update_text(&mut self, id: ElementId, update: &TextUpdate) -> Result<bool> {
        update.validate()?;
        let changed = self
            .state
            .update_text(id, update)
            .ok_or_else(|| Error::not_found(format!("text element {}", id)))?;
        if changed {
            if let Some((part, object)) = self.linked_object(id) {
                let command = object.map(|object| SurfaceCommand::EditText {
                    object,
                    text: update.text.clone(),
                    style: update.style.clone(),
                });
                self.commit_linked(&part, command)?;
            }
        }
        self.finish();
        Ok(changed)
    }

    /// Remove a text or logo element; a linked surface object goes with it
    pub fn remove_element(&mut self, id: ElementId) -> Result<OverlayElement> {
        let linked = self.linked_object(id);
        let removed = self
            .state
            .remove_element(id)
            .ok_or_else(|| Error::not_found(format!("element {}", id)))?;
        if let Some((part, object)) = linked {
            self.commit_linked(&part, object.map(SurfaceCommand::RemoveObject))?;
        }
        self.emit(DesignEvent::Layers(LayerEvent::ElementRemoved { element: id }));
        self.finish();
        Ok(removed)
    }

    /// Duplicate an element; the copy is unlinked and one zIndex above its source
    pub fn duplicate_element(&mut self, id: ElementId) -> Result<ElementId> {
        let copy = self
            .state
            .duplicate_element(id)
            .ok_or_else(|| Error::not_found(format!("element {}", id)))?;
        self.emit(DesignEvent::Layers(LayerEvent::ElementAdded { element: copy }));
        Ok(copy)
    }

    pub fn set_element_visible(&mut self, id: ElementId, visible: bool) -> Result<()> {
        if !self.state.set_element_visible(id, visible) {
            return Err(Error::not_found(format!("element {}", id)));
        }
        if let Some((part, object)) = self.linked_object(id) {
            let command = object.map(|object| SurfaceCommand::SetVisible { object, visible });
            self.commit_linked(&part, command)?;
        }
        self.finish();
        Ok(())
    }

    pub fn set_element_locked(&mut self, id: ElementId, locked: bool) -> Result<()> {
        if !self.state.set_element_locked(id, locked) {
            return Err(Error::not_found(format!("element {}", id)));
        }
        if let Some((part, object)) = self.linked_object(id) {
            let command = object.map(|object| SurfaceCommand::SetLocked { object, locked });
            self.commit_linked(&part, command)?;
        }
        self.finish();
        Ok(())
    }

    /// Set visibility of any layer
    pub fn set_layer_visible(&mut self, layer: &LayerId, visible: bool) -> Result<()> {
        match layer.element() {
            Some(id) => self.set_element_visible(id, visible),
            None if self.state.set_layer_visible(layer, visible) => Ok(()),
            None => Err(Error::not_found(format!("layer {}", layer))),
        }
    }

    /// Set the lock flag of any layer
    pub fn set_layer_locked(&mut self, layer: &LayerId, locked: bool) -> Result<()> {
        match layer.element() {
            Some(id) => self.set_element_locked(id, locked),
            None if self.state.set_layer_locked(layer, locked) => Ok(()),
            None => Err(Error::not_found(format!("layer {}", layer))),
        }
    }

    /// Reorder a layer among its type.
    ///
    /// Unknown layers and moves at a same-type extreme are no-ops. Every
    /// part owning a linked element whose zIndex changed takes one snapshot;
    /// the target's linked object moves in draw order the same way.
    pub fn reorder_layer(&mut self, layer: &LayerId, op: ReorderOp) -> Result<Option<ReorderPlan>> {
        let Some(plan) = layers::apply_reorder(&mut self.state, layer, op) else {
            return Ok(None);
        };
        self.emit(DesignEvent::Layers(LayerEvent::Reordered {
            layer: plan.layer.to_string(),
            from: plan.from,
            to: plan.to,
        }));

        let mut touched: Vec<(PartId, Option<SurfaceCommand>)> = Vec::new();
        for change in &plan.changes {
            let Some(element) = change.layer.element() else {
                continue;
            };
            let Some((part, object)) = self.linked_object(element) else {
                continue;
            };
            let command = (change.layer == plan.layer)
                .then_some(object)
                .flatten()
                .map(|object| SurfaceCommand::Reorder { object, op });
            match touched.iter().position(|(p, _)| *p == part) {
                Some(i) => {
                    if command.is_some() {
                        touched[i].1 = command;
                    }
                }
                None => touched.push((part, command)),
            }
        }
        for (part, command) in touched {
            self.commit_linked(&part, command)?;
        }

        self.finish();
        Ok(Some(plan))
    }

    /// Selected object on the active surface
    pub fn selected_object(&self) -> Option<&SurfaceObject> {
        let engine = self.active_engine()?;
        engine.selected().and_then(|id| engine.surface().get(id))
    }

    /// Resize and rotate handle positions of an object on the active surface
    pub fn handles(&self, object: ObjectId) -> Vec<(Handle, Point)> {
        let Some(target) = self.active_engine().and_then(|e| e.surface().get(object)) else {
            return Vec::new();
        };
        let offset = self.config.manipulation.rotate_handle_offset;
        Handle::RESIZE
            .iter()
            .chain(std::iter::once(&Handle::Rotate))
            .map(|h| (*h, h.position(&target.placement, offset)))
            .collect()
    }

    /// Topmost selectable object under `point` on the active surface
    pub fn object_at(&self, point: Point) -> Option<ObjectId> {
        manipulation::hit_test(self.active_engine()?.surface(), point)
    }

    /// Per-part colors and textures plus placed overlay elements for the renderer
    pub fn render_frame(&self) -> RenderFrame {
        let depth = DepthMapping::new(self.state.layer_settings());
        let parts = self
            .state
            .model()
            .parts
            .iter()
            .map(|part| {
                let layer = self.state.part_layer(part);
                let texture = self.textures.texture(part);
                PartFrame {
                    part: part.clone(),
                    color: self.state.color(part),
                    texture: texture.map(|t| t.image.clone()),
                    texture_generation: texture.map(|t| t.generation),
                    visible: layer.is_none_or(|l| l.visible),
                    color_visible: layer.is_none_or(|l| l.color_visible),
                    texture_visible: layer.is_none_or(|l| l.texture_visible),
                }
            })
            .collect();

        RenderFrame {
            model: self.state.model().name.clone(),
            parts,
            text_elements: self
                .state
                .text_elements()
                .iter()
                .map(|e| PlacedElement {
                    element: e.clone(),
                    depth_offset: depth.offset_for(e.z_index),
                })
                .collect(),
            logo_elements: self
                .state
                .logo_elements()
                .iter()
                .map(|e| PlacedElement {
                    element: e.clone(),
                    depth_offset: depth.offset_for(e.z_index),
                })
                .collect(),
            lighting: self.state.lighting().clone(),
            background_color: self.state.background_color(),
        }
    }

    /// Capture the live design as a design file
    pub fn save(&self, ctx: &SessionContext) -> DesignFile {
        let file = DesignFile::capture(&self.state, &self.arena, ctx);
        self.emit(DesignEvent::Design(DesignLifecycleEvent::Saved {
            model: file.model.clone(),
        }));
        file
    }

    /// Save to `store` as `name` for the context's user
    pub fn save_to_store(
        &self,
        store: &DesignStore,
        ctx: &SessionContext,
        name: &str,
    ) -> anyhow::Result<PathBuf> {
        ctx.require_user()?;
        store.save(ctx, name, &self.save(ctx))
    }

    /// Replace the live design with `file`.
    ///
    /// The file is staged in full first; on error the session is untouched.
    pub fn load(&mut self, file: &DesignFile) -> std::result::Result<(), DesignFileError> {
        let staged = file.stage(&self.catalog, &self.config)?;
        self.state = staged.state;
        self.arena.replace_with(staged.arena);
        self.textures.clear(&self.bus);
        let keep = file.image_refs();
        self.images.retain_only(&keep);
        let transition = self.modes.switch(DrawingMode::Select);
        self.emit_mode(transition);

        let parts: Vec<PartId> = self.arena.parts().cloned().collect();
        for part in &parts {
            self.textures.mark_dirty(part);
        }
        self.activate(&self.state.selected_part().clone());
        tracing::info!(
            "Loaded design for {} ({} surfaces, {} text, {} logo)",
            file.model,
            parts.len(),
            self.state.text_elements().len(),
            self.state.logo_elements().len()
        );
        self.emit(DesignEvent::Design(DesignLifecycleEvent::Loaded {
            model: file.model.clone(),
        }));
        self.finish();
        Ok(())
    }

    /// Load `name` from `store` for the context's user
    pub fn load_from_store(
        &mut self,
        store: &DesignStore,
        ctx: &SessionContext,
        name: &str,
    ) -> anyhow::Result<()> {
        let file = store.load(ctx, name)?;
        self.load(&file)?;
        Ok(())
    }
}
