//! Surface engine: one per part.
//!
//! The engine owns a part's object graph, its undo/redo history, the stroke
//! being drawn and the manipulation gesture in progress. Hosts drive it
//! through the closed [`SurfaceCommand`] set and read it through queries
//! ([`SurfaceEngine::objects`], [`SurfaceEngine::snapshot`]); nothing else
//! reaches into its state.
//!
//! Every committed command pushes exactly one history snapshot after the
//! mutation completes. Strokes and gestures in progress are never
//! snapshotted.

use garmentkit_core::{
    DeserializeError, ElementId, Error, ImageRef, ObjectId, PartId, Result,
};
use garmentkit_settings::EditorConfig;

use crate::elements::OverlayRecord;
use crate::font_manager;
use crate::geometry::{Handle, Placement, Point};
use crate::history::HistoryStack;
use crate::layers::ReorderOp;
use crate::manipulation::{self, GestureKind, ManipulationController};
use crate::object::{
    validate_text, ImageData, ObjectKind, StrokeData, StrokeStyle, SurfaceObject, TextRun,
    TextStyle,
};
use crate::surface::{SurfaceBlob, SurfaceSnapshot, SurfaceState};

/// Fraction of the canvas an image covers along its longer side when no placement is given.
const DEFAULT_IMAGE_FRACTION: f64 = 1.0 / 3.0;

/// The closed set of operations a surface accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    /// Start a freehand stroke
    BeginStroke { point: Point, style: StrokeStyle },
    /// Add a point to the stroke in progress
    ExtendStroke(Point),
    /// Commit the stroke in progress as one object
    EndStroke,
    /// Drop the stroke in progress without committing
    CancelStroke,
    /// Insert a text run centered at `at`
    InsertText {
        text: String,
        style: TextStyle,
        at: Point,
        overlay: Option<ElementId>,
    },
    /// Insert an already-decoded image
    InsertImage {
        image: ImageRef,
        natural_width: u32,
        natural_height: u32,
        placement: Option<Placement>,
        overlay: Option<ElementId>,
    },
    /// Replace or remove the locked base layer
    SetBaseLayer(Option<ImageRef>),
    /// Change the text or style of a glyph run, keeping its center
    EditText {
        object: ObjectId,
        text: Option<String>,
        style: Option<TextStyle>,
    },
    /// Show or hide an object
    SetVisible { object: ObjectId, visible: bool },
    /// Lock or unlock movement, scaling and rotation of an object
    SetLocked { object: ObjectId, locked: bool },
    /// Remove every object except the base layer
    Clear,
    /// Remove one user object
    RemoveObject(ObjectId),
    /// Change one object's draw index
    Reorder { object: ObjectId, op: ReorderOp },
    /// Select an object, or clear the selection
    Select(Option<ObjectId>),
    /// Pointer press in manipulation mode
    BeginGesture(Point),
    /// Pointer move in manipulation mode (live only)
    UpdateGesture(Point),
    /// Translate an object (live only)
    Drag { object: ObjectId, delta: Point },
    /// Resize from a handle (live only)
    Resize {
        object: ObjectId,
        handle: Handle,
        point: Point,
    },
    /// Set rotation from the pointer angle around the object center (live only)
    Rotate { object: ObjectId, pointer: Point },
    /// Pointer release: commit live manipulation as one snapshot
    Release,
}

/// What a command did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    /// A history snapshot was pushed
    pub committed: bool,
    /// Object created or grabbed by the command
    pub object: Option<ObjectId>,
    /// Objects removed by the command
    pub removed: Vec<SurfaceObject>,
}

impl CommandOutcome {
    fn none() -> Self {
        Self::default()
    }

    fn live(object: Option<ObjectId>) -> Self {
        Self {
            object,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct PendingStroke {
    style: StrokeStyle,
    points: Vec<Point>,
}

/// Editable surface, history and interaction state of one part.
#[derive(Debug, Clone)]
pub struct SurfaceEngine {
    part: PartId,
    surface: SurfaceState,
    history: HistoryStack,
    pending: Option<PendingStroke>,
    manipulation: ManipulationController,
    selected: Option<ObjectId>,
    overlays: Vec<OverlayRecord>,
    live_edit: bool,
}

impl SurfaceEngine {
    /// Fresh empty surface whose history starts at the empty state
    pub fn new(part: PartId, config: &EditorConfig) -> Self {
        let surface = SurfaceState::new(config.canvas.width, config.canvas.height);
        let history = HistoryStack::new(surface.serialize(), config.history.max_entries);
        Self::assemble(part, surface, history, config)
    }

    /// Engine around a restored surface and history (design file load)
    pub fn restore(
        part: PartId,
        surface: SurfaceState,
        history: HistoryStack,
        config: &EditorConfig,
    ) -> Self {
        Self::assemble(part, surface, history, config)
    }

    fn assemble(
        part: PartId,
        surface: SurfaceState,
        history: HistoryStack,
        config: &EditorConfig,
    ) -> Self {
        Self {
            part,
            surface,
            history,
            pending: None,
            manipulation: ManipulationController::new(config.manipulation.clone()),
            selected: None,
            overlays: Vec::new(),
            live_edit: false,
        }
    }

    pub fn part(&self) -> &PartId {
        &self.part
    }

    pub fn surface(&self) -> &SurfaceState {
        &self.surface
    }

    /// Objects in draw order
    pub fn objects(&self) -> &[SurfaceObject] {
        self.surface.objects()
    }

    /// Serialized current object graph
    pub fn snapshot(&self) -> SurfaceBlob {
        self.surface.serialize()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    /// Points of the stroke being drawn, for live preview
    pub fn pending_stroke(&self) -> Option<(&StrokeStyle, &[Point])> {
        self.pending
            .as_ref()
            .map(|p| (&p.style, p.points.as_slice()))
    }

    /// Handles of the selected object
    pub fn selection_handles(&self) -> Vec<(Handle, Point)> {
        self.selected
            .and_then(|id| self.surface.get(id))
            .map(|o| self.manipulation.handles(&o.placement))
            .unwrap_or_default()
    }

    /// A stroke or a manipulation is in progress
    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || self.manipulation.is_active() || self.live_edit
    }

    /// Overlay records to embed in the next snapshot
    pub fn stage_overlays(&mut self, overlays: Vec<OverlayRecord>) {
        self.overlays = overlays;
    }

    pub fn staged_overlays(&self) -> &[OverlayRecord] {
        &self.overlays
    }

    /// Push a snapshot of the current state without mutating the surface
    pub fn checkpoint(&mut self) {
        self.commit();
    }

    fn commit(&mut self) {
        let snapshot = SurfaceSnapshot {
            surface: self.surface.clone(),
            overlays: self.overlays.clone(),
        };
        self.history.push(snapshot.to_blob());
        self.live_edit = false;
        tracing::debug!(
            "Committed surface {} ({} objects, history {}/{})",
            self.part,
            self.surface.len(),
            self.history.cursor() + 1,
            self.history.len()
        );
    }

    /// Abort any stroke or gesture in progress; nothing is pushed
    pub fn abort_interaction(&mut self) {
        self.pending = None;
        self.manipulation.cancel(&mut self.surface);
        if self.live_edit {
            // Live edits outside a gesture are rolled back to the last snapshot.
            if let Ok(snapshot) = SurfaceSnapshot::from_blob(self.history.current()) {
                self.surface = snapshot.surface;
            }
            self.live_edit = false;
        }
    }

    /// Execute one command
    pub fn apply_command(&mut self, command: SurfaceCommand) -> Result<CommandOutcome> {
        match command {
            SurfaceCommand::BeginStroke { point, style } => {
                self.manipulation.cancel(&mut self.surface);
                self.pending = Some(PendingStroke {
                    style,
                    points: vec![point],
                });
                Ok(CommandOutcome::none())
            }
            SurfaceCommand::ExtendStroke(point) => {
                if let Some(pending) = &mut self.pending {
                    if pending.points.last() != Some(&point) {
                        pending.points.push(point);
                    }
                }
                Ok(CommandOutcome::none())
            }
            SurfaceCommand::EndStroke => Ok(self.end_stroke()),
            SurfaceCommand::CancelStroke => {
                self.pending = None;
                Ok(CommandOutcome::none())
            }
            SurfaceCommand::InsertText {
                text,
                style,
                at,
                overlay,
            } => self.insert_text(text, style, at, overlay),
            SurfaceCommand::InsertImage {
                image,
                natural_width,
                natural_height,
                placement,
                overlay,
            } => self.insert_image(image, natural_width, natural_height, placement, overlay),
            SurfaceCommand::SetBaseLayer(image) => Ok(self.set_base_layer(image)),
            SurfaceCommand::EditText {
                object,
                text,
                style,
            } => self.edit_text(object, text, style),
            SurfaceCommand::SetVisible { object, visible } => {
                let target = self.require_mut(object)?;
                let changed = target.visible != visible;
                target.visible = visible;
                if !visible && self.selected == Some(object) {
                    self.selected = None;
                }
                Ok(self.commit_if(changed, object))
            }
            SurfaceCommand::SetLocked { object, locked } => {
                let target = self.require_mut(object)?;
                let locks = &mut target.locks;
                let changed = locks.lock_movement != locked
                    || locks.lock_scaling != locked
                    || locks.lock_rotation != locked;
                locks.lock_movement = locked;
                locks.lock_scaling = locked;
                locks.lock_rotation = locked;
                Ok(self.commit_if(changed, object))
            }
            SurfaceCommand::Clear => Ok(self.clear()),
            SurfaceCommand::RemoveObject(id) => Ok(self.remove_object(id)),
            SurfaceCommand::Reorder { object, op } => {
                if self.surface.reorder(object, op) {
                    self.commit();
                    Ok(CommandOutcome {
                        committed: true,
                        object: Some(object),
                        removed: Vec::new(),
                    })
                } else {
                    Ok(CommandOutcome::none())
                }
            }
            SurfaceCommand::Select(id) => self.select(id),
            SurfaceCommand::BeginGesture(point) => {
                self.pending = None;
                let grabbed = self
                    .manipulation
                    .begin(&self.surface, self.selected, point);
                self.selected = grabbed.map(|(id, _)| id);
                Ok(CommandOutcome::live(self.selected))
            }
            SurfaceCommand::UpdateGesture(point) => {
                let object = self.manipulation.gesture().map(|g| g.object);
                self.manipulation.update(&mut self.surface, point);
                Ok(CommandOutcome::live(object))
            }
            SurfaceCommand::Drag { object, delta } => {
                let changed = self
                    .selectable_mut(object)?
                    .map(|o| manipulation::drag(o, delta))
                    .unwrap_or(false);
                self.live_edit |= changed;
                Ok(CommandOutcome::live(Some(object)))
            }
            SurfaceCommand::Resize {
                object,
                handle,
                point,
            } => {
                let min_size = self.manipulation.settings().min_size;
                let changed = self
                    .selectable_mut(object)?
                    .map(|o| manipulation::resize(o, handle, point, min_size))
                    .unwrap_or(false);
                self.live_edit |= changed;
                Ok(CommandOutcome::live(Some(object)))
            }
            SurfaceCommand::Rotate { object, pointer } => {
                let changed = self
                    .selectable_mut(object)?
                    .map(|o| {
                        let angle = manipulation::pointer_angle(o.placement.center(), pointer);
                        manipulation::rotate(o, angle)
                    })
                    .unwrap_or(false);
                self.live_edit |= changed;
                Ok(CommandOutcome::live(Some(object)))
            }
            SurfaceCommand::Release => Ok(self.release()),
        }
    }

    fn selectable_mut(&mut self, id: ObjectId) -> Result<Option<&mut SurfaceObject>> {
        match self.surface.get_mut(id) {
            Some(object) if object.is_selectable() => Ok(Some(object)),
            Some(_) => Ok(None),
            None => Err(Error::not_found(format!("object {}", id))),
        }
    }

    fn require_mut(&mut self, id: ObjectId) -> Result<&mut SurfaceObject> {
        if self.surface.get(id).is_some_and(SurfaceObject::is_base_layer) {
            return Err(Error::InvalidOperation("the base layer is locked".to_string()));
        }
        self.surface
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("object {}", id)))
    }

    fn commit_if(&mut self, changed: bool, object: ObjectId) -> CommandOutcome {
        if changed {
            self.commit();
        }
        CommandOutcome {
            committed: changed,
            object: Some(object),
            removed: Vec::new(),
        }
    }

    fn edit_text(
        &mut self,
        object: ObjectId,
        text: Option<String>,
        style: Option<TextStyle>,
    ) -> Result<CommandOutcome> {
        if let Some(text) = text.as_deref() {
            validate_text(text)?;
        }
        if let Some(style) = &style {
            style.validate()?;
        }
        let target = self.require_mut(object)?;
        let ObjectKind::Text(run) = &mut target.kind else {
            return Err(Error::InvalidOperation(format!(
                "object {} is not a text run",
                object
            )));
        };
        let before = run.clone();
        if let Some(text) = text {
            run.text = text;
        }
        if let Some(style) = style {
            run.style = style;
        }
        let changed = *run != before;
        if changed {
            let (width, height) = font_manager::measure_text(&run.text, &run.style);
            let center = target.placement.center();
            target.placement.width = width;
            target.placement.height = height;
            target.placement.set_center(center);
        }
        Ok(self.commit_if(changed, object))
    }

    fn end_stroke(&mut self) -> CommandOutcome {
        let Some(pending) = self.pending.take() else {
            return CommandOutcome::none();
        };
        let Some((data, placement)) = StrokeData::from_points(pending.style, &pending.points)
        else {
            return CommandOutcome::none();
        };
        let id = self
            .surface
            .push(SurfaceObject::new(ObjectKind::Stroke(data), placement));
        self.commit();
        CommandOutcome {
            committed: true,
            object: Some(id),
            removed: Vec::new(),
        }
    }

    fn insert_text(
        &mut self,
        text: String,
        style: TextStyle,
        at: Point,
        overlay: Option<ElementId>,
    ) -> Result<CommandOutcome> {
        validate_text(&text)?;
        style.validate()?;
        let (width, height) = font_manager::measure_text(&text, &style);
        let object = SurfaceObject::new(
            ObjectKind::Text(TextRun {
                text,
                style,
                overlay,
            }),
            Placement::centered(at, width, height),
        );
        let id = self.surface.push(object);
        self.selected = Some(id);
        self.commit();
        Ok(CommandOutcome {
            committed: true,
            object: Some(id),
            removed: Vec::new(),
        })
    }

    fn insert_image(
        &mut self,
        image: ImageRef,
        natural_width: u32,
        natural_height: u32,
        placement: Option<Placement>,
        overlay: Option<ElementId>,
    ) -> Result<CommandOutcome> {
        if natural_width == 0 || natural_height == 0 {
            return Err(garmentkit_core::AssetLoadError::Empty {
                image: image.to_string(),
            }
            .into());
        }
        let placement =
            placement.unwrap_or_else(|| self.default_image_placement(natural_width, natural_height));
        let object = SurfaceObject::new(
            ObjectKind::Image(ImageData {
                image,
                natural_width,
                natural_height,
                overlay,
            }),
            placement,
        );
        let id = self.surface.push(object);
        self.selected = Some(id);
        self.commit();
        Ok(CommandOutcome {
            committed: true,
            object: Some(id),
            removed: Vec::new(),
        })
    }

    fn default_image_placement(&self, natural_width: u32, natural_height: u32) -> Placement {
        let canvas_w = f64::from(self.surface.width());
        let canvas_h = f64::from(self.surface.height());
        let target = canvas_w.min(canvas_h) * DEFAULT_IMAGE_FRACTION;
        let (w, h) = (f64::from(natural_width), f64::from(natural_height));
        let scale = target / w.max(h);
        Placement::centered(
            Point::new(canvas_w / 2.0, canvas_h / 2.0),
            w * scale,
            h * scale,
        )
    }

    fn set_base_layer(&mut self, image: Option<ImageRef>) -> CommandOutcome {
        let base = image.map(|image| {
            SurfaceObject::base_layer(image, self.surface.width(), self.surface.height())
        });
        let id = base.as_ref().map(|b| b.id);
        self.surface.set_base_layer(base);
        self.commit();
        CommandOutcome {
            committed: true,
            object: id,
            removed: Vec::new(),
        }
    }

    fn clear(&mut self) -> CommandOutcome {
        self.abort_interaction();
        let removed: Vec<SurfaceObject> = self
            .surface
            .objects()
            .iter()
            .filter(|o| !o.is_base_layer())
            .cloned()
            .collect();
        self.surface.clear();
        self.selected = None;
        self.commit();
        CommandOutcome {
            committed: true,
            object: None,
            removed,
        }
    }

    fn remove_object(&mut self, id: ObjectId) -> CommandOutcome {
        if self.manipulation.gesture().is_some_and(|g| g.object == id) {
            self.manipulation.cancel(&mut self.surface);
        }
        let Some(removed) = self.surface.remove(id) else {
            return CommandOutcome::none();
        };
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.commit();
        CommandOutcome {
            committed: true,
            object: None,
            removed: vec![removed],
        }
    }

    fn select(&mut self, id: Option<ObjectId>) -> Result<CommandOutcome> {
        match id {
            None => self.selected = None,
            Some(id) => match self.surface.get(id) {
                Some(object) if object.is_selectable() => self.selected = Some(id),
                Some(_) => {
                    return Err(Error::InvalidOperation(format!(
                        "object {} is not selectable",
                        id
                    )))
                }
                None => return Err(Error::not_found(format!("object {}", id))),
            },
        }
        Ok(CommandOutcome::live(self.selected))
    }

    fn release(&mut self) -> CommandOutcome {
        let gesture = self.manipulation.end(&self.surface);
        let changed = gesture.as_ref().is_some_and(|g| g.changed) || self.live_edit;
        let object = gesture.map(|g| g.object);
        if changed {
            self.commit();
        }
        CommandOutcome {
            committed: changed,
            object,
            removed: Vec::new(),
        }
    }

    /// Kind of the gesture in progress, if any
    pub fn gesture_kind(&self) -> Option<GestureKind> {
        self.manipulation.gesture().map(|g| g.kind)
    }

    /// Step back one snapshot.
    ///
    /// # Returns
    ///
    /// - `None` at the oldest entry (no-op)
    /// - `Some(Ok(overlays))` with the overlay records of the restored entry
    /// - `Some(Err(_))` if the entry is corrupt; the cursor does not move
    pub fn undo(&mut self) -> Option<std::result::Result<Vec<OverlayRecord>, DeserializeError>> {
        self.abort_interaction();
        let outcome = self.history.undo_with(SurfaceSnapshot::from_blob)?;
        Some(outcome.map(|snapshot| self.install(snapshot)))
    }

    /// Step forward one snapshot; same contract as [`SurfaceEngine::undo`]
    pub fn redo(&mut self) -> Option<std::result::Result<Vec<OverlayRecord>, DeserializeError>> {
        self.abort_interaction();
        let outcome = self.history.redo_with(SurfaceSnapshot::from_blob)?;
        Some(outcome.map(|snapshot| self.install(snapshot)))
    }

    fn install(&mut self, snapshot: SurfaceSnapshot) -> Vec<OverlayRecord> {
        self.surface = snapshot.surface;
        if self
            .selected
            .is_some_and(|id| self.surface.get(id).is_none())
        {
            self.selected = None;
        }
        self.overlays = snapshot.overlays.clone();
        snapshot.overlays
    }
}
