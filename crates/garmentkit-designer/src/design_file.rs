//! Persisted design file.
//!
//! The JSON document written by "save" and read by "load". Loading is
//! staged: the whole document is turned into a fresh [`DesignState`] and
//! [`SurfaceArena`] first, and the caller swaps them in only when staging
//! succeeded, so a bad file never touches the live design.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use garmentkit_core::{
    Color, DesignFileError, ElementId, ImageRef, ModelCatalog, PartId, SessionContext,
};
use garmentkit_settings::EditorConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::arena::SurfaceArena;
use crate::design_state::{DesignState, Lighting};
use crate::elements::{LogoElement, TextElement};
use crate::engine::SurfaceEngine;
use crate::history::HistoryStack;
use crate::object::{ObjectKind, TextStyle};
use crate::surface::{SurfaceBlob, SurfaceSnapshot, SurfaceState};

/// Current design file version, written to `meta.version`.
pub const DESIGN_FILE_VERSION: u32 = 1;

/// A saved design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignFile {
    pub model: String,
    #[serde(default)]
    pub colors: BTreeMap<PartId, Color>,
    #[serde(default)]
    pub materials: BTreeMap<PartId, Option<ImageRef>>,
    #[serde(default)]
    pub text_elements: Vec<TextElementRecord>,
    #[serde(default)]
    pub logo_elements: Vec<LogoElementRecord>,
    #[serde(default)]
    pub lighting: Lighting,
    #[serde(default)]
    pub background_color: Color,
    #[serde(default)]
    pub canvas_data: BTreeMap<PartId, SurfaceBlob>,
    #[serde(default)]
    pub canvas_history: CanvasHistory,
    #[serde(default)]
    pub layers: LayersRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DesignMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElementRecord {
    pub text: String,
    #[serde(flatten)]
    pub style: TextStyle,
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    pub z_index: i64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<PartId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoElementRecord {
    pub image: ImageRef,
    #[serde(default = "default_one")]
    pub size: f64,
    #[serde(default = "default_one")]
    pub opacity: f64,
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    pub z_index: i64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<PartId>,
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

/// Per-part undo/redo stacks and cursors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasHistory {
    #[serde(default)]
    pub canvas_history: BTreeMap<PartId, Vec<SurfaceBlob>>,
    #[serde(default)]
    pub history_index: BTreeMap<PartId, usize>,
}

/// Saved layer flags, matched to elements by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayersRecord {
    #[serde(default)]
    pub text_layers: Vec<ElementLayerRecord>,
    #[serde(default)]
    pub logo_layers: Vec<ElementLayerRecord>,
    #[serde(default)]
    pub parts: Vec<PartLayerRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementLayerRecord {
    pub id: ElementId,
    pub z_index: i64,
    pub visible: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartLayerRecord {
    pub id: PartId,
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_z_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_z_index: Option<i64>,
}

/// Who saved the design and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignMeta {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// A loaded design, ready to be swapped in.
#[derive(Debug, Clone)]
pub struct StagedDesign {
    pub state: DesignState,
    pub arena: SurfaceArena,
}

impl DesignFile {
    /// Capture the live design
    pub fn capture(state: &DesignState, arena: &SurfaceArena, ctx: &SessionContext) -> Self {
        let text_elements = state
            .text_elements()
            .iter()
            .map(|e| TextElementRecord {
                text: e.text.clone(),
                style: e.style.clone(),
                position: e.position,
                rotation: e.rotation,
                z_index: e.z_index,
                visible: e.visible,
                locked: e.locked,
                part: e.part.clone(),
            })
            .collect();
        let logo_elements = state
            .logo_elements()
            .iter()
            .map(|e| LogoElementRecord {
                image: e.image.clone(),
                size: e.size,
                opacity: e.opacity,
                position: e.position,
                rotation: e.rotation,
                z_index: e.z_index,
                visible: e.visible,
                locked: e.locked,
                part: e.part.clone(),
            })
            .collect();

        let mut canvas_data = BTreeMap::new();
        let mut canvas_history = CanvasHistory::default();
        for engine in arena.engines() {
            let part = engine.part().clone();
            canvas_data.insert(part.clone(), engine.snapshot());
            canvas_history
                .canvas_history
                .insert(part.clone(), engine.history().entries().to_vec());
            canvas_history
                .history_index
                .insert(part, engine.history().cursor());
        }

        let layers = LayersRecord {
            text_layers: state
                .text_elements()
                .iter()
                .map(|e| ElementLayerRecord {
                    id: e.id,
                    z_index: e.z_index,
                    visible: e.visible,
                    locked: e.locked,
                })
                .collect(),
            logo_layers: state
                .logo_elements()
                .iter()
                .map(|e| ElementLayerRecord {
                    id: e.id,
                    z_index: e.z_index,
                    visible: e.visible,
                    locked: e.locked,
                })
                .collect(),
            parts: state
                .model()
                .parts
                .iter()
                .filter_map(|p| {
                    state.part_layer(p).map(|l| PartLayerRecord {
                        id: p.clone(),
                        visible: l.visible,
                        color_z_index: Some(l.color_z),
                        texture_z_index: Some(l.texture_z),
                    })
                })
                .collect(),
        };

        Self {
            model: state.model().name.clone(),
            colors: state.colors().clone(),
            materials: state.fill_textures().clone(),
            text_elements,
            logo_elements,
            lighting: state.lighting().clone(),
            background_color: state.background_color(),
            canvas_data,
            canvas_history,
            layers,
            meta: Some(DesignMeta {
                version: DESIGN_FILE_VERSION,
                author: ctx.author().map(str::to_string),
                saved_at: Utc::now(),
            }),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DesignFileError> {
        serde_json::from_str(json).map_err(|e| DesignFileError::Malformed(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, DesignFileError> {
        serde_json::to_string_pretty(self).map_err(|e| DesignFileError::Malformed(e.to_string()))
    }

    /// Save design to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json_pretty().context("Failed to serialize design")?;

        std::fs::write(path.as_ref(), json).context("Failed to write design file")?;

        Ok(())
    }

    /// Load design from file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read design file")?;

        let design = Self::from_json(&content).context("Failed to parse design file")?;

        Ok(design)
    }

    /// Every image the design refers to: materials, logos and surface images
    pub fn image_refs(&self) -> BTreeSet<ImageRef> {
        let mut refs: BTreeSet<ImageRef> = self.materials.values().flatten().cloned().collect();
        refs.extend(self.logo_elements.iter().map(|l| l.image.clone()));
        for blob in self.canvas_data.values() {
            if let Ok(surface) = SurfaceState::deserialize(blob) {
                for object in surface.objects() {
                    match &object.kind {
                        ObjectKind::Image(data) => {
                            refs.insert(data.image.clone());
                        }
                        ObjectKind::BaseLayer { image } => {
                            refs.insert(image.clone());
                        }
                        _ => {}
                    }
                }
            }
        }
        refs
    }

    /// Build the design state and surfaces this file describes without touching any live state
    pub fn stage(
        &self,
        catalog: &ModelCatalog,
        config: &EditorConfig,
    ) -> Result<StagedDesign, DesignFileError> {
        let model = catalog.get(&self.model)?.clone();
        let mut state = DesignState::new(model, config.layers.clone())?;

        for (part, color) in &self.colors {
            state.set_color(part, *color)?;
        }
        for (part, image) in &self.materials {
            state.set_fill_texture(part, image.clone())?;
        }
        state.set_lighting(self.lighting.clone());
        state.set_background_color(self.background_color);

        for (index, record) in self.text_elements.iter().enumerate() {
            let saved = self.layers.text_layers.get(index);
            let mut element = TextElement::new(
                record.text.clone(),
                record.style.clone(),
                record.position,
                record.z_index,
            );
            element.rotation = record.rotation;
            element.visible = record.visible;
            element.locked = record.locked;
            element.part = record.part.clone();
            if let Some(saved) = saved {
                element.id = saved.id;
                element.z_index = saved.z_index;
                element.visible = saved.visible;
                element.locked = saved.locked;
            }
            state.text_elements_mut().push(element);
        }
        for (index, record) in self.logo_elements.iter().enumerate() {
            let saved = self.layers.logo_layers.get(index);
            let mut element =
                LogoElement::new(record.image.clone(), record.position, record.z_index);
            element.size = record.size;
            element.opacity = record.opacity;
            element.rotation = record.rotation;
            element.visible = record.visible;
            element.locked = record.locked;
            element.part = record.part.clone();
            if let Some(saved) = saved {
                element.id = saved.id;
                element.z_index = saved.z_index;
                element.visible = saved.visible;
                element.locked = saved.locked;
            }
            state.logo_elements_mut().push(element);
        }

        for record in &self.layers.parts {
            state.set_part_visible(&record.id, record.visible)?;
            if let Some(layer) = state.part_layer_mut(&record.id) {
                if let Some(z) = record.color_z_index {
                    layer.color_z = z;
                }
                if let Some(z) = record.texture_z_index {
                    layer.texture_z = z;
                }
            }
        }

        let mut arena = SurfaceArena::new(config.clone());
        let parts: BTreeSet<&PartId> = self
            .canvas_data
            .keys()
            .chain(self.canvas_history.canvas_history.keys())
            .collect();
        for part in parts {
            state.model().require_part(part)?;
            let engine = self.stage_surface(part, config)?;
            arena.insert(engine);
        }

        Ok(StagedDesign { state, arena })
    }

    fn stage_surface(
        &self,
        part: &PartId,
        config: &EditorConfig,
    ) -> Result<SurfaceEngine, DesignFileError> {
        let corrupt = |source| DesignFileError::Surface {
            part: part.to_string(),
            source,
        };

        let history = match self.canvas_history.canvas_history.get(part) {
            Some(entries) => {
                for entry in entries {
                    SurfaceSnapshot::from_blob(entry).map_err(corrupt)?;
                }
                let cursor = self
                    .canvas_history
                    .history_index
                    .get(part)
                    .copied()
                    .unwrap_or_else(|| entries.len().saturating_sub(1));
                Some(HistoryStack::restore(
                    part.as_str(),
                    entries.clone(),
                    cursor,
                    config.history.max_entries,
                )?)
            }
            None => None,
        };

        let surface = match (self.canvas_data.get(part), &history) {
            (Some(blob), _) => SurfaceState::deserialize(blob).map_err(corrupt)?,
            (None, Some(history)) => SurfaceState::deserialize(history.current()).map_err(corrupt)?,
            (None, None) => SurfaceState::new(config.canvas.width, config.canvas.height),
        };
        let history = history
            .unwrap_or_else(|| HistoryStack::new(surface.serialize(), config.history.max_entries));

        Ok(SurfaceEngine::restore(part.clone(), surface, history, config))
    }
}
