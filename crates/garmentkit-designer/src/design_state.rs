//! Design state store.
//!
//! One [`DesignState`] exists per editing session. It is built fresh on
//! model selection and replaced wholesale on model switch or design load.

use garmentkit_core::{Color, ElementId, GarmentModel, ImageRef, ModelError, PartId};
use garmentkit_settings::LayerSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::elements::{LogoElement, OverlayElement, OverlayRecord, TextElement, TextUpdate};
use crate::layers::{LayerId, LayerKind};
use crate::object::TextStyle;

/// Scene lighting, passed through to the renderer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lighting {
    pub intensity: f64,
    pub direction: [f64; 3],
    pub environment: String,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            direction: [5.0, 5.0, 5.0],
            environment: "city".to_string(),
        }
    }
}

/// Layer bookkeeping for a part's color and texture layers.
#[derive(Debug, Clone, PartialEq)]
pub struct PartLayerState {
    pub color_z: i64,
    pub texture_z: i64,
    pub color_visible: bool,
    pub texture_visible: bool,
    pub color_locked: bool,
    pub texture_locked: bool,
    /// Whether the part is shown at all
    pub visible: bool,
}

impl PartLayerState {
    fn new(index: usize, settings: &LayerSettings) -> Self {
        let offset = index as i64;
        Self {
            color_z: settings.color_base + offset,
            texture_z: settings.texture_base + offset,
            color_visible: true,
            texture_visible: true,
            color_locked: false,
            texture_locked: false,
            visible: true,
        }
    }
}

/// Root design data for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignState {
    model: GarmentModel,
    selected_part: PartId,
    colors: BTreeMap<PartId, Color>,
    fill_textures: BTreeMap<PartId, Option<ImageRef>>,
    text_elements: Vec<TextElement>,
    logo_elements: Vec<LogoElement>,
    lighting: Lighting,
    background_color: Color,
    part_layers: BTreeMap<PartId, PartLayerState>,
    layer_settings: LayerSettings,
}

impl DesignState {
    /// Default state for `model`: every part white, no textures, no elements
    pub fn new(model: GarmentModel, layer_settings: LayerSettings) -> Result<Self, ModelError> {
        let selected_part = model
            .default_part()
            .cloned()
            .ok_or_else(|| ModelError::UnknownPart {
                model: model.name.clone(),
                part: String::new(),
            })?;
        let colors = model.parts.iter().map(|p| (p.clone(), Color::WHITE)).collect();
        let fill_textures = model.parts.iter().map(|p| (p.clone(), None)).collect();
        let part_layers = model
            .parts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), PartLayerState::new(i, &layer_settings)))
            .collect();
        Ok(Self {
            model,
            selected_part,
            colors,
            fill_textures,
            text_elements: Vec::new(),
            logo_elements: Vec::new(),
            lighting: Lighting::default(),
            background_color: Color::WHITE,
            part_layers,
            layer_settings,
        })
    }

    pub fn model(&self) -> &GarmentModel {
        &self.model
    }

    pub fn selected_part(&self) -> &PartId {
        &self.selected_part
    }

    pub fn select_part(&mut self, part: &PartId) -> Result<(), ModelError> {
        self.model.require_part(part)?;
        self.selected_part = part.clone();
        Ok(())
    }

    pub fn layer_settings(&self) -> &LayerSettings {
        &self.layer_settings
    }

    pub fn colors(&self) -> &BTreeMap<PartId, Color> {
        &self.colors
    }

    pub fn color(&self, part: &PartId) -> Color {
        self.colors.get(part).copied().unwrap_or(Color::WHITE)
    }

    pub fn set_color(&mut self, part: &PartId, color: Color) -> Result<(), ModelError> {
        self.model.require_part(part)?;
        self.colors.insert(part.clone(), color);
        Ok(())
    }

    pub fn fill_textures(&self) -> &BTreeMap<PartId, Option<ImageRef>> {
        &self.fill_textures
    }

    pub fn fill_texture(&self, part: &PartId) -> Option<&ImageRef> {
        self.fill_textures.get(part).and_then(Option::as_ref)
    }

    pub fn set_fill_texture(
        &mut self,
        part: &PartId,
        image: Option<ImageRef>,
    ) -> Result<(), ModelError> {
        self.model.require_part(part)?;
        self.fill_textures.insert(part.clone(), image);
        Ok(())
    }

    pub fn text_elements(&self) -> &[TextElement] {
        &self.text_elements
    }

    pub fn logo_elements(&self) -> &[LogoElement] {
        &self.logo_elements
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn set_lighting(&mut self, lighting: Lighting) {
        self.lighting = lighting;
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
    }

    pub fn part_layer(&self, part: &PartId) -> Option<&PartLayerState> {
        self.part_layers.get(part)
    }

    pub fn part_visible(&self, part: &PartId) -> bool {
        self.part_layers.get(part).is_none_or(|l| l.visible)
    }

    pub fn set_part_visible(&mut self, part: &PartId, visible: bool) -> Result<(), ModelError> {
        self.model.require_part(part)?;
        if let Some(layer) = self.part_layers.get_mut(part) {
            layer.visible = visible;
        }
        Ok(())
    }

    /// zIndex for a new layer of `kind`: one above the type's maximum, or the type's base
    pub fn next_z_index(&self, kind: LayerKind) -> i64 {
        let max = match kind {
            LayerKind::Text => self.text_elements.iter().map(|e| e.z_index).max(),
            LayerKind::Logo => self.logo_elements.iter().map(|e| e.z_index).max(),
            LayerKind::Texture => self.part_layers.values().map(|l| l.texture_z).max(),
            LayerKind::Color => self.part_layers.values().map(|l| l.color_z).max(),
        };
        max.map_or_else(|| kind.base_z_index(&self.layer_settings), |z| z + 1)
    }

    /// Add a text element with the next text zIndex
    pub fn add_text(&mut self, text: impl Into<String>, style: TextStyle, position: [f64; 3]) -> ElementId {
        let element = TextElement::new(text, style, position, self.next_z_index(LayerKind::Text));
        self.push_text(element)
    }

    /// Add a prepared text element, assigning it the next text zIndex
    pub fn push_text(&mut self, mut element: TextElement) -> ElementId {
        element.z_index = self.next_z_index(LayerKind::Text);
        let id = element.id;
        self.text_elements.push(element);
        id
    }

    /// Add a logo element with the next logo zIndex
    pub fn add_logo(&mut self, image: ImageRef, position: [f64; 3]) -> ElementId {
        let element = LogoElement::new(image, position, self.next_z_index(LayerKind::Logo));
        self.push_logo(element)
    }

    pub fn push_logo(&mut self, mut element: LogoElement) -> ElementId {
        element.z_index = self.next_z_index(LayerKind::Logo);
        let id = element.id;
        self.logo_elements.push(element);
        id
    }

    pub fn text(&self, id: ElementId) -> Option<&TextElement> {
        self.text_elements.iter().find(|e| e.id == id)
    }

    pub fn logo(&self, id: ElementId) -> Option<&LogoElement> {
        self.logo_elements.iter().find(|e| e.id == id)
    }

    /// Either kind of element by id
    pub fn element(&self, id: ElementId) -> Option<OverlayElement> {
        self.text(id)
            .cloned()
            .map(OverlayElement::Text)
            .or_else(|| self.logo(id).cloned().map(OverlayElement::Logo))
    }

    /// Edit a text element; `None` if it does not exist, else whether it changed
    pub fn update_text(&mut self, id: ElementId, update: &TextUpdate) -> Option<bool> {
        let element = self.text_elements.iter_mut().find(|e| e.id == id)?;
        Some(update.apply(element))
    }

    pub fn set_logo_size(&mut self, id: ElementId, size: f64) -> Option<bool> {
        let element = self.logo_elements.iter_mut().find(|e| e.id == id)?;
        let changed = element.size != size;
        element.size = size;
        Some(changed)
    }

    pub fn remove_element(&mut self, id: ElementId) -> Option<OverlayElement> {
        if let Some(index) = self.text_elements.iter().position(|e| e.id == id) {
            return Some(OverlayElement::Text(self.text_elements.remove(index)));
        }
        let index = self.logo_elements.iter().position(|e| e.id == id)?;
        Some(OverlayElement::Logo(self.logo_elements.remove(index)))
    }

    /// Copy an element with a new identity, offset position and zIndex source + 1.
    ///
    /// The copy is not linked to any surface object. Its zIndex may tie with
    /// another element until the next reorder of that type.
    pub fn duplicate_element(&mut self, id: ElementId) -> Option<ElementId> {
        let offset = self.layer_settings.duplicate_offset;
        let shifted = |p: [f64; 3]| [p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]];
        let copy_id = ElementId::new();

        if let Some(source) = self.text(id).cloned() {
            self.text_elements.push(TextElement {
                id: copy_id,
                position: shifted(source.position),
                z_index: source.z_index + 1,
                part: None,
                ..source
            });
            return Some(copy_id);
        }
        let source = self.logo(id).cloned()?;
        self.logo_elements.push(LogoElement {
            id: copy_id,
            position: shifted(source.position),
            z_index: source.z_index + 1,
            part: None,
            ..source
        });
        Some(copy_id)
    }

    pub fn set_element_visible(&mut self, id: ElementId, visible: bool) -> bool {
        self.with_flags(id, |v, _| *v = visible)
    }

    pub fn set_element_locked(&mut self, id: ElementId, locked: bool) -> bool {
        self.with_flags(id, |_, l| *l = locked)
    }

    fn with_flags(&mut self, id: ElementId, f: impl FnOnce(&mut bool, &mut bool)) -> bool {
        if let Some(e) = self.text_elements.iter_mut().find(|e| e.id == id) {
            f(&mut e.visible, &mut e.locked);
            return true;
        }
        if let Some(e) = self.logo_elements.iter_mut().find(|e| e.id == id) {
            f(&mut e.visible, &mut e.locked);
            return true;
        }
        false
    }

    /// Set a layer's visibility, whatever its type
    pub fn set_layer_visible(&mut self, layer: &LayerId, visible: bool) -> bool {
        match layer {
            LayerId::Text(id) | LayerId::Logo(id) => self.set_element_visible(*id, visible),
            LayerId::Texture(part) => self
                .part_layers
                .get_mut(part)
                .map(|l| l.texture_visible = visible)
                .is_some(),
            LayerId::Color(part) => self
                .part_layers
                .get_mut(part)
                .map(|l| l.color_visible = visible)
                .is_some(),
        }
    }

    pub fn set_layer_locked(&mut self, layer: &LayerId, locked: bool) -> bool {
        match layer {
            LayerId::Text(id) | LayerId::Logo(id) => self.set_element_locked(*id, locked),
            LayerId::Texture(part) => self
                .part_layers
                .get_mut(part)
                .map(|l| l.texture_locked = locked)
                .is_some(),
            LayerId::Color(part) => self
                .part_layers
                .get_mut(part)
                .map(|l| l.color_locked = locked)
                .is_some(),
        }
    }

    pub(crate) fn set_z_index(&mut self, layer: &LayerId, z_index: i64) -> bool {
        match layer {
            LayerId::Text(id) => self
                .text_elements
                .iter_mut()
                .find(|e| e.id == *id)
                .map(|e| e.z_index = z_index)
                .is_some(),
            LayerId::Logo(id) => self
                .logo_elements
                .iter_mut()
                .find(|e| e.id == *id)
                .map(|e| e.z_index = z_index)
                .is_some(),
            LayerId::Texture(part) => self
                .part_layers
                .get_mut(part)
                .map(|l| l.texture_z = z_index)
                .is_some(),
            LayerId::Color(part) => self
                .part_layers
                .get_mut(part)
                .map(|l| l.color_z = z_index)
                .is_some(),
        }
    }

    pub(crate) fn shift_depth(&mut self, id: ElementId, dz: f64) {
        if let Some(e) = self.text_elements.iter_mut().find(|e| e.id == id) {
            e.position[2] += dz;
        } else if let Some(e) = self.logo_elements.iter_mut().find(|e| e.id == id) {
            e.position[2] += dz;
        }
    }

    /// Elements authored on `part`, with their list positions
    pub fn overlays_for(&self, part: &PartId) -> Vec<OverlayRecord> {
        let texts = self
            .text_elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.part.as_ref() == Some(part))
            .map(|(index, e)| OverlayRecord {
                index,
                element: OverlayElement::Text(e.clone()),
            });
        let logos = self
            .logo_elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.part.as_ref() == Some(part))
            .map(|(index, e)| OverlayRecord {
                index,
                element: OverlayElement::Logo(e.clone()),
            });
        texts.chain(logos).collect()
    }

    /// Replace the elements authored on `part` with `records`
    pub fn restore_overlays(&mut self, part: &PartId, records: &[OverlayRecord]) {
        self.text_elements.retain(|e| e.part.as_ref() != Some(part));
        self.logo_elements.retain(|e| e.part.as_ref() != Some(part));

        let mut sorted: Vec<&OverlayRecord> = records.iter().collect();
        sorted.sort_by_key(|r| r.index);
        for record in sorted {
            match &record.element {
                OverlayElement::Text(e) => {
                    let index = record.index.min(self.text_elements.len());
                    self.text_elements.insert(index, e.clone());
                }
                OverlayElement::Logo(e) => {
                    let index = record.index.min(self.logo_elements.len());
                    self.logo_elements.insert(index, e.clone());
                }
            }
        }
    }

    pub(crate) fn text_elements_mut(&mut self) -> &mut Vec<TextElement> {
        &mut self.text_elements
    }

    pub(crate) fn logo_elements_mut(&mut self) -> &mut Vec<LogoElement> {
        &mut self.logo_elements
    }

    pub(crate) fn part_layer_mut(&mut self, part: &PartId) -> Option<&mut PartLayerState> {
        self.part_layers.get_mut(part)
    }
}
