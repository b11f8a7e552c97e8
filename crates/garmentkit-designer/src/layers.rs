//! Layer registry.
//!
//! Layers are a derived, cross-type view over text elements, logo elements,
//! per-part fill textures and per-part base colors. The view is rebuilt from
//! [`DesignState`] whenever it is needed and is never the source of truth.
//!
//! Ordering is split in two:
//! - [`reorder`] is pure zIndex bookkeeping over a layer list.
//! - [`DepthMapping`] turns a zIndex into a 3D depth offset for the renderer.
//!
//! [`apply_reorder`] composes the two against a [`DesignState`].

use garmentkit_core::{ElementId, PartId};
use garmentkit_settings::LayerSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::design_state::DesignState;

/// Layer types, in the order they are listed within equal zIndex values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Logo,
    Text,
    Texture,
    Color,
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Logo => "logo",
            LayerKind::Text => "text",
            LayerKind::Texture => "texture",
            LayerKind::Color => "color",
        }
    }

    /// First zIndex handed out for this type
    pub fn base_z_index(&self, settings: &LayerSettings) -> i64 {
        match self {
            LayerKind::Logo => settings.logo_base,
            LayerKind::Text => settings.text_base,
            LayerKind::Texture => settings.texture_base,
            LayerKind::Color => settings.color_base,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a layer: its type plus the source it was derived from.
///
/// Displays as `kind:source`, e.g. `text:6f1c...` or `color:body`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerId {
    Text(ElementId),
    Logo(ElementId),
    Texture(PartId),
    Color(PartId),
}

impl LayerId {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerId::Text(_) => LayerKind::Text,
            LayerId::Logo(_) => LayerKind::Logo,
            LayerId::Texture(_) => LayerKind::Texture,
            LayerId::Color(_) => LayerKind::Color,
        }
    }

    /// Backing element for text and logo layers
    pub fn element(&self) -> Option<ElementId> {
        match self {
            LayerId::Text(id) | LayerId::Logo(id) => Some(*id),
            _ => None,
        }
    }

    /// Backing part for texture and color layers
    pub fn part(&self) -> Option<&PartId> {
        match self {
            LayerId::Texture(part) | LayerId::Color(part) => Some(part),
            _ => None,
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Text(id) | LayerId::Logo(id) => write!(f, "{}:{}", self.kind(), id),
            LayerId::Texture(part) | LayerId::Color(part) => write!(f, "{}:{}", self.kind(), part),
        }
    }
}

/// A string that is not a valid `kind:source` layer id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid layer id '{0}'")]
pub struct ParseLayerIdError(String);

impl FromStr for LayerId {
    type Err = ParseLayerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseLayerIdError(s.to_string());
        let (kind, source) = s.split_once(':').ok_or_else(invalid)?;
        if source.is_empty() {
            return Err(invalid());
        }
        match kind {
            "text" => source.parse().map(LayerId::Text).map_err(|_| invalid()),
            "logo" => source.parse().map(LayerId::Logo).map_err(|_| invalid()),
            "texture" => Ok(LayerId::Texture(PartId::new(source))),
            "color" => Ok(LayerId::Color(PartId::new(source))),
            _ => Err(invalid()),
        }
    }
}

/// One entry of the unified layer list.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub z_index: i64,
    /// Creation order within the layer's type; breaks zIndex ties
    pub order: usize,
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        self.id.kind()
    }
}

/// Reorder operations exposed by the layer list (and by surface draw order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReorderOp {
    MoveForward,
    MoveBackward,
    BringToFront,
    SendToBack,
}

impl ReorderOp {
    pub fn name(&self) -> &'static str {
        match self {
            ReorderOp::MoveForward => "moveForward",
            ReorderOp::MoveBackward => "moveBackward",
            ReorderOp::BringToFront => "bringToFront",
            ReorderOp::SendToBack => "sendToBack",
        }
    }
}

impl fmt::Display for ReorderOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single zIndex assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZChange {
    pub layer: LayerId,
    pub from: i64,
    pub to: i64,
}

/// Result of a reorder: every zIndex that has to change, target included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub layer: LayerId,
    pub op: ReorderOp,
    pub from: i64,
    pub to: i64,
    pub changes: Vec<ZChange>,
}

impl ReorderPlan {
    /// The target's zIndex after the reorder
    pub fn new_z_index(&self) -> i64 {
        self.to
    }
}

/// Compute the zIndex assignments for `op` on `target`.
///
/// Only layers of the target's type take part. Before the move, same-type
/// layers are walked in (zIndex, creation order) and any zIndex not above
/// its predecessor is bumped to predecessor + 1, so the result never holds
/// two equal zIndex values within the type.
///
/// # Returns
///
/// `None` for an unknown layer or when nothing changes (forward/backward at
/// the same-type extreme with no ties to fix).
pub fn reorder(layers: &[Layer], target: &LayerId, op: ReorderOp, step: i64) -> Option<ReorderPlan> {
    let kind = target.kind();
    let mut same: Vec<&Layer> = layers.iter().filter(|l| l.kind() == kind).collect();
    same.sort_by_key(|l| (l.z_index, l.order));

    let index = same.iter().position(|l| &l.id == target)?;

    let mut next: Vec<i64> = Vec::with_capacity(same.len());
    for layer in &same {
        let z = match next.last() {
            Some(&prev) if layer.z_index <= prev => prev + 1,
            _ => layer.z_index,
        };
        next.push(z);
    }

    match op {
        ReorderOp::MoveForward => {
            if index + 1 < next.len() {
                next.swap(index, index + 1);
            }
        }
        ReorderOp::MoveBackward => {
            if index > 0 {
                next.swap(index, index - 1);
            }
        }
        ReorderOp::BringToFront => {
            let max = next.iter().copied().max()?;
            next[index] = max + step;
        }
        ReorderOp::SendToBack => {
            let min = next.iter().copied().min()?;
            next[index] = min - step;
        }
    }

    let changes: Vec<ZChange> = same
        .iter()
        .zip(&next)
        .filter(|(layer, z)| layer.z_index != **z)
        .map(|(layer, z)| ZChange {
            layer: layer.id.clone(),
            from: layer.z_index,
            to: *z,
        })
        .collect();

    if changes.is_empty() {
        return None;
    }

    Some(ReorderPlan {
        layer: target.clone(),
        op,
        from: same[index].z_index,
        to: next[index],
        changes,
    })
}

/// Monotonic zIndex to 3D depth offset mapping.
///
/// One `step` of zIndex covers `epsilon` of depth, so bring-to-front and
/// send-to-back move an element exactly one epsilon toward or away from
/// the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthMapping {
    step: i64,
    epsilon: f64,
}

impl DepthMapping {
    pub fn new(settings: &LayerSettings) -> Self {
        Self {
            step: settings.step.max(1),
            epsilon: settings.depth_epsilon,
        }
    }

    pub fn offset_for(&self, z_index: i64) -> f64 {
        z_index as f64 * self.epsilon / self.step as f64
    }

    /// Depth change for a zIndex change
    pub fn shift(&self, from: i64, to: i64) -> f64 {
        (to - from) as f64 * self.epsilon / self.step as f64
    }
}

/// Depth offset for a zIndex under `settings`
pub fn depth_offset_for(z_index: i64, settings: &LayerSettings) -> f64 {
    DepthMapping::new(settings).offset_for(z_index)
}

/// Build the layer list, sorted by zIndex descending
pub fn build_layers(state: &DesignState) -> Vec<Layer> {
    let mut layers = Vec::new();

    for (order, element) in state.text_elements().iter().enumerate() {
        layers.push(Layer {
            id: LayerId::Text(element.id),
            name: text_layer_name(&element.text),
            visible: element.visible,
            locked: element.locked,
            z_index: element.z_index,
            order,
        });
    }

    for (order, element) in state.logo_elements().iter().enumerate() {
        layers.push(Layer {
            id: LayerId::Logo(element.id),
            name: format!("Logo {}", order + 1),
            visible: element.visible,
            locked: element.locked,
            z_index: element.z_index,
            order,
        });
    }

    for (order, part) in state.model().parts.iter().enumerate() {
        let Some(part_layer) = state.part_layer(part) else {
            continue;
        };
        if state.fill_texture(part).is_some() {
            layers.push(Layer {
                id: LayerId::Texture(part.clone()),
                name: format!("{} texture", part),
                visible: part_layer.texture_visible,
                locked: part_layer.texture_locked,
                z_index: part_layer.texture_z,
                order,
            });
        }
        layers.push(Layer {
            id: LayerId::Color(part.clone()),
            name: format!("{} color", part),
            visible: part_layer.color_visible,
            locked: part_layer.color_locked,
            z_index: part_layer.color_z,
            order,
        });
    }

    layers.sort_by(|a, b| {
        b.z_index
            .cmp(&a.z_index)
            .then(a.kind().cmp(&b.kind()))
            .then(a.order.cmp(&b.order))
    });
    layers
}

fn text_layer_name(text: &str) -> String {
    const MAX_CHARS: usize = 24;
    let mut name: String = text.chars().take(MAX_CHARS).collect();
    if text.chars().count() > MAX_CHARS {
        name.push_str("...");
    }
    name
}

/// Reorder a layer of `state` and move overlay elements in depth to match.
///
/// Every zIndex change of a text or logo element shifts its `position[2]`
/// by the [`DepthMapping`] difference; texture and color layers only get a
/// new zIndex.
pub fn apply_reorder(state: &mut DesignState, layer: &LayerId, op: ReorderOp) -> Option<ReorderPlan> {
    let settings = state.layer_settings().clone();
    let plan = reorder(&build_layers(state), layer, op, settings.step)?;
    let mapping = DepthMapping::new(&settings);

    for change in &plan.changes {
        state.set_z_index(&change.layer, change.to);
        if let Some(element) = change.layer.element() {
            state.shift_depth(element, mapping.shift(change.from, change.to));
        }
    }

    tracing::debug!(
        "Layer {} {}: zIndex {} -> {} ({} changes)",
        plan.layer,
        op,
        plan.from,
        plan.to,
        plan.changes.len()
    );
    Some(plan)
}
