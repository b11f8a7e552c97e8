//! Per-part surface state and its serialized form.
//!
//! The object list order is the draw order: index 0 paints first. A base
//! layer, when present, is always at index 0; every other object keeps its
//! relative order when the base layer is replaced.

use garmentkit_core::{DeserializeError, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::elements::OverlayRecord;
use crate::layers::ReorderOp;
use crate::object::SurfaceObject;

/// Current surface document version.
pub const SURFACE_FORMAT_VERSION: u32 = 1;

/// A serialized surface, as stored in history and in design files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceBlob(serde_json::Value);

impl SurfaceBlob {
    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SurfaceDocument {
    #[serde(default = "default_version")]
    version: u32,
    width: u32,
    height: u32,
    objects: Vec<SurfaceObject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    overlays: Vec<OverlayRecord>,
}

fn default_version() -> u32 {
    SURFACE_FORMAT_VERSION
}

impl SurfaceDocument {
    fn encode(&self) -> SurfaceBlob {
        // Serializing plain data into a Value cannot fail; fall back to null
        // so a broken entry surfaces later as a DeserializeError.
        SurfaceBlob(serde_json::to_value(self).unwrap_or(serde_json::Value::Null))
    }

    fn decode(blob: &SurfaceBlob) -> Result<Self, DeserializeError> {
        let doc = SurfaceDocument::deserialize(&blob.0)
            .map_err(|e| DeserializeError::Malformed(e.to_string()))?;
        if doc.version > SURFACE_FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion {
                found: doc.version,
                supported: SURFACE_FORMAT_VERSION,
            });
        }
        Ok(doc)
    }
}

/// The editable object graph of one part.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    width: u32,
    height: u32,
    objects: Vec<SurfaceObject>,
}

impl SurfaceState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            objects: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Objects in draw order
    pub fn objects(&self) -> &[SurfaceObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SurfaceObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SurfaceObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Draw index of an object
    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn base_layer(&self) -> Option<&SurfaceObject> {
        self.objects.first().filter(|o| o.is_base_layer())
    }

    fn first_user_index(&self) -> usize {
        usize::from(self.base_layer().is_some())
    }

    /// Append a user object on top of the draw order
    pub fn push(&mut self, object: SurfaceObject) -> ObjectId {
        let id = object.id;
        if object.is_base_layer() {
            self.set_base_layer(Some(object));
        } else {
            self.objects.push(object);
        }
        id
    }

    /// Replace (or remove, with `None`) the index-0 base layer
    pub fn set_base_layer(&mut self, base: Option<SurfaceObject>) {
        if self.base_layer().is_some() {
            self.objects.remove(0);
        }
        if let Some(base) = base {
            self.objects.insert(0, base);
        }
    }

    /// Remove a user object; the base layer is only removed through `set_base_layer`
    pub fn remove(&mut self, id: ObjectId) -> Option<SurfaceObject> {
        let index = self.index_of(id)?;
        if self.objects[index].is_base_layer() {
            return None;
        }
        Some(self.objects.remove(index))
    }

    /// Remove every object except the base layer, returning how many went
    pub fn clear(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|o| o.is_base_layer());
        before - self.objects.len()
    }

    /// Change an object's draw index; the base layer never moves
    ///
    /// # Returns
    ///
    /// `true` if the order changed.
    pub fn reorder(&mut self, id: ObjectId, op: ReorderOp) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if self.objects[index].is_base_layer() {
            return false;
        }
        let floor = self.first_user_index();
        let top = self.objects.len() - 1;
        let target = match op {
            ReorderOp::MoveForward => (index < top).then_some(index + 1),
            ReorderOp::MoveBackward => (index > floor).then(|| index - 1),
            ReorderOp::BringToFront => (index < top).then_some(top),
            ReorderOp::SendToBack => (index > floor).then_some(floor),
        };
        let Some(target) = target else {
            return false;
        };
        let object = self.objects.remove(index);
        self.objects.insert(target, object);
        true
    }

    /// Check the draw-order rules: unique ids, at most one base layer, at index 0
    pub fn validate(&self) -> Result<(), DeserializeError> {
        let mut seen = HashSet::with_capacity(self.objects.len());
        for (index, object) in self.objects.iter().enumerate() {
            if !seen.insert(object.id) {
                return Err(DeserializeError::InvalidDrawOrder(format!(
                    "duplicate object id {}",
                    object.id
                )));
            }
            if object.is_base_layer() && index != 0 {
                return Err(DeserializeError::InvalidDrawOrder(format!(
                    "base layer at index {}",
                    index
                )));
            }
        }
        Ok(())
    }

    /// Serialize the object graph
    pub fn serialize(&self) -> SurfaceBlob {
        self.document(Vec::new()).encode()
    }

    /// Rebuild an object graph from `serialize()` output (overlays, if any, are ignored)
    pub fn deserialize(blob: &SurfaceBlob) -> Result<Self, DeserializeError> {
        Ok(SurfaceSnapshot::from_blob(blob)?.surface)
    }

    fn document(&self, overlays: Vec<OverlayRecord>) -> SurfaceDocument {
        SurfaceDocument {
            version: SURFACE_FORMAT_VERSION,
            width: self.width,
            height: self.height,
            objects: self.objects.clone(),
            overlays,
        }
    }

    pub(crate) fn objects_mut(&mut self) -> &mut [SurfaceObject] {
        &mut self.objects
    }
}

/// A history entry: the surface plus the overlay elements authored on it.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub surface: SurfaceState,
    pub overlays: Vec<OverlayRecord>,
}

impl SurfaceSnapshot {
    pub fn to_blob(&self) -> SurfaceBlob {
        self.surface.document(self.overlays.clone()).encode()
    }

    pub fn from_blob(blob: &SurfaceBlob) -> Result<Self, DeserializeError> {
        let doc = SurfaceDocument::decode(blob)?;
        let surface = SurfaceState {
            width: doc.width,
            height: doc.height,
            objects: doc.objects,
        };
        surface.validate()?;
        Ok(Self {
            surface,
            overlays: doc.overlays,
        })
    }
}
