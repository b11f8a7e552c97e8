//! Text and logo overlay elements.
//!
//! Overlays are placed on the 3D model by the external renderer. Their
//! `z_index` orders them in the layer list and drives their depth offset;
//! it is a different number space from a surface object's draw index.

use garmentkit_core::{ElementId, ImageRef, PartId, Result};
use serde::{Deserialize, Serialize};

use crate::object::{validate_text, TextStyle};

/// A text overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: ElementId,
    pub text: String,
    #[serde(flatten)]
    pub style: TextStyle,
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    pub z_index: i64,
    pub visible: bool,
    pub locked: bool,
    /// Part surface the element was authored on, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<PartId>,
}

impl TextElement {
    pub fn new(text: impl Into<String>, style: TextStyle, position: [f64; 3], z_index: i64) -> Self {
        Self {
            id: ElementId::new(),
            text: text.into(),
            style,
            position,
            rotation: [0.0; 3],
            z_index,
            visible: true,
            locked: false,
            part: None,
        }
    }
}

/// A logo (image) overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoElement {
    pub id: ElementId,
    pub image: ImageRef,
    /// Uniform scale
    pub size: f64,
    pub opacity: f64,
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    pub z_index: i64,
    pub visible: bool,
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<PartId>,
}

impl LogoElement {
    pub fn new(image: ImageRef, position: [f64; 3], z_index: i64) -> Self {
        Self {
            id: ElementId::new(),
            image,
            size: 1.0,
            opacity: 1.0,
            position,
            rotation: [0.0; 3],
            z_index,
            visible: true,
            locked: false,
            part: None,
        }
    }
}

/// Either kind of overlay, used where the two are handled alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OverlayElement {
    Text(TextElement),
    Logo(LogoElement),
}

impl OverlayElement {
    pub fn id(&self) -> ElementId {
        match self {
            OverlayElement::Text(e) => e.id,
            OverlayElement::Logo(e) => e.id,
        }
    }

    pub fn part(&self) -> Option<&PartId> {
        match self {
            OverlayElement::Text(e) => e.part.as_ref(),
            OverlayElement::Logo(e) => e.part.as_ref(),
        }
    }
}

/// An overlay element captured with its position in its element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayRecord {
    pub index: usize,
    pub element: OverlayElement,
}

/// Text fields that can be edited after creation; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextUpdate {
    pub text: Option<String>,
    pub style: Option<TextStyle>,
    pub position: Option<[f64; 3]>,
    pub rotation: Option<[f64; 3]>,
}

impl TextUpdate {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.style.is_none() && self.position.is_none() && self.rotation.is_none()
    }

    /// Check the new text and style before anything is applied
    pub fn validate(&self) -> Result<()> {
        if let Some(text) = &self.text {
            validate_text(text)?;
        }
        if let Some(style) = &self.style {
            style.validate()?;
        }
        Ok(())
    }

    /// Apply to an element, returning whether anything changed
    pub fn apply(&self, element: &mut TextElement) -> bool {
        let before = element.clone();
        if let Some(text) = &self.text {
            element.text = text.clone();
        }
        if let Some(style) = &self.style {
            element.style = style.clone();
        }
        if let Some(position) = self.position {
            element.position = position;
        }
        if let Some(rotation) = self.rotation {
            element.rotation = rotation;
        }
        *element != before
    }
}
