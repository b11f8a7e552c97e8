//! Objects that live on a part surface.
//!
//! A surface holds strokes, text glyph runs, images and at most one locked
//! base layer. Every object has a stable identity, a [`Placement`], an
//! opacity, visibility and per-axis manipulation locks.

use garmentkit_core::{Color, ElementId, Error, ImageRef, ObjectId, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::{Placement, Point};

/// Whether a stroke paints or erases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeMode {
    Paint,
    Erase,
}

/// Fixed width and color of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub mode: StrokeMode,
    pub color: Color,
    pub width: f64,
}

/// A committed freehand stroke.
///
/// Points are relative to the placement's top-left corner at the size the
/// stroke was drawn (`base_width` x `base_height`); the renderer scales them
/// to the current placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeData {
    pub style: StrokeStyle,
    pub points: Vec<Point>,
    pub base_width: f64,
    pub base_height: f64,
}

impl StrokeData {
    /// Build a stroke from surface-space points, returning it with its bounding placement
    pub fn from_points(style: StrokeStyle, points: &[Point]) -> Option<(Self, Placement)> {
        let first = points.first()?;
        let (mut min, mut max) = (*first, *first);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }

        let half = style.width / 2.0;
        let left = min.x - half;
        let top = min.y - half;
        let width = (max.x - min.x) + style.width;
        let height = (max.y - min.y) + style.width;
        let origin = Point::new(left, top);

        let data = StrokeData {
            style,
            points: points.iter().map(|p| *p - origin).collect(),
            base_width: width,
            base_height: height,
        };
        Some((data, Placement::new(left, top, width, height)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Font and color settings shared by glyph runs and text overlay elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_size: f64,
    pub color: Color,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub font_style: FontStyle,
    pub font_family: String,
    #[serde(default)]
    pub text_align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 24.0,
            color: Color::BLACK,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            font_family: "Sans".to_string(),
            text_align: TextAlign::Center,
        }
    }
}

impl TextStyle {
    /// Reject sizes a glyph run cannot be laid out with
    pub fn validate(&self) -> Result<()> {
        if self.font_size <= 0.0 || !self.font_size.is_finite() {
            return Err(Error::InvalidOperation(format!(
                "font size {} is not positive",
                self.font_size
            )));
        }
        Ok(())
    }
}

/// Text content must have at least one visible character.
pub fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidOperation("text is empty".to_string()));
    }
    Ok(())
}

/// A run of text painted onto the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
    /// Overlay element authored together with this run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<ElementId>,
}

/// An image placed on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub image: ImageRef,
    pub natural_width: u32,
    pub natural_height: u32,
    /// Logo element authored together with this image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<ElementId>,
}

/// What an object is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectKind {
    Stroke(StrokeData),
    Text(TextRun),
    Image(ImageData),
    BaseLayer { image: ImageRef },
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Stroke(_) => "stroke",
            ObjectKind::Text(_) => "text",
            ObjectKind::Image(_) => "image",
            ObjectKind::BaseLayer { .. } => "baseLayer",
        }
    }

    /// Overlay element linked to this object, if any
    pub fn overlay(&self) -> Option<ElementId> {
        match self {
            ObjectKind::Text(run) => run.overlay,
            ObjectKind::Image(image) => image.overlay,
            _ => None,
        }
    }
}

/// Per-object manipulation locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locks {
    #[serde(default)]
    pub lock_movement: bool,
    #[serde(default)]
    pub lock_scaling: bool,
    #[serde(default)]
    pub lock_rotation: bool,
    #[serde(default)]
    pub unselectable: bool,
}

impl Locks {
    pub fn all() -> Self {
        Self {
            lock_movement: true,
            lock_scaling: true,
            lock_rotation: true,
            unselectable: true,
        }
    }
}

/// One paintable unit on a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceObject {
    pub id: ObjectId,
    #[serde(flatten)]
    pub placement: Placement,
    pub opacity: f64,
    pub visible: bool,
    #[serde(flatten)]
    pub locks: Locks,
    #[serde(flatten)]
    pub kind: ObjectKind,
}

impl SurfaceObject {
    pub fn new(kind: ObjectKind, placement: Placement) -> Self {
        Self {
            id: ObjectId::new(),
            placement,
            opacity: 1.0,
            visible: true,
            locks: Locks::default(),
            kind,
        }
    }

    /// The locked full-canvas base layer
    pub fn base_layer(image: ImageRef, width: u32, height: u32) -> Self {
        Self {
            locks: Locks::all(),
            ..Self::new(
                ObjectKind::BaseLayer { image },
                Placement::new(0.0, 0.0, f64::from(width), f64::from(height)),
            )
        }
    }

    pub fn is_base_layer(&self) -> bool {
        matches!(self.kind, ObjectKind::BaseLayer { .. })
    }

    /// Whether hit testing and manipulation may pick this object
    pub fn is_selectable(&self) -> bool {
        self.visible && !self.is_base_layer() && !self.locks.unselectable
    }
}
