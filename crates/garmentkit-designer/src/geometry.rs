//! 2D geometry for surface objects: points, placements and handles.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A point in surface pixel coordinates (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Rotate around the origin by `degrees` (clockwise on screen, y down)
    pub fn rotated(&self, degrees: f64) -> Point {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Position, size and rotation of a surface object.
///
/// `left`/`top` locate the unrotated box; rotation (degrees) is applied
/// about the box center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl Placement {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            rotation: 0.0,
        }
    }

    /// Placement with the given center and size
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn set_center(&mut self, center: Point) {
        self.left = center.x - self.width / 2.0;
        self.top = center.y - self.height / 2.0;
    }

    /// Map a surface point into the object's local frame (origin at center, unrotated)
    pub fn to_local(&self, point: Point) -> Point {
        (point - self.center()).rotated(-self.rotation)
    }

    /// Map a local-frame point back to surface coordinates
    pub fn to_surface(&self, local: Point) -> Point {
        local.rotated(self.rotation) + self.center()
    }

    /// Rotation-aware containment test
    pub fn contains(&self, point: Point) -> bool {
        let local = self.to_local(point);
        local.x.abs() <= self.width / 2.0 && local.y.abs() <= self.height / 2.0
    }
}

/// Selection handles: 8 resize handles plus the rotate handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    Rotate,
}

impl Handle {
    /// The eight resize handles, clockwise from top-left
    pub const RESIZE: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    /// Sign of the handle along each local axis: -1 left/top, 0 middle, +1 right/bottom
    pub fn axis_signs(&self) -> (i8, i8) {
        match self {
            Handle::TopLeft => (-1, -1),
            Handle::Top => (0, -1),
            Handle::TopRight => (1, -1),
            Handle::Right => (1, 0),
            Handle::BottomRight => (1, 1),
            Handle::Bottom => (0, 1),
            Handle::BottomLeft => (-1, 1),
            Handle::Left => (-1, 0),
            Handle::Rotate => (0, -1),
        }
    }

    pub fn opposite(&self) -> Handle {
        match self {
            Handle::TopLeft => Handle::BottomRight,
            Handle::Top => Handle::Bottom,
            Handle::TopRight => Handle::BottomLeft,
            Handle::Right => Handle::Left,
            Handle::BottomRight => Handle::TopLeft,
            Handle::Bottom => Handle::Top,
            Handle::BottomLeft => Handle::TopRight,
            Handle::Left => Handle::Right,
            Handle::Rotate => Handle::Rotate,
        }
    }

    pub fn is_resize(&self) -> bool {
        !matches!(self, Handle::Rotate)
    }

    /// Handle position in the object's local frame
    pub fn local_position(&self, placement: &Placement, rotate_offset: f64) -> Point {
        let (sx, sy) = self.axis_signs();
        let (hw, hh) = (placement.width / 2.0, placement.height / 2.0);
        match self {
            Handle::Rotate => Point::new(0.0, -hh - rotate_offset),
            _ => Point::new(f64::from(sx) * hw, f64::from(sy) * hh),
        }
    }

    /// Handle position on the surface, following the object's rotation
    pub fn position(&self, placement: &Placement, rotate_offset: f64) -> Point {
        placement.to_surface(self.local_position(placement, rotate_offset))
    }
}
