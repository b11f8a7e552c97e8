//! Hit testing and drag/resize/rotate of surface objects.
//!
//! A gesture starts on pointer press, updates the live placement on every
//! move and ends on release. Only the release is a commit; the caller takes
//! one history snapshot for the whole gesture.

use garmentkit_core::ObjectId;
use garmentkit_settings::ManipulationSettings;

use crate::geometry::{Handle, Placement, Point};
use crate::object::SurfaceObject;
use crate::surface::SurfaceState;

/// What a pointer press grabbed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureKind {
    Drag,
    Resize(Handle),
    Rotate,
}

/// An in-progress manipulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub object: ObjectId,
    pub kind: GestureKind,
    pub start: Point,
    pub original: Placement,
}

/// Result of a finished gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureOutcome {
    pub object: ObjectId,
    pub kind: GestureKind,
    /// Whether the placement differs from where it started
    pub changed: bool,
}

/// Topmost selectable object whose (rotated) box contains `point`.
///
/// The base layer is never hit.
pub fn hit_test(surface: &SurfaceState, point: Point) -> Option<ObjectId> {
    surface
        .objects()
        .iter()
        .rev()
        .find(|o| o.is_selectable() && o.placement.contains(point))
        .map(|o| o.id)
}

/// Translate an object; no-op under `lock_movement`
pub fn drag(object: &mut SurfaceObject, delta: Point) -> bool {
    if object.locks.lock_movement || (delta.x == 0.0 && delta.y == 0.0) {
        return false;
    }
    object.placement.left += delta.x;
    object.placement.top += delta.y;
    true
}

/// Resize from `handle` towards `new_point`, anchored at the opposite handle.
///
/// Width and height never change sign: dragging past the opposite edge
/// clamps to `min_size`. No-op under `lock_scaling`.
pub fn resize(object: &mut SurfaceObject, handle: Handle, new_point: Point, min_size: f64) -> bool {
    if object.locks.lock_scaling || !handle.is_resize() {
        return false;
    }
    let current = object.placement;
    let next = resized(&current, handle, new_point, min_size);
    object.placement = next;
    next != current
}

fn resized(p: &Placement, handle: Handle, new_point: Point, min_size: f64) -> Placement {
    let (sx, sy) = handle.axis_signs();
    let local = p.to_local(new_point);
    let anchor = handle.opposite().local_position(p, 0.0);

    let (mut width, mut cx) = (p.width, 0.0);
    if sx != 0 {
        let s = f64::from(sx);
        width = ((local.x - anchor.x) * s).max(min_size);
        cx = anchor.x + s * width / 2.0;
    }
    let (mut height, mut cy) = (p.height, 0.0);
    if sy != 0 {
        let s = f64::from(sy);
        height = ((local.y - anchor.y) * s).max(min_size);
        cy = anchor.y + s * height / 2.0;
    }

    let center = p.to_surface(Point::new(cx, cy));
    let mut next = *p;
    next.width = width;
    next.height = height;
    next.set_center(center);
    next
}

/// Angle (degrees, 0 = straight up, clockwise) of `point` around `center`
pub fn pointer_angle(center: Point, point: Point) -> f64 {
    let d = point - center;
    d.x.atan2(-d.y).to_degrees()
}

/// Set rotation directly; no-op under `lock_rotation`
pub fn rotate(object: &mut SurfaceObject, degrees: f64) -> bool {
    if object.locks.lock_rotation || object.placement.rotation == degrees {
        return false;
    }
    object.placement.rotation = degrees;
    true
}

/// Tracks the selected object's handles and the active gesture.
#[derive(Debug, Clone)]
pub struct ManipulationController {
    settings: ManipulationSettings,
    gesture: Option<Gesture>,
}

impl ManipulationController {
    pub fn new(settings: ManipulationSettings) -> Self {
        Self {
            settings,
            gesture: None,
        }
    }

    pub fn settings(&self) -> &ManipulationSettings {
        &self.settings
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    /// Positions of the 8 resize handles and the rotate handle
    pub fn handles(&self, placement: &Placement) -> Vec<(Handle, Point)> {
        Handle::RESIZE
            .iter()
            .chain(std::iter::once(&Handle::Rotate))
            .map(|h| (*h, h.position(placement, self.settings.rotate_handle_offset)))
            .collect()
    }

    /// Handle of `object` under `point`, if any
    pub fn handle_at(&self, object: &SurfaceObject, point: Point) -> Option<Handle> {
        self.handles(&object.placement)
            .into_iter()
            .rev()
            .find(|(_, pos)| pos.distance_to(&point) <= self.settings.handle_radius)
            .map(|(h, _)| h)
    }

    /// Start a gesture at `point`.
    ///
    /// A handle of the selected object wins over the body of any object;
    /// otherwise the topmost hit object is grabbed for dragging.
    ///
    /// # Returns
    ///
    /// The grabbed object and gesture kind, or `None` for empty space.
    pub fn begin(
        &mut self,
        surface: &SurfaceState,
        selected: Option<ObjectId>,
        point: Point,
    ) -> Option<(ObjectId, GestureKind)> {
        self.gesture = None;

        let on_handle = selected
            .and_then(|id| surface.get(id))
            .filter(|o| o.is_selectable())
            .and_then(|o| self.handle_at(o, point).map(|h| (o, h)));

        let (object, kind) = match on_handle {
            Some((object, Handle::Rotate)) => (object, GestureKind::Rotate),
            Some((object, handle)) => (object, GestureKind::Resize(handle)),
            None => {
                let id = hit_test(surface, point)?;
                (surface.get(id)?, GestureKind::Drag)
            }
        };

        self.gesture = Some(Gesture {
            object: object.id,
            kind,
            start: point,
            original: object.placement,
        });
        Some((object.id, kind))
    }

    /// Apply the pointer position to the live placement; never commits
    pub fn update(&mut self, surface: &mut SurfaceState, point: Point) -> bool {
        let Some(gesture) = &self.gesture else {
            return false;
        };
        let Some(object) = surface.get_mut(gesture.object) else {
            return false;
        };

        match gesture.kind {
            GestureKind::Drag => {
                if object.locks.lock_movement {
                    return false;
                }
                let target = gesture.original.center() + (point - gesture.start);
                let delta = target - object.placement.center();
                drag(object, delta)
            }
            GestureKind::Resize(handle) => {
                resize(object, handle, point, self.settings.min_size)
            }
            GestureKind::Rotate => {
                let angle = pointer_angle(object.placement.center(), point);
                rotate(object, angle)
            }
        }
    }

    /// Finish the gesture (pointer released, inside or outside the canvas)
    pub fn end(&mut self, surface: &SurfaceState) -> Option<GestureOutcome> {
        let gesture = self.gesture.take()?;
        let changed = surface
            .get(gesture.object)
            .is_some_and(|o| o.placement != gesture.original);
        Some(GestureOutcome {
            object: gesture.object,
            kind: gesture.kind,
            changed,
        })
    }

    /// Abort the gesture and put the object back where it started
    pub fn cancel(&mut self, surface: &mut SurfaceState) {
        if let Some(gesture) = self.gesture.take() {
            if let Some(object) = surface.get_mut(gesture.object) {
                object.placement = gesture.original;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ImageData, ObjectKind};
    use garmentkit_core::ImageRef;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn image(placement: Placement) -> SurfaceObject {
        SurfaceObject::new(
            ObjectKind::Image(ImageData {
                image: ImageRef::new("mem://img"),
                natural_width: 10,
                natural_height: 10,
                overlay: None,
            }),
            placement,
        )
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut surface = SurfaceState::new(200, 200);
        let below = surface.push(image(Placement::new(0.0, 0.0, 100.0, 100.0)));
        let above = surface.push(image(Placement::new(50.0, 50.0, 100.0, 100.0)));
        assert_eq!(hit_test(&surface, Point::new(75.0, 75.0)), Some(above));
        assert_eq!(hit_test(&surface, Point::new(10.0, 10.0)), Some(below));
        assert_eq!(hit_test(&surface, Point::new(190.0, 10.0)), None);
    }

    #[test]
    fn test_hit_test_skips_base_layer() {
        let mut surface = SurfaceState::new(100, 100);
        surface.set_base_layer(Some(SurfaceObject::base_layer(
            ImageRef::new("tex"),
            100,
            100,
        )));
        assert_eq!(hit_test(&surface, Point::new(50.0, 50.0)), None);
    }

    #[test]
    fn test_resize_anchors_opposite_corner() {
        let mut obj = image(Placement::new(10.0, 10.0, 40.0, 20.0));
        assert!(resize(&mut obj, Handle::BottomRight, Point::new(70.0, 50.0), 8.0));
        assert_eq!(obj.placement, Placement::new(10.0, 10.0, 60.0, 40.0));
    }

    #[test]
    fn test_resize_clamps_instead_of_flipping() {
        let mut obj = image(Placement::new(10.0, 10.0, 40.0, 20.0));
        resize(&mut obj, Handle::Right, Point::new(-100.0, 20.0), 8.0);
        assert_eq!(obj.placement.width, 8.0);
        assert_eq!(obj.placement.left, 10.0);
        assert_eq!(obj.placement.height, 20.0);
    }

    #[test]
    fn test_resize_rotated_keeps_anchor_fixed() {
        let mut placement = Placement::new(0.0, 0.0, 40.0, 20.0);
        placement.rotation = 30.0;
        let mut obj = image(placement);
        let anchor_before = Handle::TopLeft.position(&obj.placement, 0.0);
        let grab = Handle::BottomRight.position(&obj.placement, 0.0);
        resize(&mut obj, Handle::BottomRight, grab + Point::new(10.0, 5.0), 8.0);
        let anchor_after = Handle::TopLeft.position(&obj.placement, 0.0);
        assert!(approx(anchor_before.x, anchor_after.x));
        assert!(approx(anchor_before.y, anchor_after.y));
        assert!(obj.placement.width > 40.0);
    }

    #[test]
    fn test_locks_are_respected() {
        let mut obj = image(Placement::new(0.0, 0.0, 10.0, 10.0));
        obj.locks.lock_movement = true;
        obj.locks.lock_scaling = true;
        obj.locks.lock_rotation = true;
        assert!(!drag(&mut obj, Point::new(5.0, 5.0)));
        assert!(!resize(&mut obj, Handle::Right, Point::new(50.0, 5.0), 1.0));
        assert!(!rotate(&mut obj, 45.0));
        assert_eq!(obj.placement, Placement::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_pointer_angle() {
        let c = Point::new(0.0, 0.0);
        assert!(approx(pointer_angle(c, Point::new(0.0, -10.0)), 0.0));
        assert!(approx(pointer_angle(c, Point::new(10.0, 0.0)), 90.0));
        assert!(approx(pointer_angle(c, Point::new(-10.0, 0.0)), -90.0));
    }

    #[test]
    fn test_gesture_drag_and_rotate() {
        let mut surface = SurfaceState::new(200, 200);
        let id = surface.push(image(Placement::new(0.0, 0.0, 40.0, 40.0)));
        let mut controller = ManipulationController::new(ManipulationSettings::default());

        assert_eq!(
            controller.begin(&surface, None, Point::new(20.0, 20.0)),
            Some((id, GestureKind::Drag))
        );
        controller.update(&mut surface, Point::new(25.0, 20.0));
        controller.update(&mut surface, Point::new(30.0, 30.0));
        let outcome = controller.end(&surface).unwrap();
        assert!(outcome.changed);
        assert_eq!(surface.get(id).unwrap().placement.left, 10.0);
        assert_eq!(surface.get(id).unwrap().placement.top, 10.0);

        // rotate handle sits 30px above the top edge center
        let rotate_at = Point::new(30.0, 10.0 - 30.0);
        assert_eq!(
            controller.begin(&surface, Some(id), rotate_at),
            Some((id, GestureKind::Rotate))
        );
        controller.update(&mut surface, Point::new(100.0, 30.0));
        controller.end(&surface);
        assert!(approx(surface.get(id).unwrap().placement.rotation, 90.0));
    }

    #[test]
    fn test_cancel_restores_placement() {
        let mut surface = SurfaceState::new(200, 200);
        let id = surface.push(image(Placement::new(0.0, 0.0, 40.0, 40.0)));
        let mut controller = ManipulationController::new(ManipulationSettings::default());
        controller.begin(&surface, None, Point::new(5.0, 5.0));
        controller.update(&mut surface, Point::new(50.0, 50.0));
        controller.cancel(&mut surface);
        assert!(!controller.is_active());
        assert_eq!(
            surface.get(id).unwrap().placement,
            Placement::new(0.0, 0.0, 40.0, 40.0)
        );
    }
}
