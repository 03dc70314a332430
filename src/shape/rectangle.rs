//! Rectangle shape with eight scale handles.

use super::ShapeBase;
use super::handle::{Handle, HandleKind, ScaleAnchor};
use crate::geometry::{Point, Rect};
use crate::model::Geometry;

#[derive(Debug, Clone, PartialEq)]
pub struct RectangleShape {
    pub(crate) base: ShapeBase,
    rect: Rect,
    /// Degrees, carried through but not applied to hit testing.
    rotation: f32,
}

impl RectangleShape {
    pub fn new(base: ShapeBase, rect: Rect, rotation: f32) -> Self {
        let mut shape = Self {
            base,
            rect: Rect::from_corners(rect.top_left(), Point::new(rect.right(), rect.bottom())),
            rotation,
        };
        shape.refresh_handles();
        shape
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::Rectangle {
            x: self.rect.x,
            y: self.rect.y,
            w: self.rect.w,
            h: self.rect.h,
            rotation: self.rotation,
        }
    }

    pub(crate) fn set_rect(&mut self, rect: Rect, rotation: f32) {
        self.rect = rect;
        self.rotation = rotation;
        self.refresh_handles();
    }

    pub(crate) fn refresh_handles(&mut self) {
        self.base.handles = if self.base.selected {
            ScaleAnchor::ALL
                .iter()
                .map(|a| Handle::new(HandleKind::Scale(*a), a.position_on(&self.rect)))
                .collect()
        } else {
            Vec::new()
        };
    }

    pub fn hit_body(&self, p: &Point, tolerance: f32) -> bool {
        let grown = Rect::new(
            self.rect.x - tolerance,
            self.rect.y - tolerance,
            self.rect.w + 2.0 * tolerance,
            self.rect.h + 2.0 * tolerance,
        );
        grown.contains(p)
    }

    pub fn move_handle(&mut self, kind: HandleKind, to: Point) -> bool {
        let current = self.rect;
        self.resize_from(&current, kind, to)
    }

    /// Resize against `origin`, the rectangle as it was when the drag began, so the
    /// side opposite the handle stays fixed after the drag crosses it.
    pub fn resize_from(&mut self, origin: &Rect, kind: HandleKind, to: Point) -> bool {
        let HandleKind::Scale(anchor) = kind else {
            return false;
        };
        let resized = anchor.resize(origin, to);
        self.set_rect(resized, self.rotation);
        true
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        let moved = Rect::new(self.rect.x + dx, self.rect.y + dy, self.rect.w, self.rect.h);
        self.set_rect(moved, self.rotation);
    }
}
