//! Point shape, drawn as a small circle.

use super::ShapeBase;
use crate::geometry::{Point, Rect};
use crate::model::Geometry;

/// Radius in image pixels when no canvas setting applies.
pub const DEFAULT_POINT_RADIUS: f32 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PointShape {
    pub(crate) base: ShapeBase,
    center: Point,
    radius: f32,
}

impl PointShape {
    pub fn new(base: ShapeBase, center: Point, radius: f32) -> Self {
        Self {
            base,
            center,
            radius: radius.max(0.0),
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::point(self.center)
    }

    pub(crate) fn set_center(&mut self, center: Point) {
        self.center = center;
    }

    pub fn bounding_rect(&self) -> Rect {
        Rect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            2.0 * self.radius,
            2.0 * self.radius,
        )
    }

    pub fn hit_body(&self, p: &Point, tolerance: f32) -> bool {
        self.center.distance_to(p) <= self.radius + tolerance
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let nearest = Point::new(
            self.center.x.clamp(rect.x, rect.right()),
            self.center.y.clamp(rect.y, rect.bottom()),
        );
        nearest.distance_to(&self.center) <= self.radius
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.center = self.center.offset(dx, dy);
    }
}
