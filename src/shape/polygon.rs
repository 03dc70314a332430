//! Polygon shape with one free handle per vertex.

use super::ShapeBase;
use super::handle::{Handle, HandleKind};
use crate::geometry::{
    Point, Rect, closest_point_on_segment, edges, point_in_polygon, point_segment_distance,
    polygon_area, polygon_intersects_rect,
};
use crate::model::Geometry;

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonShape {
    pub(crate) base: ShapeBase,
    points: Vec<Point>,
    closed: bool,
}

impl PolygonShape {
    pub fn new(base: ShapeBase, points: Vec<Point>, closed: bool) -> Self {
        let mut shape = Self {
            base,
            points,
            closed,
        };
        shape.refresh_handles();
        shape
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::polygon(&self.points, self.closed)
    }

    pub fn area(&self) -> f32 {
        polygon_area(&self.points, self.closed)
    }

    pub fn bounding_rect(&self) -> Rect {
        Rect::bounding(&self.points).unwrap_or_default()
    }

    pub(crate) fn set_points(&mut self, points: Vec<Point>, closed: bool) {
        self.points = points;
        self.closed = closed;
        self.refresh_handles();
    }

    pub(crate) fn refresh_handles(&mut self) {
        self.base.handles = if self.base.selected {
            self.points
                .iter()
                .enumerate()
                .map(|(i, p)| Handle::new(HandleKind::Vertex(i), *p))
                .collect()
        } else {
            Vec::new()
        };
    }

    pub fn hit_body(&self, p: &Point, tolerance: f32) -> bool {
        if self.closed && point_in_polygon(p, &self.points) {
            return true;
        }
        edges(&self.points, self.closed).any(|(_, a, b)| point_segment_distance(p, &a, &b) <= tolerance)
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        polygon_intersects_rect(&self.points, self.closed, rect)
    }

    pub fn move_handle(&mut self, kind: HandleKind, to: Point) -> bool {
        let HandleKind::Vertex(index) = kind else {
            return false;
        };
        let Some(vertex) = self.points.get_mut(index) else {
            return false;
        };
        *vertex = to;
        self.refresh_handles();
        true
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        for p in &mut self.points {
            *p = p.offset(dx, dy);
        }
        self.refresh_handles();
    }

    /// Insert a vertex at the closest point of the nearest edge within `tolerance`.
    ///
    /// Returns the index of the new vertex. When the shape is selected the new
    /// vertex gets its handle immediately.
    pub fn insert_vertex_near(&mut self, p: &Point, tolerance: f32) -> Option<usize> {
        let (edge, _, a, b) = edges(&self.points, self.closed)
            .map(|(i, a, b)| (i, point_segment_distance(p, &a, &b), a, b))
            .filter(|(_, d, _, _)| *d <= tolerance)
            .min_by(|x, y| x.1.total_cmp(&y.1))?;
        let index = edge + 1;
        self.points.insert(index, closest_point_on_segment(p, &a, &b));
        self.refresh_handles();
        Some(index)
    }
}
