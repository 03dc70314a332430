//! Canvas shapes: the on-screen projection of annotation results.
//!
//! A `Shape` carries its result id, a geometry, selection state, style, and the
//! editing handles that exist while it is selected.

mod handle;
mod point;
mod polygon;
mod rectangle;
mod style;

pub use handle::{Handle, HandleKind, ScaleAnchor};
pub use point::{DEFAULT_POINT_RADIUS, PointShape};
pub use polygon::PolygonShape;
pub use rectangle::RectangleShape;
pub use style::{DEFAULT_FILL_ALPHA, DEFAULT_STROKE_WIDTH, ShapeStyle};

use crate::geometry::{Point, Rect};
use crate::model::{Geometry, GeometryKind};

/// Snapshot of a shape's identity and geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeState {
    pub id: String,
    pub geometry: Geometry,
}

impl ShapeState {
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

/// State shared by all shape variants.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeBase {
    pub id: String,
    pub selected: bool,
    pub movable: bool,
    pub style: ShapeStyle,
    pub(crate) handles: Vec<Handle>,
}

impl ShapeBase {
    pub fn new(id: impl Into<String>, style: ShapeStyle) -> Self {
        Self {
            id: id.into(),
            selected: false,
            movable: true,
            style,
            handles: Vec::new(),
        }
    }
}

/// What a hit test landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeHit {
    Handle(HandleKind),
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rectangle(RectangleShape),
    Polygon(PolygonShape),
    Point(PointShape),
}

impl Shape {
    /// Build a shape from a state snapshot.
    pub fn from_state(state: &ShapeState, style: ShapeStyle, point_radius: f32) -> Self {
        Self::from_base(ShapeBase::new(state.id.clone(), style), &state.geometry, point_radius)
    }

    fn from_base(base: ShapeBase, geometry: &Geometry, point_radius: f32) -> Self {
        match geometry {
            Geometry::Rectangle {
                x,
                y,
                w,
                h,
                rotation,
            } => Shape::Rectangle(RectangleShape::new(base, Rect::new(*x, *y, *w, *h), *rotation)),
            Geometry::Polygon { closed, .. } => {
                Shape::Polygon(PolygonShape::new(base, geometry.vertices(), *closed))
            }
            Geometry::Point { x, y } => {
                Shape::Point(PointShape::new(base, Point::new(*x, *y), point_radius))
            }
        }
    }

    fn base(&self) -> &ShapeBase {
        match self {
            Shape::Rectangle(s) => &s.base,
            Shape::Polygon(s) => &s.base,
            Shape::Point(s) => &s.base,
        }
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        match self {
            Shape::Rectangle(s) => &mut s.base,
            Shape::Polygon(s) => &mut s.base,
            Shape::Point(s) => &mut s.base,
        }
    }

    fn refresh_handles(&mut self) {
        match self {
            Shape::Rectangle(s) => s.refresh_handles(),
            Shape::Polygon(s) => s.refresh_handles(),
            Shape::Point(s) => s.base.handles.clear(),
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Shape::Rectangle(_) => GeometryKind::Rectangle,
            Shape::Polygon(_) => GeometryKind::Polygon,
            Shape::Point(_) => GeometryKind::Point,
        }
    }

    pub fn geometry(&self) -> Geometry {
        match self {
            Shape::Rectangle(s) => s.geometry(),
            Shape::Polygon(s) => s.geometry(),
            Shape::Point(s) => s.geometry(),
        }
    }

    pub fn state(&self) -> ShapeState {
        ShapeState::new(self.id(), self.geometry())
    }

    /// Apply a snapshot. Selection, style and movability are kept; a snapshot of
    /// a different kind replaces the variant.
    pub fn set_state(&mut self, state: &ShapeState) {
        self.base_mut().id = state.id.clone();
        if self.kind() != state.geometry.kind() {
            let radius = match self {
                Shape::Point(p) => p.radius(),
                _ => DEFAULT_POINT_RADIUS,
            };
            let base = self.base().clone();
            *self = Self::from_base(base, &state.geometry, radius);
            self.refresh_handles();
            return;
        }
        match (self, &state.geometry) {
            (
                Shape::Rectangle(s),
                Geometry::Rectangle {
                    x,
                    y,
                    w,
                    h,
                    rotation,
                },
            ) => s.set_rect(Rect::new(*x, *y, *w, *h), *rotation),
            (Shape::Polygon(s), Geometry::Polygon { closed, .. }) => {
                s.set_points(state.geometry.vertices(), *closed)
            }
            (Shape::Point(s), Geometry::Point { x, y }) => s.set_center(Point::new(*x, *y)),
            _ => {}
        }
    }

    pub fn is_selected(&self) -> bool {
        self.base().selected
    }

    /// Select or deselect. Handles are created on select and dropped on deselect.
    pub fn set_selected(&mut self, selected: bool) {
        if self.base().selected == selected {
            return;
        }
        self.base_mut().selected = selected;
        self.refresh_handles();
    }

    pub fn is_movable(&self) -> bool {
        self.base().movable
    }

    pub fn set_movable(&mut self, movable: bool) {
        self.base_mut().movable = movable;
    }

    pub fn style(&self) -> &ShapeStyle {
        &self.base().style
    }

    pub fn set_style(&mut self, style: ShapeStyle) {
        self.base_mut().style = style;
    }

    pub fn set_fill_color(&mut self, color: &str, alpha: f32) {
        let width = self.style().stroke_width;
        let mut style = ShapeStyle::from_hex(color, alpha);
        style.stroke_width = width;
        self.set_style(style);
    }

    pub fn handles(&self) -> &[Handle] {
        &self.base().handles
    }

    pub fn area(&self) -> f32 {
        match self {
            Shape::Rectangle(s) => s.rect().area(),
            Shape::Polygon(s) => s.area(),
            Shape::Point(_) => 0.0,
        }
    }

    pub fn bounding_rect(&self) -> Rect {
        match self {
            Shape::Rectangle(s) => s.rect(),
            Shape::Polygon(s) => s.bounding_rect(),
            Shape::Point(s) => s.bounding_rect(),
        }
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        match self {
            Shape::Rectangle(s) => s.rect().intersects(rect),
            Shape::Polygon(s) => s.intersects_rect(rect),
            Shape::Point(s) => s.intersects_rect(rect),
        }
    }

    /// Handle under `p`, topmost (last drawn) first.
    pub fn hit_handle(&self, p: &Point, tolerance: f32) -> Option<HandleKind> {
        self.handles()
            .iter()
            .rev()
            .find(|h| h.hit(p, tolerance))
            .map(|h| h.kind)
    }

    pub fn hit_body(&self, p: &Point, tolerance: f32) -> bool {
        match self {
            Shape::Rectangle(s) => s.hit_body(p, tolerance),
            Shape::Polygon(s) => s.hit_body(p, tolerance),
            Shape::Point(s) => s.hit_body(p, tolerance),
        }
    }

    /// Handles take priority over the body.
    pub fn hit_test(&self, p: &Point, tolerance: f32) -> Option<ShapeHit> {
        if let Some(kind) = self.hit_handle(p, tolerance) {
            return Some(ShapeHit::Handle(kind));
        }
        self.hit_body(p, tolerance).then_some(ShapeHit::Body)
    }

    /// Move a handle to `to`. Returns false if the handle does not belong to this shape.
    pub fn move_handle(&mut self, kind: HandleKind, to: Point) -> bool {
        match self {
            Shape::Rectangle(s) => s.move_handle(kind, to),
            Shape::Polygon(s) => s.move_handle(kind, to),
            Shape::Point(_) => false,
        }
    }

    /// Move a handle as part of a drag that started from `origin`.
    pub fn drag_handle(&mut self, origin: &ShapeState, kind: HandleKind, to: Point) -> bool {
        if let Shape::Rectangle(s) = self {
            return s.resize_from(&origin.geometry.bounding_rect(), kind, to);
        }
        self.move_handle(kind, to)
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Shape::Rectangle(s) => s.translate(dx, dy),
            Shape::Polygon(s) => s.translate(dx, dy),
            Shape::Point(s) => s.translate(dx, dy),
        }
    }

    /// Insert a polygon vertex on the nearest edge. Other shapes are unaffected.
    pub fn insert_vertex_near(&mut self, p: &Point, tolerance: f32) -> Option<usize> {
        match self {
            Shape::Polygon(s) => s.insert_vertex_near(p, tolerance),
            _ => None,
        }
    }
}
