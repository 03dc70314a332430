//! Editing handles attached to selected shapes.

use crate::geometry::{Point, Rect};

/// Position of a rectangle scale handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleAnchor {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ScaleAnchor {
    pub const ALL: [ScaleAnchor; 8] = [
        ScaleAnchor::TopLeft,
        ScaleAnchor::Top,
        ScaleAnchor::TopRight,
        ScaleAnchor::Right,
        ScaleAnchor::BottomRight,
        ScaleAnchor::Bottom,
        ScaleAnchor::BottomLeft,
        ScaleAnchor::Left,
    ];

    /// Where this handle sits on `rect`.
    pub fn position_on(&self, rect: &Rect) -> Point {
        let cx = rect.x + rect.w / 2.0;
        let cy = rect.y + rect.h / 2.0;
        match self {
            ScaleAnchor::TopLeft => Point::new(rect.x, rect.y),
            ScaleAnchor::Top => Point::new(cx, rect.y),
            ScaleAnchor::TopRight => Point::new(rect.right(), rect.y),
            ScaleAnchor::Right => Point::new(rect.right(), cy),
            ScaleAnchor::BottomRight => Point::new(rect.right(), rect.bottom()),
            ScaleAnchor::Bottom => Point::new(cx, rect.bottom()),
            ScaleAnchor::BottomLeft => Point::new(rect.x, rect.bottom()),
            ScaleAnchor::Left => Point::new(rect.x, cy),
        }
    }

    /// Resize `rect` by moving this handle to `to`, keeping the opposite side fixed.
    ///
    /// Dragging past the opposite side flips the rectangle; the result always
    /// has non-negative size.
    pub fn resize(&self, rect: &Rect, to: Point) -> Rect {
        let (left, top, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
        let (p1, p2) = match self {
            ScaleAnchor::TopLeft => (to, Point::new(right, bottom)),
            ScaleAnchor::Top => (Point::new(left, to.y), Point::new(right, bottom)),
            ScaleAnchor::TopRight => (Point::new(left, to.y), Point::new(to.x, bottom)),
            ScaleAnchor::Right => (Point::new(left, top), Point::new(to.x, bottom)),
            ScaleAnchor::BottomRight => (Point::new(left, top), to),
            ScaleAnchor::Bottom => (Point::new(left, top), Point::new(right, to.y)),
            ScaleAnchor::BottomLeft => (Point::new(to.x, top), Point::new(right, to.y)),
            ScaleAnchor::Left => (Point::new(to.x, top), Point::new(right, bottom)),
        };
        Rect::from_corners(p1, p2)
    }
}

/// What a handle controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Rectangle scale handle.
    Scale(ScaleAnchor),
    /// Free handle on a polygon vertex.
    Vertex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub kind: HandleKind,
    pub position: Point,
}

impl Handle {
    pub fn new(kind: HandleKind, position: Point) -> Self {
        Self { kind, position }
    }

    pub fn hit(&self, p: &Point, tolerance: f32) -> bool {
        self.position.distance_to(p) <= tolerance
    }
}
