//! Hit testing, marquee selection and selection bookkeeping.
//!
//! Shapes are stored bottom to top, so "topmost first" means iterating in
//! reverse.

use crate::geometry::{Point, Rect};
use crate::shape::{Shape, ShapeHit};

/// Marquees smaller than this area (image units squared) are discarded.
pub const MIN_MARQUEE_AREA: f32 = 4.0;

/// Result of a canvas hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTarget {
    pub index: usize,
    pub hit: ShapeHit,
}

/// Find what lies under `p`.
///
/// Handles of selected shapes win over any body, then bodies are tested from
/// the top of the z-order down.
pub fn hit_test(shapes: &[Shape], p: &Point, tolerance: f32) -> Option<HitTarget> {
    let handle = shapes
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, s)| s.is_selected())
        .find_map(|(index, s)| {
            s.hit_handle(p, tolerance).map(|kind| HitTarget {
                index,
                hit: ShapeHit::Handle(kind),
            })
        });
    if handle.is_some() {
        return handle;
    }

    shapes
        .iter()
        .enumerate()
        .rev()
        .find(|(_, s)| s.hit_body(p, tolerance))
        .map(|(index, _)| HitTarget {
            index,
            hit: ShapeHit::Body,
        })
}

/// Rubber-band rectangle spanned by a press point and the current pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marquee {
    pub origin: Point,
    pub current: Point,
}

impl Marquee {
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            current: origin,
        }
    }

    pub fn update(&mut self, p: Point) {
        self.current = p;
    }

    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.origin, self.current)
    }

    pub fn area(&self) -> f32 {
        self.rect().area()
    }

    pub fn is_large_enough(&self, min_area: f32) -> bool {
        self.area() >= min_area
    }
}

/// Ids of every shape intersecting `rect`, bottom to top.
pub fn marquee_hits(shapes: &[Shape], rect: &Rect) -> Vec<String> {
    shapes
        .iter()
        .filter(|s| s.intersects_rect(rect))
        .map(|s| s.id().to_string())
        .collect()
}

pub fn selected_ids(shapes: &[Shape]) -> Vec<String> {
    shapes
        .iter()
        .filter(|s| s.is_selected())
        .map(|s| s.id().to_string())
        .collect()
}

/// Select `ids`. Without `additive` every other shape is deselected first.
///
/// Returns true if the selection changed.
pub fn select_ids(shapes: &mut [Shape], ids: &[String], additive: bool) -> bool {
    let before = selected_ids(shapes);
    for shape in shapes.iter_mut() {
        let wanted = ids.iter().any(|id| id == shape.id());
        if wanted {
            shape.set_selected(true);
        } else if !additive {
            shape.set_selected(false);
        }
    }
    selected_ids(shapes) != before
}

/// Deselect everything. Returns true if anything was selected.
pub fn clear_selection(shapes: &mut [Shape]) -> bool {
    let mut changed = false;
    for shape in shapes.iter_mut().filter(|s| s.is_selected()) {
        shape.set_selected(false);
        changed = true;
    }
    changed
}
