//! Geometry primitives and view/image coordinate mapping.
//!
//! Image coordinates have their origin at the top-left pixel corner with y
//! pointing down. View coordinates are relative to the widget center, offset by
//! the pan and scaled by the zoom factor.

use serde::{Deserialize, Serialize};

/// Minimum zoom factor used when converting view distances to image distances.
const MIN_EFFECTIVE_ZOOM: f32 = 0.01;

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn to_tuple(self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Point::new(x, y)
    }
}

/// An axis-aligned rectangle with its top-left corner at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Create a normalized rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            w: (p1.x - p2.x).abs(),
            h: (p1.y - p2.y).abs(),
        }
    }

    /// Smallest rectangle containing all points, or `None` for an empty slice.
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Smallest rectangle containing both rectangles.
    pub fn union(&self, other: &Rect) -> Rect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Corners in clockwise order starting at the top-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x, self.bottom()),
        ]
    }

    /// Check if a point is inside the rectangle (edges inclusive).
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Check if two rectangles overlap (touching edges count as overlap).
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }
}

/// Signed-area shoelace sum for a vertex ring.
fn shoelace(points: &[Point]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Polygon area via the shoelace formula.
///
/// Open polygons and polygons with fewer than 3 vertices have zero area.
pub fn polygon_area(points: &[Point], closed: bool) -> f32 {
    if !closed || points.len() < 3 {
        return 0.0;
    }
    shoelace(points).abs() / 2.0
}

/// Closest point to `p` on the segment `a`-`b` (clamped projection).
pub fn closest_point_on_segment(p: &Point, a: &Point, b: &Point) -> Point {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return *a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Point::new(a.x + t * dx, a.y + t * dy)
}

/// Distance from `p` to the segment `a`-`b`.
pub fn point_segment_distance(p: &Point, a: &Point, b: &Point) -> f32 {
    p.distance_to(&closest_point_on_segment(p, a, b))
}

fn orientation(a: &Point, b: &Point, c: &Point) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: &Point, b: &Point, p: &Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Check whether segments `p1`-`p2` and `q1`-`q2` intersect (including touching).
pub fn segments_intersect(p1: &Point, p2: &Point, q1: &Point, q2: &Point) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Point-in-polygon test using ray casting. The ring is treated as closed.
pub fn point_in_polygon(p: &Point, vertices: &[Point]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = vertices[i];
        let vj = vertices[j];
        if ((vi.y > p.y) != (vj.y > p.y)) && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Iterate the edges of a vertex list, including the closing edge when `closed`.
pub fn edges(vertices: &[Point], closed: bool) -> impl Iterator<Item = (usize, Point, Point)> + '_ {
    let n = vertices.len();
    let count = match (closed, n) {
        (_, 0 | 1) => 0,
        (true, 2) => 1,
        (true, _) => n,
        (false, _) => n - 1,
    };
    (0..count).map(move |i| (i, vertices[i], vertices[(i + 1) % n]))
}

/// Precise polyline/polygon versus rectangle intersection.
///
/// True if any vertex lies in the rectangle, any edge crosses a rectangle edge,
/// or (for closed rings) the rectangle lies inside the polygon.
pub fn polygon_intersects_rect(vertices: &[Point], closed: bool, rect: &Rect) -> bool {
    if vertices.iter().any(|v| rect.contains(v)) {
        return true;
    }
    let corners = rect.corners();
    let rect_edges = [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[3]),
        (corners[3], corners[0]),
    ];
    let crosses = edges(vertices, closed)
        .any(|(_, a, b)| rect_edges.iter().any(|(c, d)| segments_intersect(&a, &b, c, d)));
    if crosses {
        return true;
    }
    closed && point_in_polygon(&corners[0], vertices)
}

/// Pan/zoom transform between view space and image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl ViewTransform {
    pub fn new(zoom: f32, pan_x: f32, pan_y: f32) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// Create an identity transform (zoom=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    fn effective_zoom(&self) -> f32 {
        self.zoom.max(MIN_EFFECTIVE_ZOOM)
    }

    /// Map a view-space position to image coordinates.
    pub fn view_to_image(&self, p: Point) -> Point {
        let zoom = self.effective_zoom();
        Point::new((p.x - self.pan_x) / zoom, (p.y - self.pan_y) / zoom)
    }

    /// Map an image coordinate to view space.
    pub fn image_to_view(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.pan_x, p.y * self.zoom + self.pan_y)
    }

    /// Convert a distance measured in view pixels to image units.
    pub fn view_distance_to_image(&self, distance: f32) -> f32 {
        distance / self.effective_zoom()
    }

    /// Zoom while keeping the image point under the cursor fixed.
    pub fn zoom_to_cursor(&self, new_zoom: f32, cursor: Point) -> ViewTransform {
        let anchor = self.view_to_image(cursor);
        ViewTransform {
            zoom: new_zoom,
            pan_x: cursor.x - anchor.x * new_zoom,
            pan_y: cursor.y - anchor.y * new_zoom,
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f32, dy: f32) -> ViewTransform {
        ViewTransform::new(self.zoom, self.pan_x + dx, self.pan_y + dy)
    }

    pub fn zoom_in(&self, factor: f32, max_zoom: f32) -> ViewTransform {
        ViewTransform::new((self.zoom * factor).min(max_zoom), self.pan_x, self.pan_y)
    }

    pub fn zoom_out(&self, factor: f32, min_zoom: f32) -> ViewTransform {
        ViewTransform::new((self.zoom / factor).max(min_zoom), self.pan_x, self.pan_y)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_unit_square_area() {
        assert_eq!(polygon_area(&unit_square(), true), 1.0);
        assert_eq!(polygon_area(&unit_square(), false), 0.0);
    }

    #[test]
    fn test_degenerate_polygon_area() {
        let two = [Point::new(0.0, 0.0), Point::new(3.0, 4.0)];
        assert_eq!(polygon_area(&two, true), 0.0);
    }

    #[test]
    fn test_area_ignores_winding() {
        let mut ccw = unit_square();
        ccw.reverse();
        assert_eq!(polygon_area(&ccw, true), 1.0);
    }

    #[test]
    fn test_point_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_relative_eq!(point_segment_distance(&Point::new(5.0, 3.0), &a, &b), 3.0);
        // Beyond the end: clamped to endpoint b
        assert_relative_eq!(point_segment_distance(&Point::new(13.0, 4.0), &a, &b), 5.0);
        // Degenerate segment
        assert_relative_eq!(point_segment_distance(&Point::new(3.0, 4.0), &a, &a), 5.0);
    }

    #[test]
    fn test_rect_from_corners() {
        let r = Rect::from_corners(Point::new(50.0, 40.0), Point::new(10.0, 10.0));
        assert_eq!(r, Rect::new(10.0, 10.0, 40.0, 30.0));
    }

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(a.intersects(&Rect::new(2.0, 2.0, 1.0, 1.0)));
        assert!(!a.intersects(&Rect::new(20.0, 20.0, 5.0, 5.0)));
    }

    #[test]
    fn test_polygon_intersects_rect() {
        let triangle = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
        ];
        // Rect fully inside the triangle
        assert!(polygon_intersects_rect(&triangle, true, &Rect::new(10.0, 10.0, 5.0, 5.0)));
        // Rect crossing the hypotenuse without containing a vertex
        assert!(polygon_intersects_rect(&triangle, true, &Rect::new(40.0, 40.0, 30.0, 30.0)));
        // Rect beyond the hypotenuse, inside the bounding box
        assert!(!polygon_intersects_rect(&triangle, true, &Rect::new(80.0, 80.0, 10.0, 10.0)));
    }

    #[test]
    fn test_segments_intersect() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 10.0);
        assert!(segments_intersect(&a, &b, &Point::new(0.0, 10.0), &Point::new(10.0, 0.0)));
        assert!(!segments_intersect(&a, &b, &Point::new(0.0, 1.0), &Point::new(9.0, 10.0)));
    }

    #[test]
    fn test_view_image_roundtrip() {
        let t = ViewTransform::new(2.0, 30.0, -10.0);
        let p = Point::new(12.5, 7.0);
        let back = t.view_to_image(t.image_to_view(p));
        assert_relative_eq!(back.x, p.x);
        assert_relative_eq!(back.y, p.y);
        assert_relative_eq!(t.view_distance_to_image(10.0), 5.0);
    }

    #[test]
    fn test_zoom_to_cursor_preserves_cursor_point() {
        let t = ViewTransform::new(1.0, 50.0, 30.0);
        let cursor = Point::new(150.0, 120.0);
        let before = t.view_to_image(cursor);
        let after = t.zoom_to_cursor(2.0, cursor).view_to_image(cursor);
        assert_relative_eq!(before.x, after.x, epsilon = 1e-4);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-4);
    }

    #[test]
    fn test_zoom_clamping() {
        let t = ViewTransform::new(4.0, 0.0, 0.0);
        assert_eq!(t.zoom_in(1.5, 5.0).zoom, 5.0);
        assert_relative_eq!(ViewTransform::new(0.3, 0.0, 0.0).zoom_out(1.5, 0.2).zoom, 0.2);
    }
}
