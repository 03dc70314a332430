//! Annotation results: one labeled geometry each.

use serde::{Deserialize, Serialize};

use super::label::Label;
use crate::geometry::{Point, Rect, polygon_area};

/// Length of generated result ids.
pub const RESULT_ID_LEN: usize = 9;

/// Origin of results drawn by hand.
pub const MANUAL_ORIGIN: &str = "manual";

/// Generate a random result id.
pub fn new_result_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(RESULT_ID_LEN);
    id
}

/// Discriminant of a `Geometry`, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Point,
    Rectangle,
    Polygon,
}

impl GeometryKind {
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "point",
            GeometryKind::Rectangle => "rectangle",
            GeometryKind::Polygon => "polygon",
        }
    }
}

fn default_closed() -> bool {
    true
}

/// Geometry of a result in image coordinates.
///
/// Serialized with a `type` field naming the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    Point {
        x: f32,
        y: f32,
    },
    Rectangle {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        #[serde(default)]
        rotation: f32,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        #[serde(default = "default_closed")]
        closed: bool,
    },
}

impl Geometry {
    pub fn rectangle(rect: Rect) -> Self {
        Geometry::Rectangle {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            rotation: 0.0,
        }
    }

    pub fn polygon(points: &[Point], closed: bool) -> Self {
        Geometry::Polygon {
            points: points.iter().map(|p| p.to_tuple()).collect(),
            closed,
        }
    }

    pub fn point(p: Point) -> Self {
        Geometry::Point { x: p.x, y: p.y }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point { .. } => GeometryKind::Point,
            Geometry::Rectangle { .. } => GeometryKind::Rectangle,
            Geometry::Polygon { .. } => GeometryKind::Polygon,
        }
    }

    /// Vertices of a polygon as points (empty for other variants).
    pub fn vertices(&self) -> Vec<Point> {
        match self {
            Geometry::Polygon { points, .. } => points.iter().map(|&p| Point::from(p)).collect(),
            _ => Vec::new(),
        }
    }

    /// Axis-aligned bounding rectangle. Rotation is ignored.
    pub fn bounding_rect(&self) -> Rect {
        match self {
            Geometry::Point { x, y } => Rect::new(*x, *y, 0.0, 0.0),
            Geometry::Rectangle { x, y, w, h, .. } => Rect::new(*x, *y, *w, *h),
            Geometry::Polygon { .. } => Rect::bounding(&self.vertices()).unwrap_or_default(),
        }
    }

    pub fn area(&self) -> f32 {
        match self {
            Geometry::Point { .. } => 0.0,
            Geometry::Rectangle { w, h, .. } => (w * h).abs(),
            Geometry::Polygon { closed, .. } => polygon_area(&self.vertices(), *closed),
        }
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Geometry {
        match self {
            Geometry::Point { x, y } => Geometry::Point {
                x: x + dx,
                y: y + dy,
            },
            Geometry::Rectangle {
                x,
                y,
                w,
                h,
                rotation,
            } => Geometry::Rectangle {
                x: x + dx,
                y: y + dy,
                w: *w,
                h: *h,
                rotation: *rotation,
            },
            Geometry::Polygon { points, closed } => Geometry::Polygon {
                points: points.iter().map(|(x, y)| (x + dx, y + dy)).collect(),
                closed: *closed,
            },
        }
    }
}

/// One labeled geometry inside an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub id: String,
    /// `"manual"` or the name of the oracle mode that produced it.
    pub origin: String,
    pub score: f32,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(flatten)]
    pub geometry: Geometry,
}

impl AnnotationResult {
    /// Create a result with a fresh id and full confidence.
    pub fn new(geometry: Geometry, origin: impl Into<String>, labels: Vec<Label>) -> Self {
        Self {
            id: new_result_id(),
            origin: origin.into(),
            score: 1.0,
            note: String::new(),
            labels,
            geometry,
        }
    }

    /// Create a hand-drawn result.
    pub fn manual(geometry: Geometry, label: Label) -> Self {
        Self::new(geometry, MANUAL_ORIGIN, vec![label])
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }

    /// Value equality of the geometry, ignoring id, origin, score, note and labels.
    pub fn equal_v(&self, other: &AnnotationResult) -> bool {
        self.geometry == other.geometry
    }

    pub fn bounding_rect(&self) -> Rect {
        self.geometry.bounding_rect()
    }

    pub fn area(&self) -> f32 {
        self.geometry.area()
    }

    /// The label used for styling: the first one attached.
    pub fn primary_label(&self) -> Option<&Label> {
        self.labels.first()
    }

    pub fn has_label(&self, label_id: &str) -> bool {
        self.labels.iter().any(|l| l.id == label_id)
    }
}
