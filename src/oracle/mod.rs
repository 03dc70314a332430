//! Auto-segmentation oracle interface.
//!
//! An oracle (SAM, classic CV, or both) turns a drawn seed into rectangles or
//! polygons. The transport is external; this module defines the request and
//! response shapes, the `Oracle` trait, and conversion of responses into
//! annotation results.

mod worker;

pub use worker::{OraclePool, PredictOutcome};

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::geometry::{Point, Rect};
use crate::model::{AnnotationResult, Geometry, Label};

/// How new shapes are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoMode {
    /// Drawn geometry is stored as-is.
    #[default]
    Manual,
    Sam,
    Cv,
    SamAndCv,
}

impl AutoMode {
    pub fn from_flags(sam: bool, cv: bool) -> Self {
        match (sam, cv) {
            (false, false) => AutoMode::Manual,
            (true, false) => AutoMode::Sam,
            (false, true) => AutoMode::Cv,
            (true, true) => AutoMode::SamAndCv,
        }
    }

    /// Name recorded as the origin of results this mode produces.
    pub fn name(&self) -> &'static str {
        match self {
            AutoMode::Manual => "MANUAL",
            AutoMode::Sam => "SAM",
            AutoMode::Cv => "CV",
            AutoMode::SamAndCv => "SAM_AND_CV",
        }
    }

    pub fn uses_oracle(&self) -> bool {
        *self != AutoMode::Manual
    }
}

/// Shape the oracle should answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    #[default]
    Rect,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedPoint {
    pub x: f32,
    pub y: f32,
}

impl From<Point> for SeedPoint {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<Rect> for SeedRect {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            w: r.w,
            h: r.h,
        }
    }
}

/// Label value marking a positive click.
pub const POSITIVE_POINT: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Annotation id of the task the seed was drawn on.
    pub task_id: String,
    /// Image name as known to the oracle.
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<SeedPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_labels: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rects: Option<Vec<SeedRect>>,
    pub threshold: u32,
    pub mode: AutoMode,
    pub return_type: ReturnType,
}

impl PredictRequest {
    /// Package a drawn geometry as an oracle seed.
    ///
    /// Points become a positive click, rectangles a box prompt, and polygons
    /// their bounding box plus every vertex as a positive click.
    pub fn from_seed(
        task_id: impl Into<String>,
        image: impl Into<String>,
        seed: &Geometry,
        threshold: u32,
        mode: AutoMode,
        return_type: ReturnType,
    ) -> Self {
        let (points, rects) = match seed {
            Geometry::Point { x, y } => (Some(vec![SeedPoint { x: *x, y: *y }]), None),
            Geometry::Rectangle { .. } => (None, Some(vec![SeedRect::from(seed.bounding_rect())])),
            Geometry::Polygon { .. } => {
                let vertices = seed.vertices().into_iter().map(SeedPoint::from).collect();
                (Some(vertices), Some(vec![SeedRect::from(seed.bounding_rect())]))
            }
        };
        let point_labels = points
            .as_ref()
            .map(|p: &Vec<SeedPoint>| vec![POSITIVE_POINT; p.len()]);
        Self {
            task_id: task_id.into(),
            image: image.into(),
            points,
            point_labels,
            rects,
            threshold,
            mode,
            return_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default)]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedPolygon {
    pub points: Vec<SeedPoint>,
    #[serde(default)]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictResponse {
    pub status: bool,
    #[serde(default)]
    pub rects: Option<Vec<PredictedRect>>,
    #[serde(default)]
    pub polygons: Option<Vec<PredictedPolygon>>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl PredictResponse {
    pub fn from_json(json: &str) -> Result<Self, OracleError> {
        serde_json::from_str(json).map_err(|e| OracleError::malformed(e.to_string()))
    }

    pub fn with_rects(rects: Vec<PredictedRect>) -> Self {
        Self {
            status: true,
            rects: Some(rects),
            ..Self::default()
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            status: false,
            msg: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Convert the response into results labeled with `labels`.
    ///
    /// A `status = false` response is an error. Polygons with fewer than three
    /// points are skipped.
    pub fn into_results(
        self,
        origin: &str,
        labels: &[Label],
    ) -> Result<Vec<AnnotationResult>, OracleError> {
        if !self.status {
            return Err(OracleError::rejected(
                self.msg.unwrap_or_else(|| "no message".to_string()),
            ));
        }

        let rects = self.rects.unwrap_or_default().into_iter().map(|r| {
            let geometry = Geometry::rectangle(Rect::new(r.x, r.y, r.w, r.h));
            AnnotationResult::new(geometry, origin, labels.to_vec()).with_score(r.score.unwrap_or(1.0))
        });

        let polygons = self
            .polygons
            .unwrap_or_default()
            .into_iter()
            .filter(|p| {
                let ok = p.points.len() >= 3;
                if !ok {
                    log::warn!("Oracle returned a polygon with {} points, skipped", p.points.len());
                }
                ok
            })
            .map(|p| {
                let points: Vec<Point> = p.points.iter().map(|s| Point::new(s.x, s.y)).collect();
                AnnotationResult::new(Geometry::polygon(&points, true), origin, labels.to_vec())
                    .with_score(p.score.unwrap_or(1.0))
            });

        Ok(rects.chain(polygons).collect())
    }
}

/// External segmentation service.
pub trait Oracle: Send + Sync {
    fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, OracleError>;
}
