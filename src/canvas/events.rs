//! Events the canvas emits for the workspace to act on.

use super::DrawMode;
use crate::error::UserInputError;
use crate::model::Geometry;
use crate::shape::ShapeState;

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// A creation gesture finished. The drawn geometry is not kept on the
    /// canvas; it reappears once the model holds a result for it.
    ShapeCreated { mode: DrawMode, geometry: Geometry },
    /// A creation gesture was abandoned.
    CreationCanceled,
    /// A creation gesture was refused (e.g. a polygon with too few vertices).
    CreationRejected(UserInputError),
    /// First movement of a handle drag, body drag or vertex insertion.
    StateChangeStarted { before: ShapeState },
    StateChangeUpdated { state: ShapeState },
    StateChangeFinished { before: ShapeState, after: ShapeState },
    /// Shapes removed from the canvas in one batch (Delete key).
    ShapesRemoved { ids: Vec<String> },
    SelectionChanged { ids: Vec<String> },
}

impl CanvasEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CanvasEvent::ShapeCreated { .. } => "ShapeCreated",
            CanvasEvent::CreationCanceled => "CreationCanceled",
            CanvasEvent::CreationRejected(_) => "CreationRejected",
            CanvasEvent::StateChangeStarted { .. } => "StateChangeStarted",
            CanvasEvent::StateChangeUpdated { .. } => "StateChangeUpdated",
            CanvasEvent::StateChangeFinished { .. } => "StateChangeFinished",
            CanvasEvent::ShapesRemoved { .. } => "ShapesRemoved",
            CanvasEvent::SelectionChanged { .. } => "SelectionChanged",
        }
    }
}
