//! zlabel - Interactive Image Annotation Engine
//!
//! Headless core of an image labeling tool: an editable canvas of points,
//! rectangles and polygons, an undoable annotation model, and assisted drawing
//! through an external SAM/CV segmentation oracle. A GUI drives it by feeding
//! pointer and keyboard input to a [`Workspace`] and rendering its canvas.

pub mod canvas;
pub mod color_utils;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod notify;
pub mod oracle;
pub mod remote;
pub mod shape;
pub mod undo;
pub mod workspace;

pub use config::AppConfig;
pub use error::{ZlabelError, ZlabelResult};
pub use workspace::Workspace;
