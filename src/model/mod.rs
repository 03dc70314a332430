//! Annotation data model: labels, results, annotations, tasks and projects.

mod annotation;
mod label;
mod project;
mod result;

pub use annotation::{ANNOTATION_SUFFIX, Annotation};
pub use label::{LABEL_ID_LEN, Label, UNKNOWN_LABEL, label_id_for};
pub use project::{PROJECT_SUFFIX, PROJECT_VERSION, Project, Task, User};
pub use result::{
    AnnotationResult, Geometry, GeometryKind, MANUAL_ORIGIN, RESULT_ID_LEN, new_result_id,
};
