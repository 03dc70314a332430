//! Error taxonomy.
//!
//! Each layer has its own error enum. `ZlabelError` aggregates them for callers
//! that drive the whole engine (the workspace and the binary).

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::undo::UndoError;

/// Invalid user action. Surfaced as a blocking warning, the gesture is aborted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UserInputError {
    #[error("Please select a label before drawing")]
    NoLabel,

    #[error("No task is open")]
    NoTask,

    #[error("The current task has no image loaded")]
    NoImage,

    /// Point seeds only make sense when an oracle segments around them.
    #[error("Point annotations need SAM or CV assistance; enable one of them first")]
    PointNeedsOracle,

    #[error("A polygon needs at least {min} vertices, got {vertices}")]
    PolygonTooSmall { vertices: usize, min: usize },

    #[error("Nothing is selected")]
    NothingSelected,

    #[error("Merging needs at least 2 selected results, got {selected}")]
    MergeNeedsTwo { selected: usize },
}

/// Failure of the external segmentation oracle. Surfaced as a toast.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Oracle transport error: {message}")]
    Transport { message: String },

    #[error("Oracle did not answer within {seconds}s")]
    Timeout { seconds: u64 },

    /// The oracle answered with `status = false`.
    #[error("Oracle rejected the request: {message}")]
    Rejected { message: String },

    #[error("Malformed oracle response: {message}")]
    Malformed { message: String },

    #[error("Oracle worker pool is not running")]
    Unavailable,
}

impl OracleError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Violation of a data model invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("No {kind} with id '{key}'")]
    KeyNotFound { kind: &'static str, key: String },

    #[error("A {kind} with id '{key}' already exists")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("Task '{task}' has no annotation attached")]
    AnnotationNotLoaded { task: String },
}

impl ModelError {
    pub fn key_not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn duplicate_key(kind: &'static str, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            kind,
            key: key.into(),
        }
    }
}

/// Errors from saving or loading projects, annotations and images.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("File not found: {path:?}")]
    NotFound { path: PathBuf },

    #[error("Remote store error: {message}")]
    Remote { message: String },
}

impl StorageError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }
}

/// Top-level error for engine operations.
#[derive(Error, Debug)]
pub enum ZlabelError {
    #[error(transparent)]
    UserInput(#[from] UserInputError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Undo(#[from] UndoError),
}

impl From<std::io::Error> for ZlabelError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(StorageError::Io(e))
    }
}

impl From<serde_json::Error> for ZlabelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(StorageError::Json(e))
    }
}

pub type ZlabelResult<T> = Result<T, ZlabelError>;
