//! Per-image annotation: the ordered result map and its key cursor.

use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::result::AnnotationResult;
use crate::error::{ModelError, StorageError};

/// File suffix of serialized annotations.
pub const ANNOTATION_SUFFIX: &str = "zlabel";

/// All results drawn on one image.
///
/// `results`, `key_result` and `updated_at` are private so every mutation goes
/// through `add_result`, `remove_result` and `modify_result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    pub image_path: String,
    #[serde(default)]
    pub ground_truth: bool,
    #[serde(default)]
    pub original_width: u32,
    #[serde(default)]
    pub original_height: u32,
    #[serde(default)]
    pub image_rotation: f32,
    #[serde(default)]
    results: IndexMap<String, AnnotationResult>,
    #[serde(default)]
    key_result: Option<String>,
}

impl Annotation {
    pub fn new(id: impl Into<String>, image_path: impl Into<String>, user: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_by: user.to_string(),
            updated_by: user.to_string(),
            created_at: now,
            updated_at: now,
            image_path: image_path.into(),
            ground_truth: false,
            original_width: 0,
            original_height: 0,
            image_rotation: 0.0,
            results: IndexMap::new(),
            key_result: None,
        }
    }

    /// File name used when persisting this annotation.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, ANNOTATION_SUFFIX)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_image_size(&mut self, width: u32, height: u32) {
        self.original_width = width;
        self.original_height = height;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Results in insertion order.
    pub fn results(&self) -> impl Iterator<Item = &AnnotationResult> {
        self.results.values()
    }

    pub fn result_ids(&self) -> Vec<String> {
        self.results.keys().cloned().collect()
    }

    pub fn result(&self, id: &str) -> Option<&AnnotationResult> {
        self.results.get(id)
    }

    pub fn contains_result(&self, id: &str) -> bool {
        self.results.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Append a result and make it the current one.
    pub fn add_result(&mut self, result: AnnotationResult) -> Result<(), ModelError> {
        if self.results.contains_key(&result.id) {
            return Err(ModelError::duplicate_key("result", result.id));
        }
        let id = result.id.clone();
        self.results.insert(id.clone(), result);
        self.key_result = Some(id);
        self.touch();
        Ok(())
    }

    /// Remove a result.
    ///
    /// When the removed result was the current one, the cursor moves to the
    /// previous result (or the new first one), or to `None` when no results
    /// remain. Removing any other result leaves the cursor unchanged.
    pub fn remove_result(&mut self, id: &str) -> Result<AnnotationResult, ModelError> {
        let (index, _, removed) = self
            .results
            .shift_remove_full(id)
            .ok_or_else(|| ModelError::key_not_found("result", id))?;

        if self.key_result.as_deref() == Some(id) {
            self.key_result = if self.results.is_empty() {
                None
            } else {
                let neighbour = index.saturating_sub(1).min(self.results.len() - 1);
                self.results.get_index(neighbour).map(|(k, _)| k.clone())
            };
        }
        self.touch();
        Ok(removed)
    }

    /// Replace an existing result (matched by id). The cursor is unchanged.
    pub fn modify_result(&mut self, result: AnnotationResult) -> Result<AnnotationResult, ModelError> {
        let slot = self
            .results
            .get_mut(&result.id)
            .ok_or_else(|| ModelError::key_not_found("result", result.id.clone()))?;
        let old = std::mem::replace(slot, result);
        self.touch();
        Ok(old)
    }

    // ========================================================================
    // Cursor
    // ========================================================================

    pub fn key_result(&self) -> Option<&str> {
        self.key_result.as_deref()
    }

    /// Set the current result. Fails without mutation if the id is unknown.
    pub fn set_key_result(&mut self, id: Option<&str>) -> Result<(), ModelError> {
        match id {
            Some(id) if !self.results.contains_key(id) => {
                Err(ModelError::key_not_found("result", id))
            }
            _ => {
                self.key_result = id.map(str::to_string);
                Ok(())
            }
        }
    }

    pub fn crt_result(&self) -> Option<&AnnotationResult> {
        self.key_result.as_deref().and_then(|id| self.results.get(id))
    }

    // ========================================================================
    // Label cascade
    // ========================================================================

    /// Update the copy of a label carried by every result. Returns the number of
    /// results touched. Geometry is never changed.
    pub fn update_label(&mut self, label_id: &str, name: &str, color: &str) -> usize {
        let mut touched = 0;
        for result in self.results.values_mut() {
            for label in result.labels.iter_mut().filter(|l| l.id == label_id) {
                label.name = name.to_string();
                label.color = color.to_string();
                touched += 1;
            }
        }
        if touched > 0 {
            self.touch();
        }
        touched
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let mut anno: Self = serde_json::from_str(json)?;
        if let Some(key) = anno.key_result.as_deref() {
            if !anno.results.contains_key(key) {
                log::warn!("Annotation {}: dangling key_result '{}' dropped", anno.id, key);
                anno.key_result = None;
            }
        }
        Ok(anno)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::debug!("Saved annotation {} to {:?}", self.id, path);
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Err(StorageError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
