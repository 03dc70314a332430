//! Project, task and user data model.
//!
//! A project owns the label set and the task list. Each task points at one
//! image and, once loaded, carries its `Annotation`. Annotations are stored in
//! their own files and are never serialized with the task list.
//!
//! # File Format
//!
//! Projects are stored as JSON files with the `.zproj` extension:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "id": "…",
//!   "name": "streets",
//!   "key_task": "anno-1",
//!   "key_label": "3a1f0c2d9",
//!   "labels": { "3a1f0c2d9": { "id": "3a1f0c2d9", "name": "car", "color": "#f47b90" } },
//!   "tasks": { "anno-1": { "id": "t1", "anno_id": "anno-1", "filename": "a.png", … } }
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::annotation::Annotation;
use super::label::Label;
use crate::color_utils::{normalize_hex, palette_color};
use crate::error::{ModelError, StorageError};

/// Current project file format version.
pub const PROJECT_VERSION: &str = "1.0";

/// File suffix of serialized projects.
pub const PROJECT_SUFFIX: &str = "zproj";

/// The person producing annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// User for offline sessions without a server account.
    pub fn default_user() -> Self {
        Self {
            id: "local".to_string(),
            name: "local".to_string(),
            email: String::new(),
        }
    }
}

/// One image to annotate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub anno_id: String,
    pub filename: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub finished: bool,
    /// Attached lazily once the annotation is fetched or loaded.
    #[serde(skip)]
    pub anno: Option<Annotation>,
}

impl Task {
    pub fn new(id: impl Into<String>, anno_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            anno_id: anno_id.into(),
            filename: filename.into(),
            labels: Vec::new(),
            finished: false,
            anno: None,
        }
    }
}

/// Pick the cursor after removing the entry at `index` from `map`.
fn neighbour_key<V>(map: &IndexMap<String, V>, index: usize) -> Option<String> {
    if map.is_empty() {
        return None;
    }
    let neighbour = index.saturating_sub(1).min(map.len() - 1);
    map.get_index(neighbour).map(|(k, _)| k.clone())
}

/// Labels, tasks and the cursors into them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Format version for forward compatibility.
    pub version: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    key_task: Option<String>,
    #[serde(default)]
    key_label: Option<String>,
    #[serde(default)]
    labels: IndexMap<String, Label>,
    /// Keyed by `anno_id`.
    #[serde(default)]
    tasks: IndexMap<String, Task>,
    /// Scratch annotation used when no task is open.
    #[serde(skip)]
    pub draft: Option<Annotation>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            key_task: None,
            key_label: None,
            labels: IndexMap::new(),
            tasks: IndexMap::new(),
            draft: None,
        }
    }

    /// File name used when persisting this project.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, PROJECT_SUFFIX)
    }

    // ========================================================================
    // Labels
    // ========================================================================

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }

    pub fn label(&self, id: &str) -> Option<&Label> {
        self.labels.get(id)
    }

    pub fn label_by_name(&self, name: &str) -> Option<&Label> {
        self.labels.values().find(|l| l.name == name)
    }

    /// Add a label, or update the color of the label with the same name.
    ///
    /// Returns the label id. The first label added becomes the current one.
    pub fn add_label(&mut self, name: &str, color: &str) -> String {
        let label = Label::new(name, color);
        let id = label.id.clone();
        match self.labels.get_mut(&id) {
            Some(existing) => {
                log::debug!("Label '{}' exists, updating color to {}", name, label.color);
                existing.color = label.color;
            }
            None => {
                log::info!("Added label '{}' ({})", name, id);
                self.labels.insert(id.clone(), label);
            }
        }
        if self.key_label.is_none() {
            self.key_label = Some(id.clone());
        }
        id
    }

    /// Add a label with the next palette color.
    pub fn add_label_auto_color(&mut self, name: &str) -> String {
        let color = palette_color(self.labels.len());
        self.add_label(name, &color)
    }

    pub fn remove_label(&mut self, id: &str) -> Result<Label, ModelError> {
        let (index, _, removed) = self
            .labels
            .shift_remove_full(id)
            .ok_or_else(|| ModelError::key_not_found("label", id))?;
        if self.key_label.as_deref() == Some(id) {
            self.key_label = neighbour_key(&self.labels, index);
        }
        log::info!("Removed label '{}'", removed.name);
        Ok(removed)
    }

    /// Rename a label. The id is kept and loaded results follow the new name.
    pub fn rename_label(&mut self, id: &str, name: &str) -> Result<(), ModelError> {
        let label = self
            .labels
            .get_mut(id)
            .ok_or_else(|| ModelError::key_not_found("label", id))?;
        label.name = name.to_string();
        let (name, color) = (label.name.clone(), label.color.clone());
        self.cascade_label(id, &name, &color);
        Ok(())
    }

    /// Recolor a label and every loaded result that references it.
    ///
    /// Returns the number of results touched.
    pub fn set_label_color(&mut self, id: &str, color: &str) -> Result<usize, ModelError> {
        let label = self
            .labels
            .get_mut(id)
            .ok_or_else(|| ModelError::key_not_found("label", id))?;
        label.color = normalize_hex(color);
        let (name, color) = (label.name.clone(), label.color.clone());
        Ok(self.cascade_label(id, &name, &color))
    }

    fn cascade_label(&mut self, id: &str, name: &str, color: &str) -> usize {
        let attached = self.tasks.values_mut().filter_map(|t| t.anno.as_mut());
        attached
            .chain(self.draft.as_mut())
            .map(|anno| anno.update_label(id, name, color))
            .sum()
    }

    pub fn key_label(&self) -> Option<&str> {
        self.key_label.as_deref()
    }

    pub fn set_key_label(&mut self, id: Option<&str>) -> Result<(), ModelError> {
        match id {
            Some(id) if !self.labels.contains_key(id) => Err(ModelError::key_not_found("label", id)),
            _ => {
                self.key_label = id.map(str::to_string);
                Ok(())
            }
        }
    }

    pub fn crt_label(&self) -> Option<&Label> {
        self.key_label.as_deref().and_then(|id| self.labels.get(id))
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task(&self, anno_id: &str) -> Option<&Task> {
        self.tasks.get(anno_id)
    }

    pub fn task_mut(&mut self, anno_id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(anno_id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Add a task. The first task added becomes the current one.
    pub fn add_task(&mut self, task: Task) -> Result<(), ModelError> {
        if self.tasks.contains_key(&task.anno_id) {
            return Err(ModelError::duplicate_key("task", task.anno_id));
        }
        let key = task.anno_id.clone();
        self.tasks.insert(key.clone(), task);
        if self.key_task.is_none() {
            self.key_task = Some(key);
        }
        Ok(())
    }

    pub fn remove_task(&mut self, anno_id: &str) -> Result<Task, ModelError> {
        let (index, _, removed) = self
            .tasks
            .shift_remove_full(anno_id)
            .ok_or_else(|| ModelError::key_not_found("task", anno_id))?;
        if self.key_task.as_deref() == Some(anno_id) {
            self.key_task = neighbour_key(&self.tasks, index);
        }
        Ok(removed)
    }

    /// Attach a loaded annotation to its task.
    pub fn attach_annotation(&mut self, anno: Annotation) -> Result<(), ModelError> {
        let task = self
            .tasks
            .get_mut(&anno.id)
            .ok_or_else(|| ModelError::key_not_found("task", anno.id.clone()))?;
        task.anno = Some(anno);
        Ok(())
    }

    pub fn key_task(&self) -> Option<&str> {
        self.key_task.as_deref()
    }

    pub fn set_key_task(&mut self, anno_id: Option<&str>) -> Result<(), ModelError> {
        match anno_id {
            Some(id) if !self.tasks.contains_key(id) => Err(ModelError::key_not_found("task", id)),
            _ => {
                self.key_task = anno_id.map(str::to_string);
                Ok(())
            }
        }
    }

    /// Point the task cursor at the first task (or nothing).
    pub fn reset_task_key(&mut self) {
        self.key_task = self.tasks.keys().next().cloned();
    }

    pub fn crt_task(&self) -> Option<&Task> {
        self.key_task.as_deref().and_then(|id| self.tasks.get(id))
    }

    pub fn crt_task_mut(&mut self) -> Option<&mut Task> {
        match self.key_task.as_deref() {
            Some(id) => self.tasks.get_mut(id),
            None => None,
        }
    }

    /// Annotation being edited: the current task's, or the draft when no task is open.
    pub fn crt_anno(&self) -> Option<&Annotation> {
        match self.crt_task() {
            Some(task) => task.anno.as_ref(),
            None => self.draft.as_ref(),
        }
    }

    pub fn crt_anno_mut(&mut self) -> Option<&mut Annotation> {
        if self.key_task.is_some() {
            self.crt_task_mut().and_then(|t| t.anno.as_mut())
        } else {
            self.draft.as_mut()
        }
    }

    pub fn crt_result(&self) -> Option<&super::result::AnnotationResult> {
        self.crt_anno().and_then(Annotation::crt_result)
    }

    pub fn task_ids_by_state(&self, finished: bool) -> Vec<String> {
        self.tasks
            .values()
            .filter(|t| t.finished == finished)
            .map(|t| t.anno_id.clone())
            .collect()
    }

    fn key_task_index(&self) -> Option<usize> {
        self.key_task
            .as_deref()
            .and_then(|id| self.tasks.get_index_of(id))
    }

    /// Task after the current one, if any.
    pub fn next_task_id(&self) -> Option<String> {
        let next = match self.key_task_index() {
            Some(i) => i + 1,
            None => 0,
        };
        self.tasks.get_index(next).map(|(k, _)| k.clone())
    }

    /// Task before the current one, if any.
    pub fn prev_task_id(&self) -> Option<String> {
        let prev = self.key_task_index()?.checked_sub(1)?;
        self.tasks.get_index(prev).map(|(k, _)| k.clone())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let mut project: Self = serde_json::from_str(json)?;

        if project.version != PROJECT_VERSION {
            log::warn!(
                "Project version mismatch: expected {}, got {}",
                PROJECT_VERSION,
                project.version
            );
        }
        if project.key_task.as_deref().is_some_and(|k| !project.tasks.contains_key(k)) {
            log::warn!("Project {}: dangling key_task reset", project.name);
            project.reset_task_key();
        }
        if project.key_label.as_deref().is_some_and(|k| !project.labels.contains_key(k)) {
            log::warn!("Project {}: dangling key_label reset", project.name);
            project.key_label = project.labels.keys().next().cloned();
        }

        Ok(project)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved project '{}' to {:?}", self.name, path);
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

impl std::fmt::Display for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Project '{}' ({} tasks, {} finished, {} labels)",
            self.name,
            self.tasks.len(),
            self.task_ids_by_state(true).len(),
            self.labels.len()
        )
    }
}
