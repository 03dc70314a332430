//! The single owner of every mutable store.
//!
//! `Workspace` drains canvas events, turns them into undo commands applied to
//! the current annotation, dispatches oracle predictions, and re-syncs the
//! canvas from the model afterwards. Background work (predictions, image
//! fetches) only lands when `poll` is called.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::canvas::{Canvas, CanvasEvent, DrawMode, Key, Modifiers, MouseButton, StatusMode};
use crate::config::AppConfig;
use crate::error::{ModelError, OracleError, StorageError, UserInputError, ZlabelError, ZlabelResult};
use crate::geometry::{Point, Rect};
use crate::model::{
    ANNOTATION_SUFFIX, Annotation, AnnotationResult, Geometry, Label, MANUAL_ORIGIN, Project, Task,
    User,
};
use crate::notify::{Notification, NotificationQueue};
use crate::oracle::{AutoMode, Oracle, OraclePool, PredictOutcome, PredictRequest, ReturnType};
use crate::remote::{FetchStatus, FetchType, ImageCache, ImageEvent, LoadedImage, RemoteStore};
use crate::shape::ShapeState;
use crate::undo::{ResultCommand, ResultSink, UndoConfig, UndoStack, redo_command, undo_command};

/// Id reported for the draft annotation in errors.
const DRAFT_ID: &str = "draft";

/// Log a model/view desynchronisation and hand the error back.
fn desync(context: &str, e: ModelError) -> ModelError {
    log::error!("Model out of sync ({}): {}", context, e);
    e
}

fn crt_anno_mut(project: &mut Project) -> Result<&mut Annotation, ModelError> {
    let task = project.key_task().unwrap_or(DRAFT_ID).to_string();
    project
        .crt_anno_mut()
        .ok_or(ModelError::AnnotationNotLoaded { task })
}

// ============================================================================
// Result sink
// ============================================================================

/// Applies replayed commands to the current annotation and re-syncs the canvas.
///
/// The canvas is re-synced even when the model rejects part of a batch, so the
/// two never disagree about what exists.
struct ModelSink<'a> {
    project: &'a mut Project,
    canvas: &'a mut Canvas,
}

impl ResultSink for ModelSink<'_> {
    fn add_results(&mut self, results: &[AnnotationResult]) -> Result<(), ModelError> {
        let anno = crt_anno_mut(self.project)?;
        let outcome = results.iter().try_for_each(|r| anno.add_result(r.clone()));
        self.canvas.sync_results(anno.results());
        outcome
    }

    fn remove_results(&mut self, results: &[AnnotationResult]) -> Result<(), ModelError> {
        let anno = crt_anno_mut(self.project)?;
        let outcome = results
            .iter()
            .try_for_each(|r| anno.remove_result(&r.id).map(|_| ()));
        self.canvas.sync_results(anno.results());
        outcome
    }

    fn modify_results(
        &mut self,
        results: &[AnnotationResult],
        update_canvas: bool,
    ) -> Result<(), ModelError> {
        let anno = crt_anno_mut(self.project)?;
        let outcome = results
            .iter()
            .try_for_each(|r| anno.modify_result(r.clone()).map(|_| ()));
        if update_canvas || outcome.is_err() {
            self.canvas.sync_results(anno.results());
        }
        outcome
    }
}

// ============================================================================
// Workspace
// ============================================================================

pub struct Workspace {
    config: AppConfig,
    user: User,
    project: Project,
    canvas: Canvas,
    undo: UndoStack,
    auto_mode: AutoMode,
    threshold: u32,
    return_type: ReturnType,
    oracle: Option<OraclePool>,
    /// Labels captured when a prediction was requested, by job id.
    pending_labels: HashMap<u64, Vec<Label>>,
    remote: Option<Arc<dyn RemoteStore>>,
    images: Option<ImageCache>,
    notifications: NotificationQueue,
}

impl Workspace {
    pub fn new(config: AppConfig) -> Self {
        let undo = UndoStack::with_config(UndoConfig {
            max_history: config.undo.max_history,
        });
        Self {
            user: User::default_user(),
            project: Project::new(config.project.project_name.clone()),
            canvas: Canvas::new(config.canvas.clone()),
            undo,
            auto_mode: config.oracle.auto_mode(),
            threshold: config.oracle.threshold,
            return_type: config.oracle.return_type,
            oracle: None,
            pending_labels: HashMap::new(),
            remote: None,
            images: None,
            notifications: NotificationQueue::new(),
            config,
        }
    }

    /// Start prediction workers calling `oracle`.
    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Result<Self, OracleError> {
        self.oracle = Some(OraclePool::spawn(oracle, self.config.oracle.workers)?);
        Ok(self)
    }

    pub fn with_remote(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.images = Some(ImageCache::new(Arc::clone(&store)));
        self.remote = Some(store);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Direct canvas access. Call `process_canvas_events` after feeding input.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn images(&self) -> Option<&ImageCache> {
        self.images.as_ref()
    }

    /// Notifications queued since the last call, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    pub fn current_annotation(&self) -> Option<&Annotation> {
        self.project.crt_anno()
    }

    pub fn pending_predictions(&self) -> usize {
        self.oracle.as_ref().map_or(0, OraclePool::pending_count)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub fn auto_mode(&self) -> AutoMode {
        self.auto_mode
    }

    pub fn set_auto_flags(&mut self, sam: bool, cv: bool) {
        let mode = AutoMode::from_flags(sam, cv);
        if mode != self.auto_mode {
            log::info!("Auto mode: {} -> {}", self.auto_mode.name(), mode.name());
            self.auto_mode = mode;
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: u32) {
        self.threshold = threshold;
    }

    pub fn set_return_type(&mut self, return_type: ReturnType) {
        self.return_type = return_type;
    }

    pub fn set_status_mode(&mut self, mode: StatusMode) -> ZlabelResult<()> {
        self.canvas.set_status_mode(mode);
        self.process_canvas_events()
    }

    pub fn set_draw_mode(&mut self, mode: DrawMode) -> ZlabelResult<()> {
        self.canvas.set_draw_mode(mode);
        self.process_canvas_events()
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn mouse_press(&mut self, pos: Point, button: MouseButton, modifiers: Modifiers) -> ZlabelResult<()> {
        self.canvas.on_mouse_press(pos, button, modifiers);
        self.process_canvas_events()
    }

    pub fn mouse_move(&mut self, pos: Point) -> ZlabelResult<()> {
        self.canvas.on_mouse_move(pos);
        self.process_canvas_events()
    }

    pub fn mouse_release(&mut self, pos: Point, button: MouseButton) -> ZlabelResult<()> {
        self.canvas.on_mouse_release(pos, button);
        self.process_canvas_events()
    }

    pub fn double_click(&mut self, pos: Point, button: MouseButton) -> ZlabelResult<()> {
        self.canvas.on_double_click(pos, button);
        self.process_canvas_events()
    }

    pub fn key_press(&mut self, key: Key, modifiers: Modifiers) -> ZlabelResult<()> {
        self.canvas.on_key_press(key, modifiers);
        self.process_canvas_events()
    }

    /// Finalize the polygon being drawn. Too few vertices is reported as a warning.
    pub fn close_polygon(&mut self) -> ZlabelResult<()> {
        if let Err(e) = self.canvas.close_polygon() {
            log::warn!("{}", e);
            self.notifications.push(Notification::from(&e));
        }
        self.process_canvas_events()
    }

    pub fn delete_selected(&mut self) -> ZlabelResult<()> {
        self.canvas.delete_selected();
        self.process_canvas_events()
    }

    /// Act on every event the canvas emitted.
    ///
    /// User-input and oracle failures become notifications. Model errors are
    /// returned after all events have been handled.
    pub fn process_canvas_events(&mut self) -> ZlabelResult<()> {
        let mut first_error = None;
        for event in self.canvas.take_events() {
            if let Err(e) = self.handle_event(event) {
                if let Some(e) = self.report(e) {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Turn user-facing errors into notifications; return the rest.
    fn report(&mut self, e: ZlabelError) -> Option<ZlabelError> {
        match &e {
            ZlabelError::UserInput(u) => {
                log::warn!("Rejected: {}", u);
                self.notifications.push(Notification::from(u));
                None
            }
            ZlabelError::Oracle(o) => {
                self.notifications.push(Notification::from(o));
                None
            }
            ZlabelError::Storage(s) => {
                self.notifications.push(Notification::from(s));
                Some(e)
            }
            _ => Some(e),
        }
    }

    fn handle_event(&mut self, event: CanvasEvent) -> ZlabelResult<()> {
        match event {
            CanvasEvent::ShapeCreated { mode, geometry } => self.on_shape_created(mode, geometry),
            CanvasEvent::CreationRejected(e) => Err(e.into()),
            CanvasEvent::StateChangeFinished { after, .. } => self.on_state_finished(after),
            CanvasEvent::ShapesRemoved { ids } => self.on_shapes_removed(&ids),
            CanvasEvent::SelectionChanged { ids } => self.on_selection_changed(&ids),
            CanvasEvent::CreationCanceled
            | CanvasEvent::StateChangeStarted { .. }
            | CanvasEvent::StateChangeUpdated { .. } => Ok(()),
        }
    }

    // ========================================================================
    // Event handlers
    // ========================================================================

    /// Annotation id and image name of what is being edited.
    fn current_target(&self) -> Result<(String, String), UserInputError> {
        match self.project.crt_anno() {
            Some(anno) => Ok((anno.id.clone(), anno.image_path.clone())),
            None if self.project.crt_task().is_some() => Err(UserInputError::NoImage),
            None => Err(UserInputError::NoTask),
        }
    }

    fn on_shape_created(&mut self, mode: DrawMode, geometry: Geometry) -> ZlabelResult<()> {
        let (task_id, image) = self.current_target()?;
        let label = self
            .project
            .crt_label()
            .cloned()
            .ok_or(UserInputError::NoLabel)?;

        if !self.auto_mode.uses_oracle() {
            if mode == DrawMode::Point {
                return Err(UserInputError::PointNeedsOracle.into());
            }
            let result = AnnotationResult::manual(geometry, label);
            self.execute(ResultCommand::add(vec![result])?)?;
            return Ok(());
        }

        let pool = self.oracle.as_mut().ok_or(OracleError::Unavailable)?;
        let request = PredictRequest::from_seed(
            task_id,
            image,
            &geometry,
            self.threshold,
            self.auto_mode,
            self.return_type,
        );
        let job = pool.submit(request)?;
        self.pending_labels.insert(job, vec![label]);
        log::info!(
            "Predict job {} submitted ({} {})",
            job,
            self.auto_mode.name(),
            mode.name()
        );
        Ok(())
    }

    fn on_state_finished(&mut self, after: ShapeState) -> ZlabelResult<()> {
        let anno = self.project.crt_anno().ok_or(UserInputError::NoTask)?;
        let old = anno
            .result(&after.id)
            .cloned()
            .ok_or_else(|| desync("edit finished", ModelError::key_not_found("result", &after.id)))?;

        let mut new = old.clone();
        new.geometry = after.geometry;
        if old.equal_v(&new) {
            log::debug!("Result {} unchanged, nothing recorded", old.id);
            return Ok(());
        }
        self.execute(ResultCommand::modify_no_update(vec![new], vec![old])?)?;
        Ok(())
    }

    fn on_shapes_removed(&mut self, ids: &[String]) -> ZlabelResult<()> {
        let anno = self.project.crt_anno().ok_or(UserInputError::NoTask)?;
        let results: Vec<AnnotationResult> = ids.iter().filter_map(|id| anno.result(id).cloned()).collect();
        if results.len() != ids.len() {
            log::error!(
                "Model out of sync (delete): {} of {} shapes have no result",
                ids.len() - results.len(),
                ids.len()
            );
        }
        if results.is_empty() {
            return Ok(());
        }
        self.execute(ResultCommand::remove(results)?)?;
        Ok(())
    }

    fn on_selection_changed(&mut self, ids: &[String]) -> ZlabelResult<()> {
        let Some(anno) = self.project.crt_anno_mut() else {
            return Ok(());
        };
        if let Some(last) = ids.last().filter(|id| anno.contains_result(id)) {
            anno.set_key_result(Some(last.as_str()))?;
        }
        Ok(())
    }

    /// Apply `command` and record it.
    fn execute(&mut self, command: ResultCommand) -> Result<(), ModelError> {
        let mut sink = ModelSink {
            project: &mut self.project,
            canvas: &mut self.canvas,
        };
        command
            .redo(&mut sink)
            .map_err(|e| desync(&command.description(), e))?;
        log::info!("{}", command.description());
        self.undo.push(command);
        Ok(())
    }

    // ========================================================================
    // Undo / Redo / Merge
    // ========================================================================

    /// Undo the newest command. Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> ZlabelResult<bool> {
        let mut sink = ModelSink {
            project: &mut self.project,
            canvas: &mut self.canvas,
        };
        let undone = undo_command(&mut self.undo, &mut sink).map_err(|e| desync("undo", e))?;
        self.process_canvas_events()?;
        Ok(undone)
    }

    /// Redo the newest undone command. Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> ZlabelResult<bool> {
        let mut sink = ModelSink {
            project: &mut self.project,
            canvas: &mut self.canvas,
        };
        let redone = redo_command(&mut self.undo, &mut sink).map_err(|e| desync("redo", e))?;
        self.process_canvas_events()?;
        Ok(redone)
    }

    /// Replace the selected results with one rectangle spanning all of them.
    pub fn merge_selected(&mut self) -> ZlabelResult<()> {
        let ids = self.canvas.selected_ids();
        if ids.len() < 2 {
            let e = UserInputError::MergeNeedsTwo { selected: ids.len() };
            self.notifications.push(Notification::from(&e));
            return Err(e.into());
        }
        let anno = self.project.crt_anno().ok_or(UserInputError::NoTask)?;
        let sources = ids
            .iter()
            .map(|id| {
                anno.result(id)
                    .cloned()
                    .ok_or_else(|| desync("merge", ModelError::key_not_found("result", id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bounds = sources
            .iter()
            .map(AnnotationResult::bounding_rect)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        let labels = sources[0].labels.clone();
        let merged = AnnotationResult::new(Geometry::rectangle(bounds), MANUAL_ORIGIN, labels);
        self.execute(ResultCommand::merge(vec![merged], sources)?)?;
        Ok(())
    }

    // ========================================================================
    // Predictions
    // ========================================================================

    /// Apply finished background work. Returns the number of results added.
    ///
    /// Predictions stay queued while a pointer gesture is in progress.
    pub fn poll(&mut self) -> ZlabelResult<usize> {
        self.poll_images();
        if !self.canvas.is_idle() {
            return Ok(0);
        }
        let mut added = 0;
        while let Some(outcome) = self.oracle.as_mut().and_then(|pool| pool.try_recv()) {
            added += self.apply_prediction(outcome)?;
        }
        Ok(added)
    }

    /// Block until every submitted prediction is applied or `timeout` passes.
    pub fn wait_for_predictions(&mut self, timeout: Duration) -> ZlabelResult<usize> {
        if !self.canvas.is_idle() {
            log::debug!("Gesture in progress, {} predictions deferred", self.pending_predictions());
            return Ok(0);
        }
        let deadline = Instant::now() + timeout;
        let mut added = 0;
        loop {
            let Some(pool) = self.oracle.as_mut() else {
                break;
            };
            if pool.pending_count() == 0 {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(outcome) = pool.recv_timeout(remaining) else {
                log::warn!("Gave up waiting for {} predictions", pool.pending_count());
                break;
            };
            added += self.apply_prediction(outcome)?;
        }
        Ok(added)
    }

    fn apply_prediction(&mut self, outcome: PredictOutcome) -> ZlabelResult<usize> {
        let labels = self.pending_labels.remove(&outcome.job_id).unwrap_or_default();
        let current = self.project.crt_anno().map(|a| a.id.as_str());
        if current != Some(outcome.request.task_id.as_str()) {
            log::info!(
                "Discarding prediction {} for task {}, no longer current",
                outcome.job_id,
                outcome.request.task_id
            );
            return Ok(0);
        }

        let origin = outcome.request.mode.name();
        let results = match outcome
            .result
            .and_then(|response| response.into_results(origin, &labels))
        {
            Ok(results) => results,
            Err(e) => {
                log::warn!("Prediction {} failed: {}", outcome.job_id, e);
                self.notifications.push(Notification::from(&e));
                return Ok(0);
            }
        };
        if results.is_empty() {
            log::info!("Prediction {} found nothing", outcome.job_id);
            return Ok(0);
        }

        let added = results.len();
        self.execute(ResultCommand::add(results)?)?;
        Ok(added)
    }

    // ========================================================================
    // Labels
    // ========================================================================

    /// Add (or recolor) a label. The first label becomes the current one.
    pub fn add_label(&mut self, name: &str, color: &str) -> String {
        let id = self.project.add_label(name, color);
        if self.project.key_label() == Some(id.as_str()) {
            self.sync_draw_color();
        }
        self.resync_canvas();
        id
    }

    pub fn select_label(&mut self, id: &str) -> Result<(), ModelError> {
        self.project.set_key_label(Some(id))?;
        self.sync_draw_color();
        Ok(())
    }

    fn sync_draw_color(&mut self) {
        if let Some(label) = self.project.crt_label() {
            self.canvas.set_draw_color(&label.color);
        }
    }

    /// Recolor a label, cascading into results and canvas styles.
    ///
    /// Geometry and undo history are untouched.
    pub fn set_label_color(&mut self, id: &str, color: &str) -> ZlabelResult<usize> {
        let touched = self.project.set_label_color(id, color)?;
        if self.project.key_label() == Some(id) {
            self.select_label(id)?;
        }
        self.resync_canvas();
        log::info!("Label {} recolored, {} results updated", id, touched);
        Ok(touched)
    }

    fn resync_canvas(&mut self) {
        match self.project.crt_anno() {
            Some(anno) => {
                self.canvas.sync_results(anno.results());
            }
            None => self.canvas.clear(),
        }
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub fn add_task(&mut self, task: Task) -> ZlabelResult<()> {
        Ok(self.project.add_task(task)?)
    }

    /// Pull tasks from the remote store. Returns how many were new.
    pub fn fetch_tasks(&mut self) -> ZlabelResult<usize> {
        let store = self
            .remote
            .clone()
            .ok_or_else(|| StorageError::remote("No remote store configured"))?;
        let prefs = &self.config.preferences;
        let fetch_type = FetchType::from_finished_flag(prefs.fetch_finished);
        let tasks = match store.fetch_tasks(prefs.fetch_num, fetch_type) {
            Ok(tasks) => tasks,
            Err(e) => {
                self.notifications.push(Notification::from(&e));
                return Err(e.into());
            }
        };

        let mut added = 0;
        for task in tasks {
            if self.project.task(&task.anno_id).is_none() {
                self.project.add_task(task)?;
                added += 1;
            }
        }
        log::info!("Fetched {} new tasks", added);
        Ok(added)
    }

    /// Make `anno_id` the current task, loading its annotation if needed.
    ///
    /// The annotation comes from the local project folder, then the remote
    /// store, and is created empty otherwise. Undo history is per task and is
    /// cleared. When loading fails the current task, canvas and history are
    /// left untouched.
    pub fn open_task(&mut self, anno_id: &str) -> ZlabelResult<()> {
        let filename = self
            .project
            .task(anno_id)
            .map(|t| t.filename.clone())
            .ok_or_else(|| ModelError::key_not_found("task", anno_id))?;

        let loaded = self.project.task(anno_id).is_some_and(|t| t.anno.is_some());
        if !loaded {
            let anno = match self.load_annotation(anno_id, &filename) {
                Ok(anno) => anno,
                Err(e) => {
                    log::warn!("Keeping current task, {} failed to load: {}", anno_id, e);
                    self.notifications.push(Notification::from(&e));
                    return Err(e.into());
                }
            };
            self.project.attach_annotation(anno)?;
        }

        self.canvas.cancel_creation();
        self.project.set_key_task(Some(anno_id))?;
        self.undo.clear();
        self.canvas.clear();
        self.resync_canvas();
        self.canvas.take_events();
        self.evict_images();
        self.request_image(&filename);
        log::info!("Opened task {} ({})", anno_id, filename);
        Ok(())
    }

    fn load_annotation(&self, anno_id: &str, filename: &str) -> Result<Annotation, StorageError> {
        let path = self.annotation_path(anno_id);
        if path.exists() {
            return Annotation::load_from_file(&path);
        }
        if let Some(store) = &self.remote {
            if let Some(json) = store.fetch_annotation(anno_id)? {
                log::debug!("Annotation {} fetched from remote", anno_id);
                return Annotation::from_json(&json);
            }
        }
        log::debug!("No stored annotation for {}, starting empty", anno_id);
        Ok(Annotation::new(anno_id, filename, &self.user.name))
    }

    /// Edit a scratch annotation that belongs to no task.
    pub fn open_draft(&mut self, image_path: &str) -> ZlabelResult<()> {
        self.canvas.cancel_creation();
        self.project.set_key_task(None)?;
        self.project.draft = Some(Annotation::new(DRAFT_ID, image_path, &self.user.name));
        self.undo.clear();
        self.canvas.clear();
        self.resync_canvas();
        self.canvas.take_events();
        Ok(())
    }

    /// Open the next task. Returns false at the end of the list.
    pub fn next_task(&mut self) -> ZlabelResult<bool> {
        match self.project.next_task_id() {
            Some(id) => self.open_task(&id).map(|_| true),
            None => Ok(false),
        }
    }

    /// Open the previous task. Returns false at the start of the list.
    pub fn prev_task(&mut self) -> ZlabelResult<bool> {
        match self.project.prev_task_id() {
            Some(id) => self.open_task(&id).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn set_task_finished(&mut self, finished: bool) -> Result<(), UserInputError> {
        let task = self.project.crt_task_mut().ok_or(UserInputError::NoTask)?;
        task.finished = finished;
        log::info!("Task {} finished = {}", task.anno_id, finished);
        Ok(())
    }

    // ========================================================================
    // Images
    // ========================================================================

    fn request_image(&mut self, name: &str) {
        let Some(images) = self.images.as_mut() else {
            return;
        };
        match images.request(name) {
            Ok(FetchStatus::Cached) => {
                if let Some(image) = images.get(name).cloned() {
                    self.apply_image(&image);
                }
            }
            Ok(FetchStatus::Started | FetchStatus::Pending) => {}
            Err(e) => self.notifications.push(Notification::from(&e)),
        }
    }

    /// Keep only the images of the current task and its neighbours cached.
    fn evict_images(&mut self) {
        let keep: HashSet<String> = [
            self.project.prev_task_id(),
            self.project.key_task().map(str::to_string),
            self.project.next_task_id(),
        ]
        .into_iter()
        .flatten()
        .filter_map(|id| self.project.task(&id).map(|t| t.filename.clone()))
        .collect();
        let Some(images) = self.images.as_mut() else {
            return;
        };
        let dropped = images.retain(|name| keep.contains(name));
        if dropped > 0 {
            log::debug!("Evicted {} cached images, {} kept", dropped, images.len());
        }
    }

    fn poll_images(&mut self) {
        let events = match self.images.as_mut() {
            Some(images) => images.poll(),
            None => return,
        };
        for event in events {
            self.on_image_event(event);
        }
    }

    /// Block until one image fetch finishes or `timeout` passes.
    pub fn wait_for_image(&mut self, timeout: Duration) -> bool {
        match self.images.as_mut().and_then(|images| images.wait(timeout)) {
            Some(event) => {
                self.on_image_event(event);
                true
            }
            None => false,
        }
    }

    fn on_image_event(&mut self, event: ImageEvent) {
        match event.result {
            Ok(image) => self.apply_image(&image),
            Err(e) => self.notifications.push(Notification::from(&e)),
        }
    }

    /// Record the image size on every loaded annotation showing it.
    fn apply_image(&mut self, image: &LoadedImage) {
        let ids: Vec<String> = self
            .project
            .tasks()
            .filter(|t| t.filename == image.name)
            .map(|t| t.anno_id.clone())
            .collect();
        for id in ids {
            if let Some(anno) = self.project.task_mut(&id).and_then(|t| t.anno.as_mut()) {
                anno.set_image_size(image.width, image.height);
            }
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn project_dir(&self) -> PathBuf {
        self.config.project.project_dir()
    }

    pub fn project_path(&self) -> PathBuf {
        self.project_dir().join(self.project.file_name())
    }

    pub fn annotation_path(&self, anno_id: &str) -> PathBuf {
        self.project_dir()
            .join("annotations")
            .join(format!("{}.{}", anno_id, ANNOTATION_SUFFIX))
    }

    /// Save the current annotation locally and upload it when a remote is set.
    ///
    /// A failed upload is only a toast; the local file is already written.
    pub fn save_annotation(&mut self) -> ZlabelResult<PathBuf> {
        let user = self.user.name.clone();
        let dir = self.project_dir().join("annotations");
        let anno = self.project.crt_anno_mut().ok_or(UserInputError::NoTask)?;
        anno.updated_by = user;
        let path = dir.join(format!("{}.{}", anno.id, ANNOTATION_SUFFIX));
        let saved = anno.save_to_file(&path).and_then(|()| anno.to_json());
        let anno_id = anno.id.clone();

        let json = match saved {
            Ok(json) => json,
            Err(e) => {
                self.notifications.push(Notification::from(&e));
                return Err(e.into());
            }
        };
        if let Some(store) = &self.remote {
            if let Err(e) = store.save_annotation(&anno_id, &json) {
                log::warn!("Upload of {} failed: {}", anno_id, e);
                self.notifications
                    .push(Notification::toast(format!("Upload failed: {}", e)));
            }
        }
        Ok(path)
    }

    /// Save the project file and every loaded annotation.
    pub fn save_project(&mut self) -> ZlabelResult<PathBuf> {
        let path = self.project_path();
        let outcome = self.project.save_to_file(&path).and_then(|()| {
            self.project
                .tasks()
                .filter_map(|t| t.anno.as_ref())
                .try_for_each(|anno| anno.save_to_file(&self.annotation_path(&anno.id)))
        });

        match outcome {
            Ok(()) => Ok(path),
            Err(e) => {
                self.notifications.push(Notification::from(&e));
                Err(e.into())
            }
        }
    }

    /// Replace the project with the one saved in the project folder.
    pub fn load_project(&mut self) -> ZlabelResult<()> {
        let path = self.project_path();
        let project = match Project::load_from_file(&path) {
            Ok(project) => project,
            Err(e) => {
                self.notifications.push(Notification::from(&e));
                return Err(e.into());
            }
        };
        log::info!("Loaded {}", project);
        self.project = project;
        self.pending_labels.clear();
        self.undo.clear();
        self.canvas.clear();
        self.canvas.take_events();
        self.sync_draw_color();
        match self.project.key_task().map(str::to_string) {
            Some(key) => self.open_task(&key),
            None => Ok(()),
        }
    }
}
