//! Interactive annotation canvas.
//!
//! The canvas owns the shapes shown over the image and turns pointer and
//! keyboard input into shape edits and `CanvasEvent`s. It never touches the
//! annotation model; the workspace drains the events with `take_events` and
//! re-syncs the canvas from the model afterwards.
//!
//! Positions passed to the input handlers are in view coordinates and are
//! mapped to image coordinates through the current `ViewTransform`.

mod events;
mod input;
pub mod selection;
mod sync;

pub use events::CanvasEvent;
pub use input::{Key, Modifiers, MouseButton};
pub use sync::SyncStats;

use crate::config::CanvasConfig;
use crate::error::UserInputError;
use crate::geometry::{Point, Rect, ViewTransform};
use crate::model::Geometry;
use crate::shape::{HandleKind, Shape, ShapeHit, ShapeState, ShapeStyle};
use selection::{HitTarget, Marquee};

/// Minimum vertices for a polygon to be finalized.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Id given to the transient shape of a creation gesture.
pub const PREVIEW_ID: &str = "__preview__";

/// What pointer input does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusMode {
    /// Pan and inspect.
    #[default]
    View,
    /// Select, move and reshape existing shapes.
    Edit,
    /// Draw new shapes.
    Create,
}

/// Which shape a creation gesture draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    Point,
    #[default]
    Rectangle,
    Polygon,
}

impl StatusMode {
    pub fn name(&self) -> &'static str {
        match self {
            StatusMode::View => "View",
            StatusMode::Edit => "Edit",
            StatusMode::Create => "Create",
        }
    }
}

impl DrawMode {
    pub fn name(&self) -> &'static str {
        match self {
            DrawMode::Point => "Point",
            DrawMode::Rectangle => "Rectangle",
            DrawMode::Polygon => "Polygon",
        }
    }
}

/// Part of a shape being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragTarget {
    Handle(HandleKind),
    Body,
}

/// Pointer interaction in progress.
#[derive(Debug, Clone, Default)]
enum Interaction {
    #[default]
    Idle,
    Panning {
        last_view: Point,
    },
    Marquee {
        marquee: Marquee,
        additive: bool,
    },
    /// Pressed on a handle or body; no movement yet.
    PotentialDrag {
        id: String,
        target: DragTarget,
        start_view: Point,
        last: Point,
        before: ShapeState,
    },
    Dragging {
        id: String,
        target: DragTarget,
        last: Point,
        before: ShapeState,
    },
    CreatingRectangle {
        start: Point,
        current: Point,
    },
    CreatingPoint {
        at: Point,
    },
    CreatingPolygon {
        vertices: Vec<Point>,
        preview: Option<Point>,
    },
}

impl Interaction {
    fn is_creating(&self) -> bool {
        matches!(
            self,
            Interaction::CreatingRectangle { .. }
                | Interaction::CreatingPoint { .. }
                | Interaction::CreatingPolygon { .. }
        )
    }
}

pub struct Canvas {
    /// Bottom to top.
    shapes: Vec<Shape>,
    transform: ViewTransform,
    status_mode: StatusMode,
    draw_mode: DrawMode,
    config: CanvasConfig,
    /// `#rrggbb` used for the preview of a creation gesture.
    draw_color: String,
    interaction: Interaction,
    outbox: Vec<CanvasEvent>,
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            shapes: Vec::new(),
            transform: ViewTransform::identity(),
            status_mode: StatusMode::default(),
            draw_mode: DrawMode::default(),
            config,
            draw_color: crate::color_utils::DEFAULT_COLOR.to_string(),
            interaction: Interaction::Idle,
            outbox: Vec::new(),
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    fn emit(&mut self, event: CanvasEvent) {
        log::debug!("Canvas event: {}", event.name());
        self.outbox.push(event);
    }

    /// Drain the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ========================================================================
    // Modes and view
    // ========================================================================

    pub fn status_mode(&self) -> StatusMode {
        self.status_mode
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Switch status mode. Any in-progress gesture is ended first.
    pub fn set_status_mode(&mut self, mode: StatusMode) {
        if self.status_mode == mode {
            return;
        }
        self.end_interaction();
        log::debug!("Status mode: {} -> {}", self.status_mode.name(), mode.name());
        self.status_mode = mode;
    }

    /// Switch draw mode. Any in-progress creation is canceled.
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        if self.draw_mode == mode {
            return;
        }
        self.cancel_creation();
        log::debug!("Draw mode: {} -> {}", self.draw_mode.name(), mode.name());
        self.draw_mode = mode;
    }

    pub fn set_draw_color(&mut self, color: &str) {
        self.draw_color = color.to_string();
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: ViewTransform) {
        self.transform = transform;
    }

    fn to_image(&self, view: Point) -> Point {
        self.transform.view_to_image(view)
    }

    fn handle_tolerance(&self) -> f32 {
        self.transform.view_distance_to_image(self.config.handle_tolerance)
    }

    // ========================================================================
    // Shapes
    // ========================================================================

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    fn shape_mut(&mut self, id: &str) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id() == id)
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn selected_ids(&self) -> Vec<String> {
        selection::selected_ids(&self.shapes)
    }

    /// Select shapes programmatically. Emits `SelectionChanged` when it changes.
    pub fn select(&mut self, ids: &[String], additive: bool) {
        if selection::select_ids(&mut self.shapes, ids, additive) {
            self.emit_selection();
        }
    }

    pub fn clear_selection(&mut self) {
        if selection::clear_selection(&mut self.shapes) {
            self.emit_selection();
        }
    }

    fn emit_selection(&mut self) {
        let ids = self.selected_ids();
        self.emit(CanvasEvent::SelectionChanged { ids });
    }

    /// Style for a shape drawn in `color`.
    pub fn style_for(&self, color: &str) -> ShapeStyle {
        ShapeStyle::from_hex(color, self.config.fill_alpha)
    }

    /// Transient shape of the creation gesture in progress, for drawing.
    pub fn preview(&self) -> Option<Shape> {
        let geometry = match &self.interaction {
            Interaction::CreatingRectangle { start, current } => {
                Geometry::rectangle(Rect::from_corners(*start, *current))
            }
            Interaction::CreatingPoint { at } => Geometry::point(*at),
            Interaction::CreatingPolygon { vertices, preview } => {
                let mut points = vertices.clone();
                points.extend(preview.iter().copied());
                Geometry::polygon(&points, false)
            }
            _ => return None,
        };
        let state = ShapeState::new(PREVIEW_ID, geometry);
        Some(Shape::from_state(
            &state,
            self.style_for(&self.draw_color),
            self.config.point_radius,
        ))
    }

    /// Committed polygon vertices of the creation in progress.
    pub fn polygon_vertices(&self) -> &[Point] {
        match &self.interaction {
            Interaction::CreatingPolygon { vertices, .. } => vertices,
            _ => &[],
        }
    }

    pub fn is_creating(&self) -> bool {
        self.interaction.is_creating()
    }

    /// No pointer gesture is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.interaction, Interaction::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.interaction, Interaction::Dragging { .. })
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    pub fn on_mouse_press(&mut self, pos: Point, button: MouseButton, modifiers: Modifiers) {
        if button == MouseButton::Middle {
            // Panning must not interrupt a drag or a shape in progress.
            if matches!(self.interaction, Interaction::Idle) {
                self.interaction = Interaction::Panning { last_view: pos };
            } else {
                log::debug!("Middle press ignored during {:?}", self.interaction);
            }
            return;
        }
        let p = self.to_image(pos);
        match (self.status_mode, button) {
            (StatusMode::View, MouseButton::Left) => {
                if !modifiers.is_multi_select() {
                    self.clear_selection();
                }
                self.interaction = Interaction::Panning { last_view: pos };
            }
            (StatusMode::Edit, MouseButton::Left) => self.edit_press(pos, p, modifiers),
            (StatusMode::Create, _) => self.create_press(p, button),
            _ => {}
        }
    }

    fn edit_press(&mut self, pos: Point, p: Point, modifiers: Modifiers) {
        let additive = modifiers.is_multi_select();
        let tolerance = self.handle_tolerance();

        let Some(HitTarget { index, hit }) = selection::hit_test(&self.shapes, &p, tolerance) else {
            if !additive {
                self.clear_selection();
            }
            self.interaction = Interaction::Marquee {
                marquee: Marquee::new(p),
                additive,
            };
            return;
        };

        let shape = &self.shapes[index];
        let id = shape.id().to_string();
        let target = match hit {
            ShapeHit::Handle(kind) => DragTarget::Handle(kind),
            ShapeHit::Body => {
                let was_selected = shape.is_selected();
                if additive {
                    self.shapes[index].set_selected(!was_selected);
                    self.emit_selection();
                } else if !was_selected {
                    self.select(std::slice::from_ref(&id), false);
                }
                let shape = &self.shapes[index];
                if !shape.is_selected() || !shape.is_movable() {
                    return;
                }
                DragTarget::Body
            }
        };

        log::debug!("Potential drag on {} ({:?})", id, target);
        self.interaction = Interaction::PotentialDrag {
            before: self.shapes[index].state(),
            id,
            target,
            start_view: pos,
            last: p,
        };
    }

    fn create_press(&mut self, p: Point, button: MouseButton) {
        match (self.draw_mode, button) {
            (DrawMode::Rectangle, MouseButton::Left) => {
                self.interaction = Interaction::CreatingRectangle {
                    start: p,
                    current: p,
                };
            }
            (DrawMode::Point, MouseButton::Left) => {
                self.interaction = Interaction::CreatingPoint { at: p };
            }
            (DrawMode::Polygon, MouseButton::Left) => match &mut self.interaction {
                Interaction::CreatingPolygon { vertices, preview } => {
                    vertices.push(p);
                    *preview = None;
                }
                _ => {
                    log::debug!("Polygon started at ({:.1}, {:.1})", p.x, p.y);
                    self.interaction = Interaction::CreatingPolygon {
                        vertices: vec![p],
                        preview: None,
                    };
                }
            },
            (DrawMode::Polygon, MouseButton::Right) => self.pop_polygon_vertex(),
            _ => {}
        }
    }

    pub fn on_mouse_move(&mut self, pos: Point) {
        let p = self.to_image(pos);
        let min_drag = self.config.min_drag_distance;
        match &mut self.interaction {
            Interaction::Panning { last_view } => {
                let (dx, dy) = (pos.x - last_view.x, pos.y - last_view.y);
                *last_view = pos;
                self.transform = self.transform.pan_by(dx, dy);
            }
            Interaction::Marquee { marquee, .. } => marquee.update(p),
            Interaction::PotentialDrag { start_view, .. } => {
                if start_view.distance_to(&pos) >= min_drag {
                    self.begin_drag();
                    self.drag_to(p);
                }
            }
            Interaction::Dragging { .. } => self.drag_to(p),
            Interaction::CreatingRectangle { current, .. } => *current = p,
            Interaction::CreatingPolygon { preview, .. } => *preview = Some(p),
            Interaction::CreatingPoint { .. } | Interaction::Idle => {}
        }
    }

    pub fn on_mouse_release(&mut self, pos: Point, button: MouseButton) {
        if button == MouseButton::Right {
            return;
        }
        if button == MouseButton::Middle {
            if matches!(self.interaction, Interaction::Panning { .. }) {
                self.interaction = Interaction::Idle;
            }
            return;
        }
        let p = self.to_image(pos);
        match std::mem::take(&mut self.interaction) {
            Interaction::Marquee { mut marquee, additive } => {
                marquee.update(p);
                if marquee.is_large_enough(self.config.marquee_min_area) {
                    let hits = selection::marquee_hits(&self.shapes, &marquee.rect());
                    log::debug!("Marquee selected {} shapes", hits.len());
                    self.select(&hits, additive);
                } else {
                    log::debug!("Marquee too small, discarded");
                }
            }
            Interaction::Dragging { id, before, .. } => self.finish_drag(id, before),
            Interaction::CreatingRectangle { start, .. } => {
                let rect = Rect::from_corners(start, p);
                let min = self.config.min_shape_size;
                if rect.w >= min && rect.h >= min {
                    log::debug!("Rectangle drawn: {:?}", rect);
                    self.emit(CanvasEvent::ShapeCreated {
                        mode: DrawMode::Rectangle,
                        geometry: Geometry::rectangle(rect),
                    });
                } else {
                    log::debug!("Rectangle below minimum size, discarded");
                    self.emit(CanvasEvent::CreationCanceled);
                }
            }
            Interaction::CreatingPoint { at } => {
                self.emit(CanvasEvent::ShapeCreated {
                    mode: DrawMode::Point,
                    geometry: Geometry::point(at),
                });
            }
            polygon @ Interaction::CreatingPolygon { .. } => {
                // Polygons are finished explicitly, not on release.
                self.interaction = polygon;
            }
            Interaction::Panning { .. } | Interaction::PotentialDrag { .. } | Interaction::Idle => {}
        }
    }

    pub fn on_double_click(&mut self, pos: Point, button: MouseButton) {
        if button != MouseButton::Left {
            return;
        }
        match self.status_mode {
            StatusMode::Create if self.draw_mode == DrawMode::Polygon => self.finish_polygon_gesture(),
            StatusMode::Edit => {
                let p = self.to_image(pos);
                self.insert_vertex_at(p);
            }
            _ => {}
        }
    }

    /// Zoom around the cursor. Positive `delta` zooms in.
    pub fn on_scroll(&mut self, delta: f32, pos: Point) {
        let t = self.transform;
        let zoomed = if delta > 0.0 {
            t.zoom_in(self.config.zoom_step, self.config.max_zoom)
        } else if delta < 0.0 {
            t.zoom_out(self.config.zoom_step, self.config.min_zoom)
        } else {
            return;
        };
        self.transform = t.zoom_to_cursor(zoomed.zoom, pos);
    }

    // ========================================================================
    // Keyboard input
    // ========================================================================

    pub fn on_key_press(&mut self, key: Key, _modifiers: Modifiers) {
        match key {
            Key::Escape => {
                self.cancel_creation();
            }
            Key::Enter | Key::Space => {
                if matches!(self.interaction, Interaction::CreatingPolygon { .. }) {
                    self.finish_polygon_gesture();
                }
            }
            Key::Backspace => self.pop_polygon_vertex(),
            Key::Delete => self.delete_selected(),
            Key::Char(_) | Key::Tab => {}
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Abandon the creation gesture in progress. Returns true if there was one.
    pub fn cancel_creation(&mut self) -> bool {
        if !self.interaction.is_creating() {
            return false;
        }
        self.interaction = Interaction::Idle;
        log::debug!("Creation canceled");
        self.emit(CanvasEvent::CreationCanceled);
        true
    }

    /// Finalize the polygon being drawn.
    ///
    /// Fails, keeping the gesture open, when fewer than `MIN_POLYGON_VERTICES`
    /// vertices are committed. Does nothing when no polygon is being drawn.
    pub fn close_polygon(&mut self) -> Result<(), UserInputError> {
        let Interaction::CreatingPolygon { vertices, .. } = &self.interaction else {
            return Ok(());
        };
        if vertices.len() < MIN_POLYGON_VERTICES {
            return Err(UserInputError::PolygonTooSmall {
                vertices: vertices.len(),
                min: MIN_POLYGON_VERTICES,
            });
        }
        let geometry = Geometry::polygon(vertices, true);
        self.interaction = Interaction::Idle;
        log::debug!("Polygon closed");
        self.emit(CanvasEvent::ShapeCreated {
            mode: DrawMode::Polygon,
            geometry,
        });
        Ok(())
    }

    fn finish_polygon_gesture(&mut self) {
        if let Err(e) = self.close_polygon() {
            log::warn!("{}", e);
            self.emit(CanvasEvent::CreationRejected(e));
        }
    }

    fn pop_polygon_vertex(&mut self) {
        let Interaction::CreatingPolygon { vertices, .. } = &mut self.interaction else {
            return;
        };
        vertices.pop();
        if vertices.is_empty() {
            self.cancel_creation();
        }
    }

    // ========================================================================
    // Editing
    // ========================================================================

    fn begin_drag(&mut self) {
        let Interaction::PotentialDrag {
            id,
            target,
            last,
            before,
            ..
        } = std::mem::take(&mut self.interaction)
        else {
            return;
        };
        log::info!("Starting drag on {} ({:?})", id, target);
        self.emit(CanvasEvent::StateChangeStarted {
            before: before.clone(),
        });
        self.interaction = Interaction::Dragging {
            id,
            target,
            last,
            before,
        };
    }

    fn drag_to(&mut self, p: Point) {
        let Interaction::Dragging {
            id,
            target,
            last,
            before,
        } = &mut self.interaction
        else {
            return;
        };
        let (dx, dy) = (p.x - last.x, p.y - last.y);
        *last = p;
        let (id, target) = (id.clone(), *target);

        let Some(shape) = self.shapes.iter_mut().find(|s| s.id() == id) else {
            log::error!("Dragged shape {} disappeared", id);
            self.interaction = Interaction::Idle;
            return;
        };
        match target {
            DragTarget::Handle(kind) => {
                shape.drag_handle(before, kind, p);
            }
            DragTarget::Body => shape.translate(dx, dy),
        }
        let state = shape.state();
        self.emit(CanvasEvent::StateChangeUpdated { state });
    }

    fn finish_drag(&mut self, id: String, before: ShapeState) {
        match self.shape(&id).map(Shape::state) {
            Some(after) => {
                log::debug!("Drag on {} finished", id);
                self.emit(CanvasEvent::StateChangeFinished { before, after });
            }
            None => log::error!("Dragged shape {} disappeared before release", id),
        }
    }

    /// End whatever gesture is active, finishing drags and canceling creation.
    fn end_interaction(&mut self) {
        if self.interaction.is_creating() {
            self.cancel_creation();
            return;
        }
        if let Interaction::Dragging { id, before, .. } = std::mem::take(&mut self.interaction) {
            self.finish_drag(id, before);
        }
    }

    fn insert_vertex_at(&mut self, p: Point) {
        let tolerance = self
            .transform
            .view_distance_to_image(self.config.polygon_edge_tolerance);
        let Some(index) = self
            .shapes
            .iter()
            .rposition(|s| s.is_selected() && matches!(s, Shape::Polygon(_)) && s.hit_body(&p, tolerance))
        else {
            return;
        };
        let before = self.shapes[index].state();
        let Some(vertex) = self.shapes[index].insert_vertex_near(&p, tolerance) else {
            return;
        };
        let after = self.shapes[index].state();
        log::info!("Inserted vertex {} into {}", vertex, before.id);
        self.emit(CanvasEvent::StateChangeStarted {
            before: before.clone(),
        });
        self.emit(CanvasEvent::StateChangeUpdated {
            state: after.clone(),
        });
        self.emit(CanvasEvent::StateChangeFinished { before, after });
    }

    /// Remove every selected shape and emit one `ShapesRemoved` batch.
    pub fn delete_selected(&mut self) {
        if self.interaction.is_creating() {
            return;
        }
        let ids = self.selected_ids();
        if ids.is_empty() {
            return;
        }
        self.interaction = Interaction::Idle;
        self.shapes.retain(|s| !s.is_selected());
        log::info!("Deleted {} shapes", ids.len());
        self.emit(CanvasEvent::ShapesRemoved { ids });
        self.emit_selection();
    }

    /// Apply a state to an existing shape without emitting events.
    pub fn apply_state(&mut self, state: &ShapeState) -> bool {
        match self.shape_mut(&state.id) {
            Some(shape) => {
                shape.set_state(state);
                true
            }
            None => false,
        }
    }
}
