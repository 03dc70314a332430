//! End-to-end flows through the workspace: drawing, editing, undo and
//! oracle-assisted creation.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zlabel::canvas::{DrawMode, Key, Modifiers, MouseButton, StatusMode};
use zlabel::config::AppConfig;
use zlabel::error::{OracleError, UserInputError};
use zlabel::geometry::{Point, Rect};
use zlabel::model::{Geometry, GeometryKind, Task};
use zlabel::notify::Severity;
use zlabel::oracle::{Oracle, PredictRequest, PredictResponse, PredictedRect};
use zlabel::{Workspace, ZlabelError};

const WAIT: Duration = Duration::from_secs(5);

/// Oracle answering with the seed box and a copy shifted right by 100.
#[derive(Default)]
struct CountingOracle {
    calls: AtomicUsize,
    fail: bool,
    last_request: Mutex<Option<PredictRequest>>,
}

impl CountingOracle {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Oracle for CountingOracle {
    fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("lock") = Some(request.clone());
        if self.fail {
            return Err(OracleError::transport("connection refused"));
        }

        let seed = match (&request.rects, &request.points) {
            (Some(rects), _) if !rects.is_empty() => Rect::new(rects[0].x, rects[0].y, rects[0].w, rects[0].h),
            (_, Some(points)) if !points.is_empty() => Rect::new(points[0].x - 5.0, points[0].y - 5.0, 10.0, 10.0),
            _ => return Ok(PredictResponse::failed("empty seed")),
        };
        let rect = |dx: f32, score| PredictedRect {
            x: seed.x + dx,
            y: seed.y,
            w: seed.w,
            h: seed.h,
            score,
        };
        Ok(PredictResponse::with_rects(vec![rect(0.0, Some(0.9)), rect(100.0, None)]))
    }
}

fn workspace(dir: &Path) -> Workspace {
    let mut config = AppConfig::new();
    config.project.root_dir = dir.to_path_buf();
    config.project.project_name = "flow".to_string();
    config.oracle.workers = 1;
    build(Workspace::new(config))
}

fn workspace_with_oracle(dir: &Path, oracle: Arc<CountingOracle>) -> Workspace {
    let mut config = AppConfig::new();
    config.project.root_dir = dir.to_path_buf();
    config.project.project_name = "flow".to_string();
    config.oracle.workers = 1;
    let ws = Workspace::new(config).with_oracle(oracle).expect("spawn oracle");
    build(ws)
}

fn build(mut ws: Workspace) -> Workspace {
    ws.add_label("car", "#ff0000");
    ws.add_task(Task::new("t1", "a1", "a.png")).expect("task");
    ws.add_task(Task::new("t2", "a2", "b.png")).expect("task");
    ws.open_task("a1").expect("open");
    ws.set_status_mode(StatusMode::Create).expect("mode");
    ws
}

fn p(x: f32, y: f32) -> Point {
    Point::new(x, y)
}

fn draw_rect(ws: &mut Workspace, from: Point, to: Point) {
    ws.mouse_press(from, MouseButton::Left, Modifiers::none()).expect("press");
    ws.mouse_move(to).expect("move");
    ws.mouse_release(to, MouseButton::Left).expect("release");
}

fn click(ws: &mut Workspace, at: Point) {
    ws.mouse_press(at, MouseButton::Left, Modifiers::none()).expect("press");
    ws.mouse_release(at, MouseButton::Left).expect("release");
}

fn result_count(ws: &Workspace) -> usize {
    ws.current_annotation().map_or(0, |a| a.len())
}

/// Canvas shapes and annotation results agree on ids and order.
fn assert_in_sync(ws: &Workspace) {
    let anno = ws.current_annotation().expect("annotation");
    let shapes: Vec<String> = ws.canvas().shapes().iter().map(|s| s.id().to_string()).collect();
    assert_eq!(shapes, anno.result_ids());
    for shape in ws.canvas().shapes() {
        let result = anno.result(shape.id()).expect("result for shape");
        assert_eq!(shape.geometry(), result.geometry);
    }
}

#[test]
fn test_manual_rectangle_gesture_adds_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());

    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));

    let anno = ws.current_annotation().expect("annotation");
    assert_eq!(anno.len(), 1);
    let result = anno.results().next().expect("result");
    assert_eq!(result.bounding_rect(), Rect::new(10.0, 10.0, 40.0, 30.0));
    assert_eq!(result.origin, "manual");
    assert_eq!(result.primary_label().map(|l| l.name.as_str()), Some("car"));
    assert_eq!(anno.key_result(), Some(result.id.as_str()));
    assert_eq!(ws.undo_stack().undo_count(), 1);
    assert_in_sync(&ws);
}

#[test]
fn test_tiny_rectangle_is_discarded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());

    draw_rect(&mut ws, p(10.0, 10.0), p(10.5, 30.0));

    assert_eq!(result_count(&ws), 0);
    assert_eq!(ws.undo_stack().undo_count(), 0);
    assert!(ws.take_notifications().is_empty());
}

#[test]
fn test_undo_redo_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    draw_rect(&mut ws, p(100.0, 10.0), p(150.0, 40.0));
    let before = ws.current_annotation().expect("anno").result_ids();

    assert!(ws.undo().expect("undo"));
    assert_eq!(result_count(&ws), 1);
    assert_in_sync(&ws);

    assert!(ws.redo().expect("redo"));
    assert_eq!(ws.current_annotation().expect("anno").result_ids(), before);
    assert_in_sync(&ws);

    assert!(!ws.redo().expect("nothing to redo"));
}

#[test]
fn test_drag_records_modify_and_undo_restores() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    ws.set_status_mode(StatusMode::Edit).expect("mode");

    ws.mouse_press(p(30.0, 25.0), MouseButton::Left, Modifiers::none()).expect("press");
    ws.mouse_move(p(40.0, 35.0)).expect("move");
    ws.mouse_release(p(40.0, 35.0), MouseButton::Left).expect("release");

    let result = ws.current_annotation().and_then(|a| a.results().next()).expect("result");
    assert_eq!(result.bounding_rect(), Rect::new(20.0, 20.0, 40.0, 30.0));
    assert_eq!(ws.undo_stack().undo_count(), 2);
    assert_eq!(ws.undo_stack().undo_description().as_deref(), Some("Edit 1 result"));
    assert_in_sync(&ws);

    ws.undo().expect("undo");
    let result = ws.current_annotation().and_then(|a| a.results().next()).expect("result");
    assert_eq!(result.bounding_rect(), Rect::new(10.0, 10.0, 40.0, 30.0));
    assert_in_sync(&ws);
}

#[test]
fn test_drag_back_to_start_records_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    ws.set_status_mode(StatusMode::Edit).expect("mode");

    ws.mouse_press(p(30.0, 25.0), MouseButton::Left, Modifiers::none()).expect("press");
    ws.mouse_move(p(40.0, 35.0)).expect("move");
    ws.mouse_move(p(30.0, 25.0)).expect("move back");
    ws.mouse_release(p(30.0, 25.0), MouseButton::Left).expect("release");

    assert_eq!(ws.undo_stack().undo_count(), 1);
    assert_in_sync(&ws);
}

#[test]
fn test_marquee_selects_intersecting_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(20.0, 20.0));
    draw_rect(&mut ws, p(30.0, 10.0), p(40.0, 20.0));
    draw_rect(&mut ws, p(50.0, 10.0), p(60.0, 20.0));
    ws.set_status_mode(StatusMode::Edit).expect("mode");

    draw_rect(&mut ws, p(0.0, 100.0), p(70.0, 60.0));
    assert!(ws.canvas().selected_ids().is_empty());

    draw_rect(&mut ws, p(0.0, 100.0), p(70.0, 0.0));
    assert_eq!(ws.canvas().selected_ids().len(), 3);
    assert_eq!(ws.undo_stack().undo_count(), 3);
}

#[test]
fn test_delete_selected_is_undoable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(20.0, 20.0));
    draw_rect(&mut ws, p(30.0, 10.0), p(40.0, 20.0));
    ws.set_status_mode(StatusMode::Edit).expect("mode");
    draw_rect(&mut ws, p(0.0, 100.0), p(70.0, 0.0));

    ws.key_press(Key::Delete, Modifiers::none()).expect("delete");
    assert_eq!(result_count(&ws), 0);
    assert_eq!(ws.canvas().shape_count(), 0);
    assert_eq!(ws.undo_stack().undo_description().as_deref(), Some("Delete 2 results"));

    ws.undo().expect("undo");
    assert_eq!(result_count(&ws), 2);
    assert_in_sync(&ws);
}

#[test]
fn test_polygon_needs_three_vertices() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    ws.set_draw_mode(DrawMode::Polygon).expect("mode");

    click(&mut ws, p(10.0, 10.0));
    click(&mut ws, p(50.0, 10.0));
    ws.key_press(Key::Enter, Modifiers::none()).expect("enter");

    let notes = ws.take_notifications();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].is_blocking());
    assert!(ws.canvas().is_creating());

    click(&mut ws, p(30.0, 40.0));
    ws.close_polygon().expect("close");

    let anno = ws.current_annotation().expect("anno");
    assert_eq!(anno.len(), 1);
    assert_eq!(anno.results().next().map(|r| r.kind()), Some(GeometryKind::Polygon));
    assert!(!ws.canvas().is_creating());
    assert_in_sync(&ws);
}

#[test]
fn test_escape_cancels_creation_without_mutation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    ws.set_draw_mode(DrawMode::Polygon).expect("mode");

    click(&mut ws, p(10.0, 10.0));
    click(&mut ws, p(50.0, 10.0));
    click(&mut ws, p(30.0, 40.0));
    ws.key_press(Key::Escape, Modifiers::none()).expect("escape");

    assert!(!ws.canvas().is_creating());
    assert_eq!(result_count(&ws), 0);
    assert_eq!(ws.undo_stack().undo_count(), 0);
}

#[test]
fn test_point_under_manual_is_rejected_before_oracle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oracle = Arc::new(CountingOracle::default());
    let mut ws = workspace_with_oracle(dir.path(), oracle.clone());
    ws.set_draw_mode(DrawMode::Point).expect("mode");

    click(&mut ws, p(20.0, 20.0));

    let notes = ws.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Warning);
    assert_eq!(notes[0].message, UserInputError::PointNeedsOracle.to_string());
    assert_eq!(result_count(&ws), 0);
    assert_eq!(ws.pending_predictions(), 0);
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn test_manual_mode_never_calls_oracle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oracle = Arc::new(CountingOracle::default());
    let mut ws = workspace_with_oracle(dir.path(), oracle.clone());

    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    ws.set_draw_mode(DrawMode::Polygon).expect("mode");
    click(&mut ws, p(10.0, 10.0));
    click(&mut ws, p(50.0, 10.0));
    click(&mut ws, p(30.0, 40.0));
    ws.close_polygon().expect("close");

    assert_eq!(ws.wait_for_predictions(Duration::from_millis(50)).expect("wait"), 0);
    assert_eq!(result_count(&ws), 2);
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn test_sam_prediction_adds_one_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oracle = Arc::new(CountingOracle::default());
    let mut ws = workspace_with_oracle(dir.path(), oracle.clone());
    ws.set_auto_flags(true, false);
    ws.set_threshold(80);

    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    // Nothing lands before the owner collects it.
    assert_eq!(result_count(&ws), 0);
    assert_eq!(ws.wait_for_predictions(WAIT).expect("wait"), 2);

    let anno = ws.current_annotation().expect("anno");
    assert_eq!(anno.len(), 2);
    assert!(anno.results().all(|r| r.origin == "SAM"));
    let scores: Vec<f32> = anno.results().map(|r| r.score).collect();
    assert_eq!(scores, vec![0.9, 1.0]);
    assert_eq!(ws.undo_stack().undo_count(), 1);
    assert_in_sync(&ws);

    let request = oracle.last_request.lock().expect("lock").clone().expect("request");
    assert_eq!(request.threshold, 80);
    assert_eq!(request.task_id, "a1");
    assert_eq!(request.image, "a.png");

    ws.undo().expect("undo");
    assert_eq!(result_count(&ws), 0);
}

#[test]
fn test_sam_point_seed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oracle = Arc::new(CountingOracle::default());
    let mut ws = workspace_with_oracle(dir.path(), oracle.clone());
    ws.set_auto_flags(true, true);
    ws.set_draw_mode(DrawMode::Point).expect("mode");

    click(&mut ws, p(20.0, 20.0));
    assert_eq!(ws.wait_for_predictions(WAIT).expect("wait"), 2);

    let anno = ws.current_annotation().expect("anno");
    assert!(anno.results().all(|r| r.origin == "SAM_AND_CV"));
    assert_eq!(
        anno.results().next().map(|r| r.geometry.clone()),
        Some(Geometry::rectangle(Rect::new(15.0, 15.0, 10.0, 10.0)))
    );
}

#[test]
fn test_oracle_failure_leaves_results_and_toasts_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oracle = Arc::new(CountingOracle::failing());
    let mut ws = workspace_with_oracle(dir.path(), oracle.clone());
    ws.set_auto_flags(true, false);

    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    assert_eq!(ws.wait_for_predictions(WAIT).expect("wait"), 0);

    assert_eq!(oracle.calls(), 1);
    assert_eq!(result_count(&ws), 0);
    assert_eq!(ws.canvas().shape_count(), 0);
    assert_eq!(ws.undo_stack().undo_count(), 0);
    let notes = ws.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Toast);
}

#[test]
fn test_stale_prediction_is_discarded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oracle = Arc::new(CountingOracle::default());
    let mut ws = workspace_with_oracle(dir.path(), oracle.clone());
    ws.set_auto_flags(false, true);

    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    ws.open_task("a2").expect("switch task");
    assert_eq!(ws.wait_for_predictions(WAIT).expect("wait"), 0);

    assert_eq!(result_count(&ws), 0);
    assert_eq!(ws.project().task("a1").and_then(|t| t.anno.as_ref()).map(|a| a.len()), Some(0));
    assert!(ws.take_notifications().is_empty());
}

#[test]
fn test_drawing_without_label_warns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = AppConfig::new();
    config.project.root_dir = dir.path().to_path_buf();
    let mut ws = Workspace::new(config);
    ws.add_task(Task::new("t1", "a1", "a.png")).expect("task");
    ws.open_task("a1").expect("open");
    ws.set_status_mode(StatusMode::Create).expect("mode");

    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));

    let notes = ws.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message, UserInputError::NoLabel.to_string());
    assert_eq!(result_count(&ws), 0);
}

#[test]
fn test_label_recolor_restyles_without_undo() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    let label_id = ws.project().key_label().expect("label").to_string();

    let touched = ws.set_label_color(&label_id, "#0000ff").expect("recolor");

    assert_eq!(touched, 1);
    assert_eq!(ws.canvas().shapes()[0].style().fill, [0, 0, 255]);
    let result = ws.current_annotation().and_then(|a| a.results().next()).expect("result");
    assert_eq!(result.labels[0].color, "#0000ff");
    assert_eq!(ws.undo_stack().undo_count(), 1);
    assert_in_sync(&ws);
}

#[test]
fn test_unknown_label_color_is_model_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    let err = ws.set_label_color("nope", "#000000").expect_err("unknown label");
    assert!(matches!(err, ZlabelError::Model(_)));
}

#[test]
fn test_merge_is_one_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(20.0, 20.0));
    draw_rect(&mut ws, p(30.0, 10.0), p(40.0, 30.0));
    ws.set_status_mode(StatusMode::Edit).expect("mode");
    draw_rect(&mut ws, p(0.0, 100.0), p(70.0, 0.0));

    ws.merge_selected().expect("merge");

    let anno = ws.current_annotation().expect("anno");
    assert_eq!(anno.len(), 1);
    assert_eq!(
        anno.results().next().map(|r| r.bounding_rect()),
        Some(Rect::new(10.0, 10.0, 30.0, 20.0))
    );
    assert_eq!(ws.undo_stack().undo_count(), 3);
    assert_in_sync(&ws);

    ws.undo().expect("undo");
    assert_eq!(result_count(&ws), 2);
    assert_in_sync(&ws);
    ws.redo().expect("redo");
    assert_eq!(result_count(&ws), 1);
}

#[test]
fn test_undo_history_is_bounded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = AppConfig::new();
    config.project.root_dir = dir.path().to_path_buf();
    config.undo.max_history = 2;
    let mut ws = build(Workspace::new(config));

    for i in 0..4 {
        let x = i as f32 * 20.0;
        draw_rect(&mut ws, p(x, 0.0), p(x + 10.0, 10.0));
    }
    assert_eq!(ws.undo_stack().undo_count(), 2);
    assert_eq!(result_count(&ws), 4);
}

#[test]
fn test_sub_threshold_rectangle_never_reaches_oracle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oracle = Arc::new(CountingOracle::default());
    let mut ws = workspace_with_oracle(dir.path(), oracle.clone());
    ws.set_auto_flags(true, false);

    draw_rect(&mut ws, p(10.0, 10.0), p(10.2, 10.2));

    assert_eq!(ws.pending_predictions(), 0);
    assert_eq!(ws.wait_for_predictions(Duration::from_millis(50)).expect("wait"), 0);
    assert_eq!(oracle.calls(), 0);
    assert_eq!(result_count(&ws), 0);
    assert_eq!(ws.undo_stack().undo_count(), 0);
    assert!(ws.take_notifications().is_empty());
}

#[test]
fn test_marquee_takes_inside_and_overlapping_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(20.0, 20.0));
    draw_rect(&mut ws, p(30.0, 10.0), p(40.0, 20.0));
    draw_rect(&mut ws, p(60.0, 10.0), p(80.0, 20.0));
    draw_rect(&mut ws, p(100.0, 10.0), p(110.0, 20.0));
    let ids = ws.current_annotation().expect("anno").result_ids();
    ws.set_status_mode(StatusMode::Edit).expect("mode");

    draw_rect(&mut ws, p(0.0, 0.0), p(70.0, 30.0));

    assert_eq!(ws.canvas().selected_ids(), ids[..3].to_vec());
}

#[test]
fn test_delete_undo_redo_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(20.0, 20.0));
    draw_rect(&mut ws, p(30.0, 10.0), p(40.0, 20.0));
    draw_rect(&mut ws, p(50.0, 10.0), p(60.0, 20.0));
    let ids = ws.current_annotation().expect("anno").result_ids();
    ws.set_status_mode(StatusMode::Edit).expect("mode");
    draw_rect(&mut ws, p(0.0, 100.0), p(45.0, 0.0));

    ws.key_press(Key::Delete, Modifiers::none()).expect("delete");
    assert_eq!(ws.current_annotation().expect("anno").result_ids(), ids[2..].to_vec());

    assert!(ws.undo().expect("undo"));
    assert_eq!(ws.current_annotation().expect("anno").result_ids(), ids);
    assert_in_sync(&ws);

    assert!(ws.redo().expect("redo"));
    assert_eq!(ws.current_annotation().expect("anno").result_ids(), ids[2..].to_vec());
    assert_in_sync(&ws);
}

#[test]
fn test_drag_undo_redo_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    ws.set_status_mode(StatusMode::Edit).expect("mode");

    ws.mouse_press(p(30.0, 25.0), MouseButton::Left, Modifiers::none()).expect("press");
    ws.mouse_move(p(40.0, 35.0)).expect("move");
    ws.mouse_release(p(40.0, 35.0), MouseButton::Left).expect("release");
    let moved = Rect::new(20.0, 20.0, 40.0, 30.0);

    let bbox = |ws: &Workspace| {
        ws.current_annotation()
            .and_then(|a| a.results().next())
            .map(|r| r.bounding_rect())
    };
    assert!(ws.undo().expect("undo"));
    assert_eq!(bbox(&ws), Some(Rect::new(10.0, 10.0, 40.0, 30.0)));
    assert_in_sync(&ws);

    assert!(ws.redo().expect("redo"));
    assert_eq!(bbox(&ws), Some(moved));
    assert_eq!(ws.undo_stack().undo_description().as_deref(), Some("Edit 1 result"));
    assert_in_sync(&ws);
}

#[test]
fn test_undo_updates_key_result_from_selection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut ws = workspace(dir.path());
    draw_rect(&mut ws, p(10.0, 10.0), p(20.0, 20.0));
    draw_rect(&mut ws, p(30.0, 10.0), p(40.0, 20.0));
    draw_rect(&mut ws, p(50.0, 10.0), p(60.0, 20.0));
    let ids = ws.current_annotation().expect("anno").result_ids();
    ws.set_status_mode(StatusMode::Edit).expect("mode");

    click(&mut ws, p(15.0, 15.0));
    ws.mouse_press(p(55.0, 15.0), MouseButton::Left, Modifiers::ctrl()).expect("press");
    ws.mouse_release(p(55.0, 15.0), MouseButton::Left).expect("release");
    assert_eq!(ws.current_annotation().and_then(|a| a.key_result()), Some(ids[2].as_str()));

    assert!(ws.undo().expect("undo"));
    assert_eq!(ws.canvas().selected_ids(), vec![ids[0].clone()]);
    assert_eq!(ws.current_annotation().and_then(|a| a.key_result()), Some(ids[0].as_str()));
}

#[test]
fn test_prediction_waits_for_drag_to_finish() {
    let dir = tempfile::tempdir().expect("tempdir");
    let oracle = Arc::new(CountingOracle::default());
    let mut ws = workspace_with_oracle(dir.path(), oracle.clone());
    draw_rect(&mut ws, p(10.0, 10.0), p(50.0, 40.0));
    ws.set_auto_flags(true, false);
    draw_rect(&mut ws, p(200.0, 10.0), p(240.0, 40.0));
    assert_eq!(ws.pending_predictions(), 1);

    ws.set_status_mode(StatusMode::Edit).expect("mode");
    ws.mouse_press(p(30.0, 25.0), MouseButton::Left, Modifiers::none()).expect("press");
    ws.mouse_move(p(40.0, 35.0)).expect("move");
    assert!(ws.canvas().is_dragging());

    assert_eq!(ws.wait_for_predictions(WAIT).expect("wait"), 0);
    assert_eq!(ws.poll().expect("poll"), 0);
    assert_eq!(result_count(&ws), 1);
    assert_eq!(ws.pending_predictions(), 1);

    ws.mouse_release(p(40.0, 35.0), MouseButton::Left).expect("release");
    assert_eq!(ws.wait_for_predictions(WAIT).expect("wait"), 2);
    assert_eq!(result_count(&ws), 3);
    let first = ws.current_annotation().and_then(|a| a.results().next()).expect("result");
    assert_eq!(first.bounding_rect(), Rect::new(20.0, 20.0, 40.0, 30.0));
    assert_in_sync(&ws);
}
