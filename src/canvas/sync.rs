//! Re-sync canvas shapes from annotation results.
//!
//! One algorithm serves every refresh: diff by id, update shapes that exist,
//! create missing ones, drop the rest. The result order becomes the z-order.

use super::{Canvas, CanvasEvent};
use crate::color_utils::DEFAULT_COLOR;
use crate::model::AnnotationResult;
use crate::shape::{Shape, ShapeState};

/// What a sync changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

impl SyncStats {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.removed == 0
    }
}

impl Canvas {
    /// Make the canvas show exactly `results`, in order.
    ///
    /// Selection of surviving shapes is kept. Geometry and style follow the
    /// result (style from its primary label).
    pub fn sync_results<'a, I>(&mut self, results: I) -> SyncStats
    where
        I: IntoIterator<Item = &'a AnnotationResult>,
    {
        let selected_before = self.selected_ids();
        let mut old = std::mem::take(&mut self.shapes);
        let mut stats = SyncStats::default();

        for result in results {
            let color = result
                .primary_label()
                .map_or(DEFAULT_COLOR, |l| l.color.as_str());
            let style = self.style_for(color);
            let state = ShapeState::new(result.id.clone(), result.geometry.clone());

            match old.iter().position(|s| s.id() == result.id) {
                Some(pos) => {
                    let mut shape = old.swap_remove(pos);
                    if shape.geometry() != result.geometry || *shape.style() != style {
                        shape.set_state(&state);
                        shape.set_style(style);
                        stats.updated += 1;
                    }
                    self.shapes.push(shape);
                }
                None => {
                    self.shapes
                        .push(Shape::from_state(&state, style, self.config.point_radius));
                    stats.created += 1;
                }
            }
        }
        stats.removed = old.len();

        if !stats.is_noop() {
            log::debug!(
                "Canvas sync: {} created, {} updated, {} removed",
                stats.created,
                stats.updated,
                stats.removed
            );
        }
        let selected_after = self.selected_ids();
        if selected_after != selected_before {
            self.emit(CanvasEvent::SelectionChanged {
                ids: selected_after,
            });
        }
        stats
    }

    /// Drop every shape and any gesture in progress.
    pub fn clear(&mut self) {
        self.cancel_creation();
        self.interaction = super::Interaction::Idle;
        let had_selection = !self.selected_ids().is_empty();
        self.shapes.clear();
        if had_selection {
            self.emit(CanvasEvent::SelectionChanged { ids: Vec::new() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::geometry::Rect;
    use crate::model::{Geometry, Label};

    fn result(x: f32) -> AnnotationResult {
        AnnotationResult::manual(
            Geometry::rectangle(Rect::new(x, 0.0, 10.0, 10.0)),
            Label::new("car", "#00ff00"),
        )
    }

    #[test]
    fn test_sync_creates_updates_and_removes() {
        let mut canvas = Canvas::new(CanvasConfig::default());
        let mut results = vec![result(0.0), result(20.0), result(40.0)];
        let stats = canvas.sync_results(&results);
        assert_eq!(stats.created, 3);
        assert_eq!(canvas.shape_count(), 3);

        canvas.select(&[results[1].id.clone()], false);
        canvas.take_events();

        results[1].geometry = Geometry::rectangle(Rect::new(25.0, 5.0, 10.0, 10.0));
        results.remove(0);
        let stats = canvas.sync_results(&results);
        assert_eq!(
            stats,
            SyncStats {
                created: 0,
                updated: 1,
                removed: 1
            }
        );
        let moved = canvas.shape(&results[0].id).expect("shape");
        assert!(moved.is_selected());
        assert_eq!(moved.geometry(), results[0].geometry);
        assert!(canvas.take_events().is_empty());
    }

    #[test]
    fn test_sync_follows_result_order() {
        let mut canvas = Canvas::new(CanvasConfig::default());
        let mut results = vec![result(0.0), result(20.0)];
        canvas.sync_results(&results);
        results.reverse();
        canvas.sync_results(&results);
        let order: Vec<_> = canvas.shapes().iter().map(|s| s.id().to_string()).collect();
        let expected: Vec<_> = results.iter().map(|r| r.id.clone()).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_sync_restyles_from_label() {
        let mut canvas = Canvas::new(CanvasConfig::default());
        let mut results = vec![result(0.0)];
        canvas.sync_results(&results);
        results[0].labels[0].color = "#0000ff".to_string();
        let stats = canvas.sync_results(&results);
        assert_eq!(stats.updated, 1);
        assert_eq!(canvas.shapes()[0].style().fill, [0, 0, 255]);
        assert_eq!(canvas.shapes()[0].geometry(), results[0].geometry);
    }

    #[test]
    fn test_removing_selected_shape_reports_selection() {
        let mut canvas = Canvas::new(CanvasConfig::default());
        let results = vec![result(0.0)];
        canvas.sync_results(&results);
        canvas.select(&[results[0].id.clone()], false);
        canvas.take_events();
        canvas.sync_results(std::iter::empty());
        assert_eq!(
            canvas.take_events(),
            vec![CanvasEvent::SelectionChanged { ids: Vec::new() }]
        );
    }
}
