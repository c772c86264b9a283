//! Live scene graph of one open document and the routing of change
//! notifications into its tracker.

mod graph;
mod item;
mod pages;

use std::collections::HashMap;

use thiserror::Error;

use crate::config::{AppConfig, DEFAULT_DUPLICATE_OFFSET};
use crate::geometry::{Point, Rect};
use crate::history::{
    Atom, AtomKind, AtomValue, ReplayReport, TrackError, Tracker, TrackResult, Undoable,
};
use crate::style::PaintStyle;

pub use graph::{Placement, ReattachOutcome, SceneGraph};
pub use item::{
    AnnotationInfo, Colorable, Copyable, ItemBody, ItemId, ItemState, LinkTarget, PageInfo,
    Resizable, Rotation, WidgetField,
};

pub type SceneResult<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
    #[error("item {0} is detached")]
    Detached(ItemId),
    #[error("item {0} is already attached")]
    AlreadyAttached(ItemId),
    #[error("{body} items cannot be placed {place}")]
    InvalidPlacement {
        body: &'static str,
        place: &'static str,
    },
    #[error("item {id} does not support {property}")]
    UnsupportedProperty { id: ItemId, property: &'static str },
    #[error("item {0} is not a page")]
    NotAPage(ItemId),
    #[error("item {0} cannot be duplicated")]
    NotCopyable(ItemId),
    #[error("page order does not match the scene")]
    OrderMismatch,
    #[error("empty geometry for item")]
    EmptyGeometry,
    #[error(transparent)]
    Track(#[from] TrackError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneOptions {
    pub undo_limit: Option<usize>,
    pub duplicate_offset: f64,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            undo_limit: None,
            duplicate_offset: DEFAULT_DUPLICATE_OFFSET,
        }
    }
}

impl From<&AppConfig> for SceneOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            undo_limit: config.undo_limit(),
            duplicate_offset: config.duplicate_offset(),
        }
    }
}

/// One document's scene graph together with its tracker.
///
/// Mutators here apply the change and then announce it through
/// [`Undoable`]; if the announcement fails the change is reverted. Replay
/// goes straight to the graph so it never records.
#[derive(Debug)]
pub struct Scene {
    graph: SceneGraph,
    tracker: Tracker,
    drags: HashMap<ItemId, Point>,
    duplicate_offset: f64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_options(SceneOptions::default())
    }

    pub fn with_options(options: SceneOptions) -> Self {
        Self {
            graph: SceneGraph::new(),
            tracker: Tracker::with_limit(options.undo_limit),
            drags: HashMap::new(),
            duplicate_offset: options.duplicate_offset,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut Tracker {
        &mut self.tracker
    }

    pub fn item(&self, id: ItemId) -> SceneResult<&ItemState> {
        self.graph.get(id).ok_or(SceneError::ItemNotFound(id))
    }

    fn item_mut(&mut self, id: ItemId) -> SceneResult<&mut ItemState> {
        self.graph.get_mut(id).ok_or(SceneError::ItemNotFound(id))
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.graph.is_live(id)
    }

    fn ensure_live(&self, id: ItemId) -> TrackResult<()> {
        if self.graph.is_live(id) {
            Ok(())
        } else {
            Err(TrackError::DetachedItem(id))
        }
    }

    fn validate_placement(&self, parent: Option<ItemId>, state: &ItemState) -> SceneResult<()> {
        match parent {
            None if !state.body.is_page() => Err(SceneError::InvalidPlacement {
                body: state.body.name(),
                place: "at the scene root",
            }),
            Some(_) if state.body.is_page() => Err(SceneError::InvalidPlacement {
                body: state.body.name(),
                place: "inside another item",
            }),
            Some(parent) => {
                self.ensure_live(parent)?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Refuses edits while the tracker is poisoned, before anything moves.
    fn ensure_recording(&self) -> SceneResult<()> {
        Ok(self.tracker.ensure_healthy()?)
    }

    /// Puts `before` back when `recorded` failed, so no edit survives
    /// without a history entry.
    fn revert_on_error(
        &mut self,
        id: ItemId,
        before: ItemState,
        recorded: SceneResult<()>,
    ) -> SceneResult<()> {
        if recorded.is_err() {
            if let Some(state) = self.graph.get_mut(id) {
                *state = before;
            }
            tracing::debug!(%id, "change was not recorded; reverted");
        }
        recorded
    }

    /// Drops items that were inserted but whose creation never got recorded.
    fn discard_unrecorded(&mut self, items: &[ItemId]) {
        for id in items {
            let _ = self.graph.detach(*id);
        }
        let keep = self.tracker.referenced_items();
        self.graph.purge_detached(&keep);
    }

    fn ensure_movable(&self, id: ItemId, property: &'static str) -> SceneResult<()> {
        if self.item(id)?.body.is_page() {
            return Err(SceneError::UnsupportedProperty { id, property });
        }
        Ok(())
    }

    fn after_record(&mut self) {
        if self.tracker.take_history_shrunk() {
            let keep = self.tracker.referenced_items();
            let freed = self.graph.purge_detached(&keep);
            if freed > 0 {
                tracing::debug!(freed, "purged unreachable detached items");
            }
        }
    }

    // Notification routing.

    pub fn notify_creation(&mut self, item: ItemId) -> SceneResult<()> {
        self.ensure_live(item)?;
        let placement = self.graph.placement(item)?;
        self.tracker.item_added(Atom::create(item, placement))?;
        self.after_record();
        Ok(())
    }

    pub fn notify_deletion(&mut self, item: ItemId) -> SceneResult<()> {
        self.ensure_live(item)?;
        let placement = self.graph.placement(item)?;
        self.tracker.item_removed(Atom::remove(item, placement))?;
        self.after_record();
        Ok(())
    }

    pub fn notify_change(
        &mut self,
        item: ItemId,
        kind: AtomKind,
        old: AtomValue,
        new: AtomValue,
    ) -> SceneResult<()> {
        self.notify_any_change(kind, Some(item), old, new)
    }

    /// Records any non-structural change; `item` may be `None` for changes to
    /// the page collection as a whole.
    pub fn notify_any_change(
        &mut self,
        kind: AtomKind,
        item: Option<ItemId>,
        old: AtomValue,
        new: AtomValue,
    ) -> SceneResult<()> {
        if old == new {
            tracing::trace!(?kind, ?item, "unchanged value; nothing to record");
            return Ok(());
        }
        if matches!(kind, AtomKind::Create | AtomKind::Remove)
            || !kind.accepts(&old)
            || !kind.accepts(&new)
        {
            return Err(TrackError::UnsupportedValue { kind }.into());
        }
        let parent = match item {
            Some(item) => {
                self.ensure_live(item)?;
                self.graph.parent(item)
            }
            None => None,
        };
        self.tracker
            .item_changed(Atom::new(kind, item, old, new, parent))?;
        self.after_record();
        Ok(())
    }

    pub fn notify_position_change(
        &mut self,
        item: ItemId,
        old: Point,
        new: Point,
    ) -> SceneResult<()> {
        self.notify_any_change(
            AtomKind::Changed,
            Some(item),
            AtomValue::Position(old),
            AtomValue::Position(new),
        )
    }

    // Insertion and removal.

    /// Inserts without recording. Used while loading a document.
    pub fn insert_item(&mut self, parent: Option<ItemId>, state: ItemState) -> SceneResult<ItemId> {
        self.validate_placement(parent, &state)?;
        self.graph.insert(parent, state)
    }

    pub fn add_item(&mut self, parent: Option<ItemId>, state: ItemState) -> SceneResult<ItemId> {
        if state.rect.is_empty() && !state.body.is_page() {
            return Err(SceneError::EmptyGeometry);
        }
        self.ensure_recording()?;
        let id = self.insert_item(parent, state)?;
        if let Err(err) = id.notify_creation(self) {
            self.discard_unrecorded(&[id]);
            return Err(err);
        }
        Ok(id)
    }

    pub fn remove_item(&mut self, id: ItemId) -> SceneResult<()> {
        id.notify_deletion(self)?;
        self.drags.remove(&id);
        self.graph.detach(id)?;
        Ok(())
    }

    /// Inserts an offset copy of `id` next to it and records the creation.
    pub fn duplicate_item(&mut self, id: ItemId) -> SceneResult<ItemId> {
        let copy = self
            .item(id)?
            .duplicate(self.duplicate_offset)
            .ok_or(SceneError::NotCopyable(id))?;
        let parent = self.graph.parent(id);
        self.add_item(parent, copy)
    }

    // Property changes.

    pub fn set_position(&mut self, id: ItemId, position: Point) -> SceneResult<()> {
        self.ensure_recording()?;
        self.ensure_live(id)?;
        self.ensure_movable(id, "position")?;
        let state = self.item_mut(id)?;
        let old = state.position();
        state.set_position(position);
        if let Err(err) = id.notify_position_change(self, old, position) {
            self.item_mut(id)?.set_position(old);
            return Err(err);
        }
        Ok(())
    }

    pub fn set_rect(&mut self, id: ItemId, rect: Rect) -> SceneResult<()> {
        if rect.is_empty() {
            return Err(SceneError::EmptyGeometry);
        }
        self.ensure_recording()?;
        self.ensure_live(id)?;
        self.ensure_movable(id, "geometry")?;
        let state = self.item_mut(id)?;
        let old = state.rect();
        state.set_rect(rect);
        let recorded = id.notify_change(
            self,
            AtomKind::ShapeChanged,
            AtomValue::Rect(old),
            AtomValue::Rect(rect),
        );
        if recorded.is_err() {
            self.item_mut(id)?.set_rect(old);
        }
        recorded
    }

    pub fn set_style(&mut self, id: ItemId, style: PaintStyle) -> SceneResult<()> {
        self.ensure_recording()?;
        self.ensure_live(id)?;
        let state = self.item_mut(id)?;
        let before = state.clone();
        if !state.set_style(style) {
            return Err(SceneError::UnsupportedProperty {
                id,
                property: "paint style",
            });
        }
        let recorded = match before.style {
            Some(old) => id.notify_change(
                self,
                AtomKind::ColorChanged,
                AtomValue::Style(old),
                AtomValue::Style(style),
            ),
            // First style on an unstyled item: record the whole state change.
            None => {
                let after = self.item(id)?.clone();
                id.notify_change(
                    self,
                    AtomKind::FullState,
                    AtomValue::State(Box::new(before.clone())),
                    AtomValue::State(Box::new(after)),
                )
            }
        };
        self.revert_on_error(id, before, recorded)
    }

    pub fn set_text(&mut self, id: ItemId, text: impl Into<String>) -> SceneResult<()> {
        self.ensure_recording()?;
        self.ensure_live(id)?;
        let text = text.into();
        let state = self.item_mut(id)?;
        let before = state.clone();
        let old = state
            .text()
            .map(str::to_string)
            .ok_or(SceneError::UnsupportedProperty { id, property: "text" })?;
        state.set_text(text.clone());
        let recorded = id.notify_change(
            self,
            AtomKind::TextChanged,
            AtomValue::Text(old),
            AtomValue::Text(text),
        );
        self.revert_on_error(id, before, recorded)
    }

    pub fn set_annotation(&mut self, id: ItemId, info: AnnotationInfo) -> SceneResult<()> {
        self.ensure_recording()?;
        self.ensure_live(id)?;
        let state = self.item_mut(id)?;
        let before = state.clone();
        let old = state.annotation().cloned().ok_or(SceneError::UnsupportedProperty {
            id,
            property: "annotation info",
        })?;
        state.set_annotation(info.clone());
        let recorded = id.notify_change(
            self,
            AtomKind::AnnotChanged,
            AtomValue::Annotation(old),
            AtomValue::Annotation(info),
        );
        self.revert_on_error(id, before, recorded)
    }

    /// Swaps the whole item state, recorded as one full-state change.
    pub fn replace_state(&mut self, id: ItemId, state: ItemState) -> SceneResult<()> {
        self.ensure_recording()?;
        self.ensure_live(id)?;
        let current = self.item_mut(id)?;
        if current.body.is_page() != state.body.is_page() {
            return Err(SceneError::InvalidPlacement {
                body: state.body.name(),
                place: "in place of this item",
            });
        }
        let old = std::mem::replace(current, state.clone());
        let recorded = id.notify_change(
            self,
            AtomKind::FullState,
            AtomValue::State(Box::new(old.clone())),
            AtomValue::State(Box::new(state)),
        );
        self.revert_on_error(id, old, recorded)
    }

    // Drags and multi-select moves.

    /// Moves `id` without recording. The first call remembers where the drag
    /// started.
    pub fn drag_item(&mut self, id: ItemId, position: Point) -> SceneResult<()> {
        self.ensure_recording()?;
        self.ensure_live(id)?;
        self.ensure_movable(id, "position")?;
        let state = self.item_mut(id)?;
        let origin = state.position();
        state.set_position(position);
        self.drags.entry(id).or_insert(origin);
        Ok(())
    }

    /// Records one position change from the drag origin to where the item is
    /// now. Returns `false` if no drag was in progress. If the move cannot be
    /// recorded the item goes back to its origin.
    pub fn finish_drag(&mut self, id: ItemId) -> SceneResult<bool> {
        let Some(origin) = self.drags.remove(&id) else {
            return Ok(false);
        };
        let current = self.item(id)?.position();
        if let Err(err) = id.notify_position_change(self, origin, current) {
            self.item_mut(id)?.set_position(origin);
            return Err(err);
        }
        Ok(true)
    }

    pub fn cancel_drag(&mut self, id: ItemId) -> SceneResult<()> {
        if let Some(origin) = self.drags.remove(&id) {
            self.item_mut(id)?.set_position(origin);
        }
        Ok(())
    }

    pub fn is_dragging(&self, id: ItemId) -> bool {
        self.drags.contains_key(&id)
    }

    /// Puts every item still being dragged back at its drag origin.
    fn cancel_all_drags(&mut self) {
        for (id, origin) in std::mem::take(&mut self.drags) {
            if let Some(state) = self.graph.get_mut(id) {
                state.set_position(origin);
            }
            tracing::debug!(%id, "drag cancelled");
        }
    }

    pub fn move_items(&mut self, ids: &[ItemId], delta_x: f64, delta_y: f64) -> SceneResult<()> {
        self.transaction("move items", |scene| {
            for id in ids {
                let target = scene.item(*id)?.position().offset(delta_x, delta_y);
                scene.set_position(*id, target)?;
            }
            Ok(())
        })
    }

    // Transactions and replay.

    pub fn begin_transaction(&mut self, label: impl Into<String>) -> SceneResult<()> {
        Ok(self.tracker.begin_transaction(label)?)
    }

    pub fn end_transaction(&mut self) -> SceneResult<bool> {
        let committed = self.tracker.end_transaction()?;
        self.after_record();
        Ok(committed)
    }

    /// Runs `apply` inside one transaction. The transaction is closed even if
    /// `apply` fails, so everything it did stays undoable.
    pub fn transaction<T>(
        &mut self,
        label: &str,
        apply: impl FnOnce(&mut Self) -> SceneResult<T>,
    ) -> SceneResult<T> {
        self.begin_transaction(label)?;
        let result = apply(self);
        let ended = self.end_transaction();
        let value = result?;
        ended?;
        Ok(value)
    }

    /// Cancels any in-flight drag, then replays the newest action backwards.
    pub fn undo(&mut self) -> SceneResult<ReplayReport> {
        self.cancel_all_drags();
        Ok(self.tracker.undo(&mut self.graph)?)
    }

    pub fn redo(&mut self) -> SceneResult<ReplayReport> {
        self.cancel_all_drags();
        Ok(self.tracker.redo(&mut self.graph)?)
    }

    /// Forgets all history and frees every detached item.
    pub fn reset_history(&mut self) {
        self.tracker.reset();
        self.after_record();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rgba;

    fn scene_with_page() -> (Scene, ItemId) {
        let mut scene = Scene::new();
        let page = scene
            .insert_item(None, ItemState::page(0, 612.0, 792.0))
            .expect("page should insert");
        (scene, page)
    }

    fn black_rect(rect: Rect) -> ItemState {
        ItemState::rectangle(rect, PaintStyle::stroke(Rgba::BLACK, 1.0))
    }

    #[test]
    fn equal_values_are_not_recorded() {
        let (mut scene, page) = scene_with_page();
        let id = scene
            .insert_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();

        scene
            .notify_change(
                id,
                AtomKind::ShapeChanged,
                AtomValue::Rect(Rect::new(0.0, 0.0, 5.0, 5.0)),
                AtomValue::Rect(Rect::new(0.0, 0.0, 5.0, 5.0)),
            )
            .unwrap();
        scene.set_position(id, Point::new(0.0, 0.0)).unwrap();
        assert_eq!(scene.tracker().undo_depth(), 0);
    }

    #[test]
    fn notifying_for_detached_item_fails() {
        let (mut scene, page) = scene_with_page();
        let id = scene
            .add_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        scene.remove_item(id).unwrap();

        let err = scene
            .notify_position_change(id, Point::new(0.0, 0.0), Point::new(1.0, 1.0))
            .expect_err("detached items cannot notify");
        assert!(matches!(
            err,
            SceneError::Track(TrackError::DetachedItem(item)) if item == id
        ));
        let err = scene.notify_deletion(id).expect_err("already removed");
        assert!(matches!(err, SceneError::Track(TrackError::DetachedItem(_))));
    }

    #[test]
    fn structural_kinds_are_refused_by_change_path() {
        let (mut scene, page) = scene_with_page();
        let err = scene
            .notify_change(
                page,
                AtomKind::Create,
                AtomValue::None,
                AtomValue::Position(Point::default()),
            )
            .expect_err("creation has its own path");
        assert!(matches!(
            err,
            SceneError::Track(TrackError::UnsupportedValue {
                kind: AtomKind::Create
            })
        ));
    }

    #[test]
    fn annotations_must_live_on_pages() {
        let (mut scene, page) = scene_with_page();
        let err = scene
            .add_item(None, black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .expect_err("root is reserved for pages");
        assert!(matches!(err, SceneError::InvalidPlacement { .. }));

        let err = scene
            .insert_item(Some(page), ItemState::page(1, 10.0, 10.0))
            .expect_err("pages do not nest");
        assert!(matches!(err, SceneError::InvalidPlacement { .. }));
    }

    #[test]
    fn drag_records_only_origin_and_final_position() {
        let (mut scene, page) = scene_with_page();
        let id = scene
            .insert_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();

        for step in 1..=20 {
            let offset = f64::from(step) * 5.0;
            scene.drag_item(id, Point::new(offset, offset)).unwrap();
        }
        assert_eq!(scene.tracker().undo_depth(), 0);
        assert!(scene.finish_drag(id).unwrap());
        assert_eq!(scene.tracker().undo_depth(), 1);

        scene.undo().unwrap();
        assert_eq!(scene.item(id).unwrap().position(), Point::new(0.0, 0.0));
        scene.redo().unwrap();
        assert_eq!(scene.item(id).unwrap().position(), Point::new(100.0, 100.0));
        assert!(!scene.finish_drag(id).unwrap());
    }

    #[test]
    fn cancelled_drag_restores_origin_without_recording() {
        let (mut scene, page) = scene_with_page();
        let id = scene
            .insert_item(Some(page), black_rect(Rect::new(3.0, 4.0, 5.0, 5.0)))
            .unwrap();
        scene.drag_item(id, Point::new(50.0, 50.0)).unwrap();
        scene.cancel_drag(id).unwrap();

        assert_eq!(scene.item(id).unwrap().position(), Point::new(3.0, 4.0));
        assert!(!scene.is_dragging(id));
        assert_eq!(scene.tracker().undo_depth(), 0);
    }

    #[test]
    fn multi_select_move_is_one_action() {
        let (mut scene, page) = scene_with_page();
        let a = scene
            .insert_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        let b = scene
            .insert_item(Some(page), black_rect(Rect::new(10.0, 10.0, 5.0, 5.0)))
            .unwrap();

        scene.move_items(&[a, b], 7.0, -2.0).unwrap();
        assert_eq!(scene.tracker().undo_depth(), 1);
        assert_eq!(scene.tracker().undo_actions()[0].len(), 2);

        scene.undo().unwrap();
        assert_eq!(scene.item(a).unwrap().position(), Point::new(0.0, 0.0));
        assert_eq!(scene.item(b).unwrap().position(), Point::new(10.0, 10.0));
    }

    #[test]
    fn duplicate_item_is_recorded_as_creation() {
        let (mut scene, page) = scene_with_page();
        let original = scene
            .add_item(Some(page), black_rect(Rect::new(10.0, 10.0, 20.0, 20.0)))
            .unwrap();

        let copy = scene.duplicate_item(original).unwrap();
        assert_eq!(
            scene.item(copy).unwrap().rect,
            Rect::new(20.0, 20.0, 20.0, 20.0)
        );
        assert_eq!(scene.graph().parent(copy), Some(page));
        assert_eq!(scene.tracker().undo_depth(), 2);

        scene.undo().unwrap();
        assert!(!scene.contains(copy));
        assert!(scene.contains(original));

        let err = scene.duplicate_item(page).expect_err("pages use duplicate_page");
        assert!(matches!(err, SceneError::NotCopyable(_)));
    }

    #[test]
    fn text_style_and_annotation_changes_undo_independently() {
        let (mut scene, page) = scene_with_page();
        let square = scene
            .add_item(
                Some(page),
                ItemState::square(
                    Rect::new(0.0, 0.0, 10.0, 10.0),
                    PaintStyle::stroke(Rgba::RED, 1.0),
                    AnnotationInfo {
                        title: "me".to_string(),
                        content: "first".to_string(),
                    },
                ),
            )
            .unwrap();

        scene.set_text(square, "second").unwrap();
        scene
            .set_style(square, PaintStyle::stroke(Rgba::BLUE, 2.0))
            .unwrap();
        scene
            .set_annotation(
                square,
                AnnotationInfo {
                    title: "you".to_string(),
                    content: "third".to_string(),
                },
            )
            .unwrap();

        scene.undo().unwrap();
        assert_eq!(
            scene.item(square).unwrap().annotation().unwrap().title,
            "me"
        );
        scene.undo().unwrap();
        assert_eq!(
            scene.item(square).unwrap().style,
            Some(PaintStyle::stroke(Rgba::RED, 1.0))
        );
        scene.undo().unwrap();
        assert_eq!(scene.item(square).unwrap().text(), Some("first"));
    }

    #[test]
    fn unsupported_properties_are_reported() {
        let (mut scene, page) = scene_with_page();
        let id = scene
            .insert_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        let err = scene.set_text(id, "x").expect_err("rectangles carry no text");
        assert!(matches!(err, SceneError::UnsupportedProperty { .. }));

        let err = scene
            .set_style(page, PaintStyle::default())
            .expect_err("pages are not colorable");
        assert!(matches!(err, SceneError::UnsupportedProperty { .. }));
        assert_eq!(scene.tracker().undo_depth(), 0);
    }

    #[test]
    fn replace_state_is_a_single_full_state_change() {
        let (mut scene, page) = scene_with_page();
        let id = scene
            .insert_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        let before = scene.item(id).unwrap().clone();
        let after = ItemState::redaction(
            Rect::new(1.0, 1.0, 9.0, 9.0),
            PaintStyle::filled(Rgba::BLACK, 0.0, Rgba::BLACK),
        );

        scene.replace_state(id, after.clone()).unwrap();
        assert_eq!(scene.item(id).unwrap(), &after);
        scene.undo().unwrap();
        assert_eq!(scene.item(id).unwrap(), &before);
    }

    #[test]
    fn redo_branch_is_purged_once_a_new_action_is_recorded() {
        let (mut scene, page) = scene_with_page();
        let id = scene
            .add_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        scene.undo().unwrap();
        assert!(scene.graph().contains(id));

        scene
            .add_item(Some(page), black_rect(Rect::new(1.0, 1.0, 5.0, 5.0)))
            .unwrap();
        assert!(!scene.graph().contains(id));
    }

    /// A scene whose tracker halted on an inconsistent CREATE, plus a live
    /// rectangle at (3, 3).
    fn halted_scene() -> (Scene, ItemId, ItemId) {
        let (mut scene, page) = scene_with_page();
        let live = scene
            .insert_item(Some(page), black_rect(Rect::new(3.0, 3.0, 5.0, 5.0)))
            .unwrap();
        let gone = scene
            .add_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        scene.remove_item(gone).unwrap();
        scene
            .tracker_mut()
            .item_added(Atom::create(
                gone,
                Placement {
                    parent: Some(page),
                    index: 0,
                },
            ))
            .unwrap();
        scene.undo().expect_err("CREATE of a detached item cannot be undone");
        assert!(scene.tracker().is_poisoned());
        (scene, page, live)
    }

    #[test]
    fn halted_tracker_leaves_scene_untouched() {
        let (mut scene, page, live) = halted_scene();
        let depth = scene.tracker().undo_depth();
        let children = scene.graph().children(Some(page)).to_vec();

        let err = scene
            .set_position(live, Point::new(77.0, 77.0))
            .expect_err("recording is halted");
        assert!(matches!(err, SceneError::Track(TrackError::Poisoned(_))));
        assert_eq!(scene.item(live).unwrap().position(), Point::new(3.0, 3.0));

        scene
            .set_rect(live, Rect::new(0.0, 0.0, 40.0, 40.0))
            .expect_err("recording is halted");
        scene
            .set_style(live, PaintStyle::stroke(Rgba::BLUE, 4.0))
            .expect_err("recording is halted");
        scene
            .drag_item(live, Point::new(9.0, 9.0))
            .expect_err("recording is halted");
        assert_eq!(
            scene.item(live).unwrap(),
            &black_rect(Rect::new(3.0, 3.0, 5.0, 5.0))
        );
        assert!(!scene.is_dragging(live));

        scene
            .add_item(Some(page), black_rect(Rect::new(1.0, 1.0, 5.0, 5.0)))
            .expect_err("recording is halted");
        scene
            .duplicate_item(live)
            .expect_err("recording is halted");
        assert_eq!(scene.graph().children(Some(page)), children.as_slice());
        assert_eq!(scene.tracker().undo_depth(), depth);
    }

    #[test]
    fn undo_during_drag_puts_item_back_first() {
        let (mut scene, page) = scene_with_page();
        let dragged = scene
            .insert_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        let added = scene
            .add_item(Some(page), black_rect(Rect::new(30.0, 30.0, 5.0, 5.0)))
            .unwrap();

        scene.drag_item(dragged, Point::new(50.0, 50.0)).unwrap();
        scene.undo().unwrap();
        assert_eq!(scene.item(dragged).unwrap().position(), Point::new(0.0, 0.0));
        assert!(!scene.is_dragging(dragged));
        assert!(!scene.contains(added));

        scene.drag_item(dragged, Point::new(8.0, 8.0)).unwrap();
        scene.redo().unwrap();
        assert_eq!(scene.item(dragged).unwrap().position(), Point::new(0.0, 0.0));
        assert!(scene.contains(added));
        assert_eq!(scene.tracker().undo_depth(), 1);
        assert_eq!(scene.tracker().redo_depth(), 0);
    }

    #[test]
    fn first_style_on_unstyled_item_is_a_full_state_change() {
        let (mut scene, page) = scene_with_page();
        let rect = Rect::new(2.0, 2.0, 6.0, 6.0);
        let id = scene
            .insert_item(Some(page), ItemState::new(rect, None, ItemBody::Rectangle))
            .unwrap();
        let style = PaintStyle::stroke(Rgba::RED, 2.0);

        scene.set_style(id, style).unwrap();
        let atoms = scene.tracker().undo_actions()[0].atoms();
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].kind(), AtomKind::FullState);
        assert_eq!(scene.item(id).unwrap().style, Some(style));

        scene.undo().unwrap();
        assert_eq!(scene.item(id).unwrap().style, None);
        assert_eq!(scene.item(id).unwrap().rect, rect);
        scene.redo().unwrap();
        assert_eq!(scene.item(id).unwrap().style, Some(style));
    }

    #[test]
    fn pages_cannot_be_moved_or_resized() {
        let (mut scene, page) = scene_with_page();
        let before = scene.item(page).unwrap().clone();

        let err = scene
            .set_position(page, Point::new(10.0, 10.0))
            .expect_err("page origin is fixed");
        assert!(matches!(
            err,
            SceneError::UnsupportedProperty { id, property: "position" } if id == page
        ));
        let err = scene
            .set_rect(page, Rect::new(0.0, 0.0, 10.0, 10.0))
            .expect_err("page geometry is fixed");
        assert!(matches!(
            err,
            SceneError::UnsupportedProperty { property: "geometry", .. }
        ));
        scene
            .drag_item(page, Point::new(5.0, 5.0))
            .expect_err("pages are not draggable");

        assert_eq!(scene.item(page).unwrap(), &before);
        assert!(!scene.is_dragging(page));
        assert_eq!(scene.tracker().undo_depth(), 0);
    }

    #[test]
    fn transaction_closes_even_when_body_fails() {
        let (mut scene, page) = scene_with_page();
        let id = scene
            .insert_item(Some(page), black_rect(Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();

        let result = scene.transaction("broken", |scene| {
            scene.set_position(id, Point::new(4.0, 4.0))?;
            scene.set_text(id, "no text here")
        });
        assert!(result.is_err());
        assert!(!scene.tracker().in_transaction());
        assert_eq!(scene.tracker().undo_depth(), 1);

        scene.undo().unwrap();
        assert_eq!(scene.item(id).unwrap().position(), Point::new(0.0, 0.0));
    }
}
