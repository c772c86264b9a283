use super::atom::{AtomKind, AtomValue};
use crate::geometry::Point;
use crate::scene::{ItemId, Scene, SceneResult};

/// Change announcements for anything that lives in a [`Scene`].
///
/// These are the only calls that reach the tracker; none of them touch the
/// undo or redo stacks directly. Deletion must be announced while the item is
/// still attached.
pub trait Undoable {
    fn handle(&self) -> ItemId;

    fn notify_creation(&self, scene: &mut Scene) -> SceneResult<()> {
        scene.notify_creation(self.handle())
    }

    fn notify_deletion(&self, scene: &mut Scene) -> SceneResult<()> {
        scene.notify_deletion(self.handle())
    }

    /// No-op when `old == new`.
    fn notify_change(
        &self,
        scene: &mut Scene,
        kind: AtomKind,
        old: AtomValue,
        new: AtomValue,
    ) -> SceneResult<()> {
        scene.notify_change(self.handle(), kind, old, new)
    }

    fn notify_position_change(&self, scene: &mut Scene, old: Point, new: Point) -> SceneResult<()> {
        scene.notify_position_change(self.handle(), old, new)
    }
}

impl Undoable for ItemId {
    fn handle(&self) -> ItemId {
        *self
    }
}
