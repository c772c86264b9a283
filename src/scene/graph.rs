use std::collections::{HashMap, HashSet};

use super::item::{ItemId, ItemState};
use super::{SceneError, SceneResult};

#[derive(Debug, Clone)]
struct Node {
    state: ItemState,
    parent: Option<ItemId>,
    children: Vec<ItemId>,
    attached: bool,
}

/// Where an item sat among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent: Option<ItemId>,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReattachOutcome {
    Restored,
    /// The recorded parent no longer exists; the item went to the root.
    FallbackToRoot,
}

/// Arena-backed parent/child tree. Root children are the document pages.
///
/// Detaching unlinks an item from its parent but keeps it (and its subtree)
/// in the arena, so history can bring it back.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: HashMap<ItemId, Node>,
    roots: Vec<ItemId>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn node(&self, id: ItemId) -> SceneResult<&Node> {
        self.nodes.get(&id).ok_or(SceneError::ItemNotFound(id))
    }

    fn node_mut(&mut self, id: ItemId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(SceneError::ItemNotFound(id))
    }

    fn siblings_mut(&mut self, parent: Option<ItemId>) -> SceneResult<&mut Vec<ItemId>> {
        match parent {
            Some(parent) => Ok(&mut self.node_mut(parent)?.children),
            None => Ok(&mut self.roots),
        }
    }

    pub fn insert(&mut self, parent: Option<ItemId>, state: ItemState) -> SceneResult<ItemId> {
        let index = self.children(parent).len();
        self.insert_at(parent, index, state)
    }

    pub fn insert_at(
        &mut self,
        parent: Option<ItemId>,
        index: usize,
        state: ItemState,
    ) -> SceneResult<ItemId> {
        if let Some(parent) = parent {
            self.node(parent)?;
        }
        let id = self.allocate_id();
        self.nodes.insert(
            id,
            Node {
                state,
                parent,
                children: Vec::new(),
                attached: true,
            },
        );
        let siblings = self.siblings_mut(parent)?;
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        Ok(id)
    }

    /// Present in the arena, attached or not.
    pub fn contains(&self, id: ItemId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Reachable from the root through attached links.
    pub fn is_live(&self, id: ItemId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            match self.nodes.get(&id) {
                Some(node) if node.attached => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn is_attached(&self, id: ItemId) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.attached)
    }

    pub fn get(&self, id: ItemId) -> Option<&ItemState> {
        self.nodes.get(&id).map(|node| &node.state)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut ItemState> {
        self.nodes.get_mut(&id).map(|node| &mut node.state)
    }

    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, parent: Option<ItemId>) -> &[ItemId] {
        match parent {
            Some(parent) => self
                .nodes
                .get(&parent)
                .map_or(&[][..], |node| node.children.as_slice()),
            None => &self.roots,
        }
    }

    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    pub fn placement(&self, id: ItemId) -> SceneResult<Placement> {
        let node = self.node(id)?;
        if !node.attached {
            return Err(SceneError::Detached(id));
        }
        let index = self
            .children(node.parent)
            .iter()
            .position(|sibling| *sibling == id)
            .ok_or(SceneError::Detached(id))?;
        Ok(Placement {
            parent: node.parent,
            index,
        })
    }

    pub fn detach(&mut self, id: ItemId) -> SceneResult<Placement> {
        let placement = self.placement(id)?;
        self.siblings_mut(placement.parent)?.remove(placement.index);
        self.node_mut(id)?.attached = false;
        Ok(placement)
    }

    /// Links a detached item back under `parent`, clamping `index`. A parent
    /// that has been purged sends the item to the root instead.
    pub fn reattach(
        &mut self,
        id: ItemId,
        parent: Option<ItemId>,
        index: usize,
    ) -> SceneResult<ReattachOutcome> {
        let node = self.node(id)?;
        if node.attached {
            return Err(SceneError::AlreadyAttached(id));
        }

        let (parent, outcome) = match parent {
            Some(parent) if !self.contains(parent) => (None, ReattachOutcome::FallbackToRoot),
            other => (other, ReattachOutcome::Restored),
        };

        let siblings = self.siblings_mut(parent)?;
        let index = index.min(siblings.len());
        siblings.insert(index, id);

        let node = self.node_mut(id)?;
        node.parent = parent;
        node.attached = true;
        Ok(outcome)
    }

    /// Replaces the root order. `order` must be a permutation of the roots.
    pub fn set_root_order(&mut self, order: &[ItemId]) -> SceneResult<()> {
        let current: HashSet<ItemId> = self.roots.iter().copied().collect();
        let requested: HashSet<ItemId> = order.iter().copied().collect();
        if order.len() != self.roots.len() || current != requested {
            return Err(SceneError::OrderMismatch);
        }
        self.roots = order.to_vec();
        Ok(())
    }

    /// `id` followed by every item below it, depth first.
    pub fn subtree(&self, id: ItemId) -> Vec<ItemId> {
        let mut collected = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.get(&next) {
                collected.push(next);
                pending.extend(node.children.iter().rev().copied());
            }
        }
        collected
    }

    /// Copies the subtree under `id` and inserts it under `parent` at `index`.
    /// Returns the id of the copied root.
    pub fn clone_subtree(
        &mut self,
        id: ItemId,
        parent: Option<ItemId>,
        index: usize,
    ) -> SceneResult<ItemId> {
        let state = self.node(id)?.state.clone();
        let children = self.node(id)?.children.clone();
        let copy = self.insert_at(parent, index, state)?;
        for child in children {
            let position = self.children(Some(copy)).len();
            self.clone_subtree(child, Some(copy), position)?;
        }
        Ok(copy)
    }

    /// Drops detached subtrees whose items are not in `keep`. Returns how many
    /// items were freed.
    pub fn purge_detached(&mut self, keep: &HashSet<ItemId>) -> usize {
        let detached_roots: Vec<ItemId> = self
            .nodes
            .iter()
            .filter(|(_, node)| !node.attached)
            .map(|(id, _)| *id)
            .collect();

        let mut freed = 0;
        for root in detached_roots {
            if !self.contains(root) {
                continue;
            }
            let subtree = self.subtree(root);
            if subtree.iter().any(|id| keep.contains(id)) {
                continue;
            }
            for id in subtree {
                self.nodes.remove(&id);
                freed += 1;
            }
        }
        freed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::style::PaintStyle;

    fn rect_item() -> ItemState {
        ItemState::rectangle(Rect::new(0.0, 0.0, 10.0, 10.0), PaintStyle::default())
    }

    #[test]
    fn insert_places_children_in_order_under_parent() {
        let mut graph = SceneGraph::new();
        let page = graph.insert(None, ItemState::page(0, 100.0, 100.0)).unwrap();
        let first = graph.insert(Some(page), rect_item()).unwrap();
        let second = graph.insert_at(Some(page), 0, rect_item()).unwrap();

        assert_eq!(graph.children(Some(page)), &[second, first]);
        assert_eq!(graph.parent(first), Some(page));
        assert!(graph.is_live(first));
    }

    #[test]
    fn insert_under_unknown_parent_fails() {
        let mut graph = SceneGraph::new();
        let err = graph
            .insert(Some(ItemId(99)), rect_item())
            .expect_err("parent must exist");
        assert!(matches!(err, SceneError::ItemNotFound(ItemId(99))));
    }

    #[test]
    fn detach_keeps_subtree_in_arena_and_reattach_restores_index() {
        let mut graph = SceneGraph::new();
        let page = graph.insert(None, ItemState::page(0, 100.0, 100.0)).unwrap();
        let a = graph.insert(Some(page), rect_item()).unwrap();
        let b = graph.insert(Some(page), rect_item()).unwrap();
        let c = graph.insert(Some(page), rect_item()).unwrap();

        let placement = graph.detach(b).unwrap();
        assert_eq!(
            placement,
            Placement {
                parent: Some(page),
                index: 1
            }
        );
        assert!(graph.contains(b));
        assert!(!graph.is_live(b));
        assert_eq!(graph.children(Some(page)), &[a, c]);

        let outcome = graph.reattach(b, placement.parent, placement.index).unwrap();
        assert_eq!(outcome, ReattachOutcome::Restored);
        assert_eq!(graph.children(Some(page)), &[a, b, c]);
    }

    #[test]
    fn children_of_detached_page_are_not_live() {
        let mut graph = SceneGraph::new();
        let page = graph.insert(None, ItemState::page(0, 100.0, 100.0)).unwrap();
        let child = graph.insert(Some(page), rect_item()).unwrap();

        graph.detach(page).unwrap();
        assert!(graph.is_attached(child));
        assert!(!graph.is_live(child));
    }

    #[test]
    fn reattach_falls_back_to_root_when_parent_was_purged() {
        let mut graph = SceneGraph::new();
        let page = graph.insert(None, ItemState::page(0, 100.0, 100.0)).unwrap();
        let child = graph.insert(Some(page), rect_item()).unwrap();

        graph.detach(child).unwrap();
        graph.detach(page).unwrap();
        let keep: HashSet<ItemId> = [child].into_iter().collect();
        assert_eq!(graph.purge_detached(&keep), 1);
        assert!(!graph.contains(page));

        let outcome = graph.reattach(child, Some(page), 0).unwrap();
        assert_eq!(outcome, ReattachOutcome::FallbackToRoot);
        assert_eq!(graph.roots(), &[child]);
        assert_eq!(graph.parent(child), None);
    }

    #[test]
    fn purge_keeps_subtrees_with_referenced_items() {
        let mut graph = SceneGraph::new();
        let page = graph.insert(None, ItemState::page(0, 100.0, 100.0)).unwrap();
        let child = graph.insert(Some(page), rect_item()).unwrap();
        graph.detach(page).unwrap();

        let keep: HashSet<ItemId> = [child].into_iter().collect();
        assert_eq!(graph.purge_detached(&keep), 0);
        assert!(graph.contains(page));

        assert_eq!(graph.purge_detached(&HashSet::new()), 2);
        assert!(graph.is_empty());
    }

    #[test]
    fn root_order_must_be_a_permutation() {
        let mut graph = SceneGraph::new();
        let p1 = graph.insert(None, ItemState::page(0, 1.0, 1.0)).unwrap();
        let p2 = graph.insert(None, ItemState::page(1, 1.0, 1.0)).unwrap();

        graph.set_root_order(&[p2, p1]).unwrap();
        assert_eq!(graph.roots(), &[p2, p1]);

        let err = graph.set_root_order(&[p1]).expect_err("dropping a page is not a reorder");
        assert!(matches!(err, SceneError::OrderMismatch));
    }

    #[test]
    fn clone_subtree_copies_children_with_new_ids() {
        let mut graph = SceneGraph::new();
        let page = graph.insert(None, ItemState::page(0, 1.0, 1.0)).unwrap();
        let child = graph.insert(Some(page), rect_item()).unwrap();

        let copy = graph.clone_subtree(page, None, 1).unwrap();
        assert_ne!(copy, page);
        assert_eq!(graph.roots(), &[page, copy]);
        let copied_children = graph.children(Some(copy)).to_vec();
        assert_eq!(copied_children.len(), 1);
        assert_ne!(copied_children[0], child);
        assert_eq!(graph.get(copied_children[0]), graph.get(child));
    }
}
