use super::{ItemId, ItemState, Scene, SceneError, SceneResult};
use crate::history::{AtomKind, AtomValue, PageSlot, Undoable};

impl Scene {
    /// Root items in display order.
    pub fn pages(&self) -> &[ItemId] {
        self.graph.roots()
    }

    pub fn page_index(&self, page: ItemId) -> Option<usize> {
        self.pages().iter().position(|id| *id == page)
    }

    fn ensure_page(&self, page: ItemId) -> SceneResult<usize> {
        let is_page = self.item(page)?.body.is_page();
        match self.page_index(page) {
            Some(index) if is_page => Ok(index),
            Some(_) => Err(SceneError::NotAPage(page)),
            None if is_page => Err(SceneError::Detached(page)),
            None => Err(SceneError::NotAPage(page)),
        }
    }

    fn record_page_order(&mut self, old: Vec<ItemId>) -> SceneResult<()> {
        let new = self.pages().to_vec();
        self.notify_any_change(
            AtomKind::PageOrderChanged,
            None,
            AtomValue::Order(old),
            AtomValue::Order(new),
        )
    }

    /// Appends `pages` after the last page as one recorded action.
    pub fn add_pages(&mut self, pages: Vec<ItemState>) -> SceneResult<Vec<ItemId>> {
        if let Some(state) = pages.iter().find(|state| !state.body.is_page()) {
            return Err(SceneError::InvalidPlacement {
                body: state.body.name(),
                place: "as a page",
            });
        }
        self.ensure_recording()?;
        let mut slots = Vec::with_capacity(pages.len());
        for state in pages {
            let page = self.graph.insert(None, state)?;
            let index = self.page_index(page).ok_or(SceneError::Detached(page))?;
            slots.push(PageSlot { page, index });
        }
        let added: Vec<ItemId> = slots.iter().map(|slot| slot.page).collect();
        if !slots.is_empty() {
            let recorded = self.notify_any_change(
                AtomKind::PagesAdded,
                None,
                AtomValue::None,
                AtomValue::Pages(slots),
            );
            if let Err(err) = recorded {
                self.discard_unrecorded(&added);
                return Err(err);
            }
        }
        Ok(added)
    }

    /// Removes the page and everything on it. Children go first so a single
    /// undo puts them back in their original order.
    pub fn delete_page(&mut self, page: ItemId) -> SceneResult<()> {
        self.ensure_page(page)?;
        self.transaction("delete page", |scene| {
            let children = scene.graph.children(Some(page)).to_vec();
            for child in children {
                scene.remove_item(child)?;
            }
            scene.remove_item(page)
        })
    }

    /// Copies `page` with its annotations and places the copy right after it.
    pub fn duplicate_page(&mut self, page: ItemId) -> SceneResult<ItemId> {
        let index = self.ensure_page(page)?;
        self.transaction("duplicate page", |scene| {
            let end = scene.pages().len();
            let copy = scene.graph.clone_subtree(page, None, end)?;
            copy.notify_creation(scene)?;

            let old = scene.pages().to_vec();
            let mut order: Vec<ItemId> = old.iter().copied().filter(|id| *id != copy).collect();
            order.insert(index + 1, copy);
            scene.graph.set_root_order(&order)?;
            scene.record_page_order(old)?;
            Ok(copy)
        })
    }

    /// Duplicates several pages at once; every copy lands after its source.
    pub fn duplicate_pages(&mut self, pages: &[ItemId]) -> SceneResult<Vec<ItemId>> {
        for page in pages {
            self.ensure_page(*page)?;
        }
        self.ensure_recording()?;
        let mut slots = Vec::with_capacity(pages.len());
        for page in pages {
            let index = self.ensure_page(*page)? + 1;
            let copy = self.graph.clone_subtree(*page, None, index)?;
            slots.push(PageSlot { page: copy, index });
        }
        let copies: Vec<ItemId> = slots.iter().map(|slot| slot.page).collect();
        if !slots.is_empty() {
            let recorded = self.notify_any_change(
                AtomKind::PagesDuplicated,
                None,
                AtomValue::None,
                AtomValue::Pages(slots),
            );
            if let Err(err) = recorded {
                self.discard_unrecorded(&copies);
                return Err(err);
            }
        }
        Ok(copies)
    }

    /// Turns each page a quarter turn. One action, one atom per page.
    pub fn rotate_pages(&mut self, pages: &[ItemId], clockwise: bool) -> SceneResult<()> {
        for page in pages {
            self.ensure_page(*page)?;
        }
        self.transaction("rotate pages", |scene| {
            for page in pages {
                let info = scene
                    .graph
                    .get_mut(*page)
                    .and_then(|state| state.page_info_mut())
                    .ok_or(SceneError::NotAPage(*page))?;
                let old = info.rotation;
                info.rotation = old.rotated(clockwise);
                let new = info.rotation;
                let recorded = page.notify_change(
                    scene,
                    AtomKind::PagesRotated,
                    AtomValue::Rotation(old),
                    AtomValue::Rotation(new),
                );
                if let Err(err) = recorded {
                    if let Some(info) = scene
                        .graph
                        .get_mut(*page)
                        .and_then(|state| state.page_info_mut())
                    {
                        info.rotation = old;
                    }
                    return Err(err);
                }
            }
            Ok(())
        })
    }

    pub fn move_page(&mut self, page: ItemId, to_index: usize) -> SceneResult<()> {
        let from = self.ensure_page(page)?;
        self.ensure_recording()?;
        let old = self.pages().to_vec();
        let to_index = to_index.min(old.len() - 1);
        if from == to_index {
            return Ok(());
        }
        let mut order = old.clone();
        order.remove(from);
        order.insert(to_index, page);
        self.graph.set_root_order(&order)?;
        if let Err(err) = self.record_page_order(old.clone()) {
            self.graph.set_root_order(&old)?;
            return Err(err);
        }
        Ok(())
    }
}
