//! Open documents, one tab each.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scene::Scene;

pub type WorkspaceResult<T> = std::result::Result<T, WorkspaceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("no tab with id {0}")]
    UnknownTab(TabId),
    #[error("no document is open")]
    NoActiveTab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct Tab {
    id: TabId,
    path: PathBuf,
    scene: Scene,
    saved_serial: Option<u64>,
}

impl Tab {
    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Differs from the last save when the newest applied action is not the
    /// one that was current at save time.
    pub fn is_modified(&self) -> bool {
        self.scene.tracker().head_serial() != self.saved_serial
    }

    pub fn mark_saved(&mut self) {
        self.saved_serial = self.scene.tracker().head_serial();
    }

    pub fn title(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        if self.is_modified() {
            format!("{name} *")
        } else {
            name
        }
    }
}

#[derive(Debug, Default)]
pub struct Workspace {
    tabs: Vec<Tab>,
    active: Option<TabId>,
    next_id: u64,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tab for `path`, or activates the existing one if the file is
    /// already open. Returns the tab id and whether a new tab was made.
    pub fn open(
        &mut self,
        path: impl Into<PathBuf>,
        load: impl FnOnce() -> Scene,
    ) -> (TabId, bool) {
        let path = path.into();
        if let Some(id) = self.find(&path) {
            self.active = Some(id);
            tracing::debug!(?path, %id, "document already open; activating tab");
            return (id, false);
        }

        self.next_id = self.next_id.saturating_add(1);
        let id = TabId(self.next_id);
        let scene = load();
        let saved_serial = scene.tracker().head_serial();
        tracing::info!(?path, %id, "opened document");
        self.tabs.push(Tab {
            id,
            path,
            scene,
            saved_serial,
        });
        self.active = Some(id);
        (id, true)
    }

    pub fn find(&self, path: &Path) -> Option<TabId> {
        self.tabs.iter().find(|tab| tab.path == path).map(|tab| tab.id)
    }

    fn position(&self, id: TabId) -> WorkspaceResult<usize> {
        self.tabs
            .iter()
            .position(|tab| tab.id == id)
            .ok_or(WorkspaceError::UnknownTab(id))
    }

    /// Closes `id`. The neighbouring tab becomes active if `id` was.
    pub fn close(&mut self, id: TabId) -> WorkspaceResult<Tab> {
        let index = self.position(id)?;
        let tab = self.tabs.remove(index);
        if self.active == Some(id) {
            self.active = self
                .tabs
                .get(index)
                .or_else(|| self.tabs.last())
                .map(|tab| tab.id);
        }
        tracing::info!(path = ?tab.path, %id, "closed document");
        Ok(tab)
    }

    pub fn activate(&mut self, id: TabId) -> WorkspaceResult<()> {
        self.position(id)?;
        self.active = Some(id);
        Ok(())
    }

    pub fn active_id(&self) -> Option<TabId> {
        self.active
    }

    pub fn active(&self) -> WorkspaceResult<&Tab> {
        let id = self.active.ok_or(WorkspaceError::NoActiveTab)?;
        self.tab(id)
    }

    pub fn active_mut(&mut self) -> WorkspaceResult<&mut Tab> {
        let id = self.active.ok_or(WorkspaceError::NoActiveTab)?;
        self.tab_mut(id)
    }

    pub fn tab(&self, id: TabId) -> WorkspaceResult<&Tab> {
        let index = self.position(id)?;
        Ok(&self.tabs[index])
    }

    pub fn tab_mut(&mut self, id: TabId) -> WorkspaceResult<&mut Tab> {
        let index = self.position(id)?;
        Ok(&mut self.tabs[index])
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tabs.iter().any(Tab::is_modified)
    }
}
