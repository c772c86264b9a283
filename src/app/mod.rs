use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::document::{
    load_scene, spawn_word_extraction, DocumentLoader, NoBackend, PageNumber, Word, WordIndex,
};
use crate::error::AppResult;
use crate::ipc::{acquire, Instance, InstanceRequest};
use crate::scene::SceneOptions;
use crate::style::{StyleDefaults, StyleTool};
use crate::worker::{WorkerHandle, WorkerPoll};
use crate::workspace::{TabId, Workspace};

mod bootstrap;

use self::bootstrap::*;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

type WordExtraction = WorkerHandle<Vec<(PageNumber, Vec<Word>)>>;

/// Headless editor runtime: the workspace plus the background jobs that
/// feed it.
pub struct App {
    workspace: Workspace,
    loader: Box<dyn DocumentLoader>,
    scene_options: SceneOptions,
    style_defaults: StyleDefaults,
    word_indexes: HashMap<TabId, Arc<WordIndex>>,
    extractions: Vec<(TabId, WordExtraction)>,
}

impl App {
    pub fn new() -> Self {
        Self::with_loader(
            Box::new(NoBackend),
            SceneOptions::default(),
            StyleDefaults::default(),
        )
    }

    pub fn with_loader(
        loader: Box<dyn DocumentLoader>,
        scene_options: SceneOptions,
        style_defaults: StyleDefaults,
    ) -> Self {
        Self {
            workspace: Workspace::new(),
            loader,
            scene_options,
            style_defaults,
            word_indexes: HashMap::new(),
            extractions: Vec::new(),
        }
    }

    /// Becomes the primary instance (or forwards the command line to it) and
    /// then serves open requests until the process is stopped.
    pub fn start(&mut self) -> AppResult<()> {
        let bootstrap = bootstrap_app_runtime();
        self.scene_options = SceneOptions::from(&bootstrap.app_config);
        self.style_defaults = bootstrap.style_defaults;

        let files = bootstrap.startup_config.files;
        let server = match acquire(&bootstrap.socket_path, &files)? {
            Instance::Primary(server) => server,
            Instance::Secondary => return Ok(()),
        };

        for file in &files {
            self.open_or_warn(file);
        }

        tracing::info!(path = ?server.path(), "ready");
        loop {
            for request in server.poll() {
                self.handle_request(request);
            }
            self.poll_workers();
            std::thread::sleep(TICK_INTERVAL);
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn handle_request(&mut self, request: InstanceRequest) {
        match request {
            InstanceRequest::Open { filename } => self.open_or_warn(&filename),
        }
    }

    fn open_or_warn(&mut self, path: &Path) {
        if let Err(err) = self.open_document(path) {
            tracing::warn!(?err, ?path, "failed to open document");
        }
    }

    /// Opens `path` in a new tab, or focuses the tab that already shows it.
    /// Word extraction for a new tab starts in the background.
    pub fn open_document(&mut self, path: &Path) -> AppResult<TabId> {
        if let Some(id) = self.workspace.find(path) {
            self.workspace.activate(id)?;
            return Ok(id);
        }

        let source = self.loader.open(path)?;
        let scene = load_scene(
            source.as_ref(),
            self.scene_options,
            self.style_defaults.style_for(StyleTool::Link),
        )?;
        let (id, _) = self.workspace.open(path, || scene);

        self.word_indexes.insert(id, Arc::new(WordIndex::new()));
        self.extractions.push((id, spawn_word_extraction(source)));
        Ok(id)
    }

    pub fn close_document(&mut self, id: TabId) -> AppResult<()> {
        let tab = self.workspace.close(id)?;
        if tab.is_modified() {
            tracing::warn!(path = ?tab.path(), "closing document with unsaved changes");
        }
        self.word_indexes.remove(&id);
        self.extractions.retain(|(tab, _)| *tab != id);
        Ok(())
    }

    pub fn word_index(&self, id: TabId) -> Option<Arc<WordIndex>> {
        self.word_indexes.get(&id).cloned()
    }

    /// Moves finished extraction results into their tab's word index.
    pub fn poll_workers(&mut self) {
        let mut still_running = Vec::with_capacity(self.extractions.len());
        for (id, mut handle) in self.extractions.drain(..) {
            match handle.try_result() {
                WorkerPoll::Ready(words) => {
                    if let Some(index) = self.word_indexes.get(&id) {
                        tracing::debug!(tab = %id, pages = words.len(), "word index ready");
                        index.update(words);
                    }
                }
                WorkerPoll::Pending => still_running.push((id, handle)),
                WorkerPoll::Lost => {
                    tracing::warn!(tab = %id, "word extraction lost");
                }
            }
        }
        self.extractions = still_running;
    }

    pub fn has_pending_work(&self) -> bool {
        !self.extractions.is_empty()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentError, DocumentResult, DocumentSource, MemoryDocument};
    use crate::error::AppError;
    use crate::geometry::Rect;

    struct FixtureLoader;

    impl DocumentLoader for FixtureLoader {
        fn open(&self, path: &Path) -> DocumentResult<Arc<dyn DocumentSource>> {
            if path.extension().is_some_and(|ext| ext == "pdf") {
                Ok(Arc::new(
                    MemoryDocument::new()
                        .with_page(612.0, 792.0)
                        .with_words([("alpha", Rect::new(0.0, 0.0, 10.0, 5.0))])
                        .with_page(612.0, 792.0),
                ))
            } else {
                Err(DocumentError::BackendUnavailable(path.to_path_buf()))
            }
        }
    }

    fn fixture_app() -> App {
        App::with_loader(
            Box::new(FixtureLoader),
            SceneOptions::default(),
            StyleDefaults::default(),
        )
    }

    fn drain_workers(app: &mut App) {
        while app.has_pending_work() {
            app.poll_workers();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn open_request_adds_tab_and_builds_word_index() {
        let mut app = fixture_app();
        app.handle_request(InstanceRequest::Open {
            filename: "/docs/report.pdf".into(),
        });
        let id = app.workspace().active_id().expect("document should open");
        assert_eq!(app.workspace().tab(id).unwrap().scene().pages().len(), 2);

        drain_workers(&mut app);
        let index = app.word_index(id).expect("tab has a word index");
        let first = index.get(&PageNumber(0)).expect("first page indexed");
        assert_eq!(first[0].text, "alpha");
    }

    #[test]
    fn reopening_focuses_existing_tab() {
        let mut app = fixture_app();
        let first = app.open_document(Path::new("/a.pdf")).unwrap();
        app.open_document(Path::new("/b.pdf")).unwrap();
        let again = app.open_document(Path::new("/a.pdf")).unwrap();

        assert_eq!(first, again);
        assert_eq!(app.workspace().tabs().len(), 2);
        assert_eq!(app.workspace().active_id(), Some(first));
    }

    #[test]
    fn unsupported_file_is_reported_and_nothing_opens() {
        let mut app = fixture_app();
        let err = app
            .open_document(Path::new("/notes.txt"))
            .expect_err("fixture loader only reads pdf");
        assert!(matches!(
            err,
            AppError::Document(DocumentError::BackendUnavailable(_))
        ));
        assert!(app.workspace().tabs().is_empty());
    }

    #[test]
    fn closing_tab_drops_its_word_index() {
        let mut app = fixture_app();
        let id = app.open_document(Path::new("/a.pdf")).unwrap();
        app.close_document(id).unwrap();
        assert!(app.word_index(id).is_none());
        assert!(!app.has_pending_work());
    }
}
