//! The document collaborator: what a backend must supply to build a scene,
//! plus an in-memory backend and the background word index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Rect;
use crate::registry::Registry;
use crate::scene::{
    AnnotationInfo, ItemState, LinkTarget, Rotation, Scene, SceneError, SceneOptions, WidgetField,
};
use crate::style::PaintStyle;
use crate::worker::{spawn_worker, WorkerHandle};

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("page {0} is out of range")]
    PageOutOfRange(PageNumber),
    #[error("no document backend can open {0}")]
    BackendUnavailable(PathBuf),
    #[error("failed to read document {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Zero-based page number in the source document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PageNumber(pub u32);

impl std::fmt::Display for PageNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationSpec {
    Rectangle { rect: Rect, style: PaintStyle },
    Redaction { rect: Rect, style: PaintStyle },
    Square {
        rect: Rect,
        style: PaintStyle,
        info: AnnotationInfo,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    pub rect: Rect,
    pub target: LinkTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSpec {
    pub rect: Rect,
    pub field: WidgetField,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub rect: Rect,
}

/// Read side of a document backend.
pub trait DocumentSource: Send + Sync {
    fn page_count(&self) -> u32;
    fn page(&self, page: PageNumber) -> DocumentResult<PageSpec>;
    fn annotations(&self, page: PageNumber) -> DocumentResult<Vec<AnnotationSpec>>;
    fn links(&self, page: PageNumber) -> DocumentResult<Vec<LinkSpec>>;
    fn widgets(&self, page: PageNumber) -> DocumentResult<Vec<WidgetSpec>>;
    /// May be slow; callers run it off the main thread.
    fn words(&self, page: PageNumber) -> DocumentResult<Vec<Word>>;

    fn page_numbers(&self) -> Vec<PageNumber> {
        (0..self.page_count()).map(PageNumber).collect()
    }
}

/// Opens a file into a [`DocumentSource`].
pub trait DocumentLoader {
    fn open(&self, path: &Path) -> DocumentResult<Arc<dyn DocumentSource>>;
}

/// Loader used when no rendering backend is linked in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBackend;

impl DocumentLoader for NoBackend {
    fn open(&self, path: &Path) -> DocumentResult<Arc<dyn DocumentSource>> {
        if let Err(source) = std::fs::metadata(path) {
            return Err(DocumentError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
        Err(DocumentError::BackendUnavailable(path.to_path_buf()))
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryPage {
    spec: Option<PageSpec>,
    annotations: Vec<AnnotationSpec>,
    links: Vec<LinkSpec>,
    widgets: Vec<WidgetSpec>,
    words: Vec<Word>,
}

/// Document held entirely in memory. Built page by page.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, width: f64, height: f64) -> Self {
        self.pages.push(MemoryPage {
            spec: Some(PageSpec {
                width,
                height,
                rotation: Rotation::Deg0,
            }),
            ..MemoryPage::default()
        });
        self
    }

    fn last_page(&mut self) -> &mut MemoryPage {
        if self.pages.is_empty() {
            self.pages.push(MemoryPage::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// The `with_*` helpers below add to the most recently added page.
    pub fn with_annotation(mut self, annotation: AnnotationSpec) -> Self {
        self.last_page().annotations.push(annotation);
        self
    }

    pub fn with_link(mut self, link: LinkSpec) -> Self {
        self.last_page().links.push(link);
        self
    }

    pub fn with_widget(mut self, widget: WidgetSpec) -> Self {
        self.last_page().widgets.push(widget);
        self
    }

    pub fn with_words<'a>(mut self, words: impl IntoIterator<Item = (&'a str, Rect)>) -> Self {
        self.last_page().words.extend(words.into_iter().map(|(text, rect)| Word {
            text: text.to_string(),
            rect,
        }));
        self
    }

    fn memory_page(&self, page: PageNumber) -> DocumentResult<&MemoryPage> {
        self.pages
            .get(page.0 as usize)
            .ok_or(DocumentError::PageOutOfRange(page))
    }
}

impl DocumentSource for MemoryDocument {
    fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    fn page(&self, page: PageNumber) -> DocumentResult<PageSpec> {
        self.memory_page(page)?
            .spec
            .ok_or(DocumentError::PageOutOfRange(page))
    }

    fn annotations(&self, page: PageNumber) -> DocumentResult<Vec<AnnotationSpec>> {
        Ok(self.memory_page(page)?.annotations.clone())
    }

    fn links(&self, page: PageNumber) -> DocumentResult<Vec<LinkSpec>> {
        Ok(self.memory_page(page)?.links.clone())
    }

    fn widgets(&self, page: PageNumber) -> DocumentResult<Vec<WidgetSpec>> {
        Ok(self.memory_page(page)?.widgets.clone())
    }

    fn words(&self, page: PageNumber) -> DocumentResult<Vec<Word>> {
        Ok(self.memory_page(page)?.words.clone())
    }
}

impl From<AnnotationSpec> for ItemState {
    fn from(spec: AnnotationSpec) -> Self {
        match spec {
            AnnotationSpec::Rectangle { rect, style } => ItemState::rectangle(rect, style),
            AnnotationSpec::Redaction { rect, style } => ItemState::redaction(rect, style),
            AnnotationSpec::Square { rect, style, info } => ItemState::square(rect, style, info),
        }
    }
}

/// Builds a scene mirroring `source`. Nothing is recorded: a freshly loaded
/// document starts with empty history.
pub fn load_scene(
    source: &dyn DocumentSource,
    options: SceneOptions,
    link_style: PaintStyle,
) -> DocumentResult<Scene> {
    let mut scene = Scene::with_options(options);
    for number in source.page_numbers() {
        let spec = source.page(number)?;
        let mut state = ItemState::page(number.0, spec.width, spec.height);
        if let Some(info) = state.page_info_mut() {
            info.rotation = spec.rotation;
        }
        let page = scene.insert_item(None, state)?;

        for annotation in source.annotations(number)? {
            scene.insert_item(Some(page), annotation.into())?;
        }
        for link in source.links(number)? {
            scene.insert_item(
                Some(page),
                ItemState::link(link.rect, link_style, link.target),
            )?;
        }
        for widget in source.widgets(number)? {
            scene.insert_item(Some(page), ItemState::widget(widget.rect, widget.field))?;
        }
    }
    tracing::debug!(
        pages = scene.pages().len(),
        items = scene.graph().len(),
        "scene loaded"
    );
    Ok(scene)
}

pub type WordIndex = Registry<PageNumber, Vec<Word>>;

/// Extracts words for every page on a worker thread. Pages that fail are
/// logged and left out; the caller stores the result in a [`WordIndex`].
pub fn spawn_word_extraction(
    source: Arc<dyn DocumentSource>,
) -> WorkerHandle<Vec<(PageNumber, Vec<Word>)>> {
    spawn_worker("word extraction", move || {
        source
            .page_numbers()
            .into_iter()
            .filter_map(|number| match source.words(number) {
                Ok(words) => Some((number, words)),
                Err(err) => {
                    tracing::warn!(?err, %number, "word extraction failed for page");
                    None
                }
            })
            .collect()
    })
}
