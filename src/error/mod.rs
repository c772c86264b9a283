use crate::document::DocumentError;
use crate::history::TrackError;
use crate::ipc::IpcError;
use crate::scene::SceneError;
use crate::style::StyleError;
use crate::workspace::WorkspaceError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Ipc(#[from] IpcError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}
