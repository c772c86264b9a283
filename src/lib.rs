//! Document annotation editing with grouped, reversible history.
//!
//! Items live in a [`scene::Scene`]; every change they make is announced
//! through [`history::Undoable`] and grouped into actions by a
//! [`history::Tracker`], which replays them for undo and redo.

pub mod app;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod history;
pub mod ipc;
pub mod logging;
pub mod registry;
pub mod scene;
pub mod style;
pub mod worker;
pub mod workspace;

pub use error::{AppError, AppResult};

/// Entrypoint used by higher-level integrations and CLI bindings.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting swik");

    let mut app = app::App::new();
    app.start()?;

    tracing::info!(
        open_tabs = app.workspace().tabs().len(),
        "handed off to running instance"
    );
    Ok(())
}
