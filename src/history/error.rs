use thiserror::Error;

use super::atom::AtomKind;
use crate::scene::ItemId;

pub type TrackResult<T> = std::result::Result<T, TrackError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    #[error("item {0} is not attached to the scene")]
    DetachedItem(ItemId),
    #[error("undo stack empty")]
    NothingToUndo,
    #[error("redo stack empty")]
    NothingToRedo,
    #[error("no transaction is open")]
    NoOpenTransaction,
    #[error("transaction `{0}` is still open")]
    TransactionOpen(String),
    #[error("{kind:?} atom does not accept this value")]
    UnsupportedValue { kind: AtomKind },
    #[error("history halted until reset: {0}")]
    Poisoned(String),
    #[error("history corrupted replaying {kind:?} on {item:?}: {detail}")]
    Corrupted {
        kind: AtomKind,
        item: Option<ItemId>,
        detail: &'static str,
    },
}
