//! Undo/redo tracking: atoms, actions, the tracker and the notification
//! capability items use to reach it.

pub mod action;
pub mod atom;
pub mod error;
pub mod notify;
mod replay;
pub mod tracker;

pub use action::Action;
pub use atom::{Atom, AtomKind, AtomValue, PageSlot};
pub use error::{TrackError, TrackResult};
pub use notify::Undoable;
pub use replay::{Direction, ReplayFailure, ReplayFailureReason, ReplayReport};
pub use tracker::{Tracker, TrackerEvent, TrackerObserver};
