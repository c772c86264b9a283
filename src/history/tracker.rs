use std::collections::HashSet;

use super::action::Action;
use super::atom::Atom;
use super::error::{TrackError, TrackResult};
use super::replay::{replay, Corruption, Direction, ReplayReport};
use crate::scene::{ItemId, SceneGraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    Recorded {
        label: String,
        undo_depth: usize,
        redo_depth: usize,
    },
    Undone {
        label: String,
        undo_depth: usize,
        redo_depth: usize,
    },
    Redone {
        label: String,
        undo_depth: usize,
        redo_depth: usize,
    },
    Reset,
}

pub type TrackerObserver = Box<dyn FnMut(&TrackerEvent)>;

#[derive(Debug)]
struct OpenTransaction {
    depth: usize,
    action: Action,
}

/// Owns the undo and redo stacks of one scene.
///
/// Recording goes through [`Tracker::item_added`], [`Tracker::item_removed`]
/// and [`Tracker::item_changed`]; each call becomes its own action unless a
/// transaction is open, in which case the atom joins the open action.
pub struct Tracker {
    undo_stack: Vec<Action>,
    redo_stack: Vec<Action>,
    open: Option<OpenTransaction>,
    replaying: bool,
    poisoned: Option<String>,
    limit: Option<usize>,
    next_serial: u64,
    history_shrunk: bool,
    observers: Vec<TrackerObserver>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("open", &self.open)
            .field("replaying", &self.replaying)
            .field("poisoned", &self.poisoned)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            open: None,
            replaying: false,
            poisoned: None,
            limit: limit.filter(|limit| *limit > 0),
            next_serial: 1,
            history_shrunk: false,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&TrackerEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: TrackerEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    pub(crate) fn ensure_healthy(&self) -> TrackResult<()> {
        match &self.poisoned {
            Some(reason) => Err(TrackError::Poisoned(reason.clone())),
            None => Ok(()),
        }
    }

    pub fn item_added(&mut self, atom: Atom) -> TrackResult<()> {
        self.record(atom)
    }

    pub fn item_removed(&mut self, atom: Atom) -> TrackResult<()> {
        self.record(atom)
    }

    pub fn item_changed(&mut self, atom: Atom) -> TrackResult<()> {
        self.record(atom)
    }

    fn record(&mut self, atom: Atom) -> TrackResult<()> {
        self.ensure_healthy()?;
        if self.replaying {
            tracing::trace!(kind = ?atom.kind(), "notification suppressed during replay");
            return Ok(());
        }
        if !atom.is_well_formed() {
            return Err(TrackError::UnsupportedValue { kind: atom.kind() });
        }

        tracing::debug!(kind = ?atom.kind(), item = ?atom.item(), "record atom");
        match self.open.as_mut() {
            Some(open) => {
                open.action.push(atom);
                Ok(())
            }
            None => {
                self.commit(Action::with_atom(atom));
                Ok(())
            }
        }
    }

    /// Records a prebuilt action, merging it into the open transaction if any.
    pub fn push_action(&mut self, action: Action) -> TrackResult<()> {
        self.ensure_healthy()?;
        if self.replaying || action.is_empty() {
            return Ok(());
        }
        if let Some(atom) = action.atoms().iter().find(|atom| !atom.is_well_formed()) {
            return Err(TrackError::UnsupportedValue { kind: atom.kind() });
        }
        match self.open.as_mut() {
            Some(open) => {
                for atom in action.atoms() {
                    open.action.push(atom.clone());
                }
            }
            None => self.commit(action),
        }
        Ok(())
    }

    fn commit(&mut self, mut action: Action) {
        if action.is_empty() {
            return;
        }
        action.set_serial(self.next_serial);
        self.next_serial = self.next_serial.saturating_add(1);
        let label = action.label().to_string();
        self.undo_stack.push(action);

        if !self.redo_stack.is_empty() {
            self.redo_stack.clear();
            self.history_shrunk = true;
        }
        if let Some(limit) = self.limit {
            let overflow = self.undo_stack.len().saturating_sub(limit);
            if overflow > 0 {
                self.undo_stack.drain(..overflow);
                self.history_shrunk = true;
            }
        }

        let event = TrackerEvent::Recorded {
            label,
            undo_depth: self.undo_stack.len(),
            redo_depth: self.redo_stack.len(),
        };
        self.emit(event);
    }

    /// Opens (or nests into) a transaction. Only the outermost label is kept.
    pub fn begin_transaction(&mut self, label: impl Into<String>) -> TrackResult<()> {
        self.ensure_healthy()?;
        match self.open.as_mut() {
            Some(open) => open.depth += 1,
            None => {
                self.open = Some(OpenTransaction {
                    depth: 1,
                    action: Action::new(label),
                });
            }
        }
        Ok(())
    }

    /// Closes one transaction level. Returns `true` when the outermost level
    /// closed and a non-empty action was committed.
    pub fn end_transaction(&mut self) -> TrackResult<bool> {
        let open = self.open.as_mut().ok_or(TrackError::NoOpenTransaction)?;
        open.depth -= 1;
        if open.depth > 0 {
            return Ok(false);
        }
        let Some(open) = self.open.take() else {
            return Err(TrackError::NoOpenTransaction);
        };
        let committed = !open.action.is_empty();
        tracing::debug!(
            label = open.action.label(),
            atoms = open.action.len(),
            "transaction closed"
        );
        self.commit(open.action);
        Ok(committed)
    }

    pub fn in_transaction(&self) -> bool {
        self.open.is_some()
    }

    fn ensure_can_replay(&self) -> TrackResult<()> {
        self.ensure_healthy()?;
        match &self.open {
            Some(open) => Err(TrackError::TransactionOpen(open.action.label().to_string())),
            None => Ok(()),
        }
    }

    pub fn undo(&mut self, graph: &mut SceneGraph) -> TrackResult<ReplayReport> {
        self.ensure_can_replay()?;
        let action = self.undo_stack.pop().ok_or(TrackError::NothingToUndo)?;
        tracing::debug!(label = action.label(), atoms = action.len(), "undo");

        match self.replay_guarded(&action, graph, Direction::Undo) {
            Ok(report) => {
                let label = action.label().to_string();
                self.redo_stack.push(action);
                let event = TrackerEvent::Undone {
                    label,
                    undo_depth: self.undo_stack.len(),
                    redo_depth: self.redo_stack.len(),
                };
                self.emit(event);
                Ok(report)
            }
            Err(corruption) => {
                self.undo_stack.push(action);
                Err(self.poison(corruption))
            }
        }
    }

    pub fn redo(&mut self, graph: &mut SceneGraph) -> TrackResult<ReplayReport> {
        self.ensure_can_replay()?;
        let action = self.redo_stack.pop().ok_or(TrackError::NothingToRedo)?;
        tracing::debug!(label = action.label(), atoms = action.len(), "redo");

        match self.replay_guarded(&action, graph, Direction::Redo) {
            Ok(report) => {
                let label = action.label().to_string();
                self.undo_stack.push(action);
                let event = TrackerEvent::Redone {
                    label,
                    undo_depth: self.undo_stack.len(),
                    redo_depth: self.redo_stack.len(),
                };
                self.emit(event);
                Ok(report)
            }
            Err(corruption) => {
                self.redo_stack.push(action);
                Err(self.poison(corruption))
            }
        }
    }

    fn replay_guarded(
        &mut self,
        action: &Action,
        graph: &mut SceneGraph,
        direction: Direction,
    ) -> Result<ReplayReport, Corruption> {
        self.replaying = true;
        let outcome = replay(action, graph, direction);
        self.replaying = false;
        outcome
    }

    fn poison(&mut self, corruption: Corruption) -> TrackError {
        let error = TrackError::Corrupted {
            kind: corruption.kind,
            item: corruption.item,
            detail: corruption.detail,
        };
        tracing::error!(%error, "halting undo/redo until reset");
        self.poisoned = Some(error.to_string());
        error
    }

    /// Drops all history and clears the poisoned state.
    pub fn reset(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open = None;
        self.poisoned = None;
        self.history_shrunk = true;
        self.emit(TrackerEvent::Reset);
    }

    pub fn can_undo(&self) -> bool {
        self.poisoned.is_none() && !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.poisoned.is_none() && !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(Action::label)
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(Action::label)
    }

    pub fn undo_actions(&self) -> &[Action] {
        &self.undo_stack
    }

    pub fn redo_actions(&self) -> &[Action] {
        &self.redo_stack
    }

    /// Serial of the action an undo would revert, `None` at the bottom.
    pub fn head_serial(&self) -> Option<u64> {
        self.undo_stack.last().map(Action::serial)
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Every item any recorded or pending atom still points at.
    pub fn referenced_items(&self) -> HashSet<ItemId> {
        let mut items = Vec::new();
        for action in self.undo_stack.iter().chain(&self.redo_stack) {
            action.referenced_items(&mut items);
        }
        if let Some(open) = &self.open {
            open.action.referenced_items(&mut items);
        }
        items.into_iter().collect()
    }

    pub(crate) fn take_history_shrunk(&mut self) -> bool {
        std::mem::take(&mut self.history_shrunk)
    }
}
