use thiserror::Error;

use super::action::Action;
use super::atom::{Atom, AtomKind, AtomValue};
use crate::scene::{Colorable, ItemId, ReattachOutcome, Resizable, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReplayFailureReason {
    #[error("item no longer exists")]
    MissingItem,
    #[error("value does not match the atom kind")]
    UnsupportedValue,
    #[error("item does not carry this property")]
    UnsupportedProperty,
}

/// An atom that could not be applied; its siblings still were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFailure {
    pub index: usize,
    pub kind: AtomKind,
    pub item: Option<ItemId>,
    pub reason: ReplayFailureReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    pub failures: Vec<ReplayFailure>,
    /// Items reinserted at the root because their parent was gone.
    pub fallbacks: Vec<ItemId>,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.fallbacks.is_empty()
    }
}

/// The scene disagrees with the recorded history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Corruption {
    pub(crate) kind: AtomKind,
    pub(crate) item: Option<ItemId>,
    pub(crate) detail: &'static str,
}

enum AtomError {
    Failure(ReplayFailureReason),
    Corruption(&'static str),
}

enum Applied {
    Done,
    Fallback(ItemId),
}

/// Applies `action` in `direction`: undo walks the atoms backwards applying
/// `old`, redo walks forwards applying `new`. Stops at the first corruption.
pub(crate) fn replay(
    action: &Action,
    graph: &mut SceneGraph,
    direction: Direction,
) -> Result<ReplayReport, Corruption> {
    let mut report = ReplayReport::default();
    let indexed: Box<dyn Iterator<Item = (usize, &Atom)>> = match direction {
        Direction::Undo => Box::new(action.atoms().iter().enumerate().rev()),
        Direction::Redo => Box::new(action.atoms().iter().enumerate()),
    };

    for (index, atom) in indexed {
        match apply_atom(graph, atom, direction) {
            Ok(Applied::Done) => report.applied += 1,
            Ok(Applied::Fallback(item)) => {
                tracing::warn!(
                    %item,
                    parent = ?atom.parent(),
                    "parent missing during replay; reattached at scene root"
                );
                report.applied += 1;
                report.fallbacks.push(item);
            }
            Err(AtomError::Failure(reason)) => {
                tracing::warn!(
                    index,
                    kind = ?atom.kind(),
                    item = ?atom.item(),
                    %reason,
                    "atom replay failed; continuing with remaining atoms"
                );
                report.failures.push(ReplayFailure {
                    index,
                    kind: atom.kind(),
                    item: atom.item(),
                    reason,
                });
            }
            Err(AtomError::Corruption(detail)) => {
                return Err(Corruption {
                    kind: atom.kind(),
                    item: atom.item(),
                    detail,
                });
            }
        }
    }

    Ok(report)
}

fn apply_atom(
    graph: &mut SceneGraph,
    atom: &Atom,
    direction: Direction,
) -> Result<Applied, AtomError> {
    let value = match direction {
        Direction::Undo => atom.old(),
        Direction::Redo => atom.new_value(),
    };

    match atom.kind() {
        AtomKind::Create | AtomKind::Remove => {
            let item = subject(graph, atom)?;
            let AtomValue::Placement(placement) = atom.old() else {
                return Err(AtomError::Failure(ReplayFailureReason::UnsupportedValue));
            };
            let detach = matches!(
                (atom.kind(), direction),
                (AtomKind::Create, Direction::Undo) | (AtomKind::Remove, Direction::Redo)
            );
            if detach {
                detach_item(graph, item)
            } else {
                reattach_item(graph, item, placement.parent, placement.index)
            }
        }
        AtomKind::PagesAdded | AtomKind::PagesDuplicated => {
            let AtomValue::Pages(slots) = atom.new_value() else {
                return Err(AtomError::Failure(ReplayFailureReason::UnsupportedValue));
            };
            for slot in slots {
                if !graph.contains(slot.page) {
                    return Err(AtomError::Failure(ReplayFailureReason::MissingItem));
                }
            }
            match direction {
                Direction::Undo => {
                    for slot in slots.iter().rev() {
                        detach_item(graph, slot.page)?;
                    }
                }
                Direction::Redo => {
                    for slot in slots {
                        reattach_item(graph, slot.page, None, slot.index)?;
                    }
                }
            }
            Ok(Applied::Done)
        }
        AtomKind::PageOrderChanged => {
            let AtomValue::Order(order) = value else {
                return Err(AtomError::Failure(ReplayFailureReason::UnsupportedValue));
            };
            graph
                .set_root_order(order)
                .map_err(|_| AtomError::Corruption("page order no longer matches the scene"))?;
            Ok(Applied::Done)
        }
        AtomKind::PagesRotated => {
            let item = subject(graph, atom)?;
            let AtomValue::Rotation(rotation) = value else {
                return Err(AtomError::Failure(ReplayFailureReason::UnsupportedValue));
            };
            let page = graph
                .get_mut(item)
                .and_then(|state| state.page_info_mut())
                .ok_or(AtomError::Failure(ReplayFailureReason::UnsupportedProperty))?;
            page.rotation = *rotation;
            Ok(Applied::Done)
        }
        AtomKind::Changed
        | AtomKind::ShapeChanged
        | AtomKind::ColorChanged
        | AtomKind::TextChanged
        | AtomKind::AnnotChanged
        | AtomKind::FullState => {
            let item = subject(graph, atom)?;
            let state = graph
                .get_mut(item)
                .ok_or(AtomError::Failure(ReplayFailureReason::MissingItem))?;
            let applied = match (atom.kind(), value) {
                (AtomKind::Changed, AtomValue::Position(position)) => {
                    state.set_position(*position);
                    true
                }
                (AtomKind::ShapeChanged, AtomValue::Rect(rect)) => {
                    state.set_rect(*rect);
                    true
                }
                (AtomKind::ColorChanged, AtomValue::Style(style)) => state.set_style(*style),
                (AtomKind::TextChanged, AtomValue::Text(text)) => state.set_text(text.clone()),
                (AtomKind::AnnotChanged, AtomValue::Annotation(info)) => {
                    state.set_annotation(info.clone())
                }
                (AtomKind::FullState, AtomValue::State(snapshot)) => {
                    *state = snapshot.as_ref().clone();
                    true
                }
                _ => return Err(AtomError::Failure(ReplayFailureReason::UnsupportedValue)),
            };
            if applied {
                Ok(Applied::Done)
            } else {
                Err(AtomError::Failure(ReplayFailureReason::UnsupportedProperty))
            }
        }
    }
}

fn subject(graph: &SceneGraph, atom: &Atom) -> Result<ItemId, AtomError> {
    atom.item()
        .filter(|item| graph.contains(*item))
        .ok_or(AtomError::Failure(ReplayFailureReason::MissingItem))
}

fn detach_item(graph: &mut SceneGraph, item: ItemId) -> Result<Applied, AtomError> {
    if !graph.is_attached(item) {
        return Err(AtomError::Corruption("item is already detached"));
    }
    graph
        .detach(item)
        .map_err(|_| AtomError::Corruption("item is missing from its parent"))?;
    Ok(Applied::Done)
}

fn reattach_item(
    graph: &mut SceneGraph,
    item: ItemId,
    parent: Option<ItemId>,
    index: usize,
) -> Result<Applied, AtomError> {
    if graph.is_attached(item) {
        return Err(AtomError::Corruption("item is already attached"));
    }
    match graph.reattach(item, parent, index) {
        Ok(ReattachOutcome::Restored) => Ok(Applied::Done),
        Ok(ReattachOutcome::FallbackToRoot) => Ok(Applied::Fallback(item)),
        Err(_) => Err(AtomError::Failure(ReplayFailureReason::MissingItem)),
    }
}
