use crate::geometry::{Point, Rect};
use crate::scene::{AnnotationInfo, ItemId, ItemState, Placement, Rotation};
use crate::style::PaintStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    Create,
    Remove,
    /// Position move.
    Changed,
    ColorChanged,
    AnnotChanged,
    ShapeChanged,
    TextChanged,
    PageOrderChanged,
    FullState,
    PagesAdded,
    PagesRotated,
    PagesDuplicated,
}

impl AtomKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Remove => "remove",
            Self::Changed => "move",
            Self::ColorChanged => "change color",
            Self::AnnotChanged => "change annotation",
            Self::ShapeChanged => "resize",
            Self::TextChanged => "edit text",
            Self::PageOrderChanged => "reorder pages",
            Self::FullState => "change item",
            Self::PagesAdded => "add pages",
            Self::PagesRotated => "rotate pages",
            Self::PagesDuplicated => "duplicate pages",
        }
    }

    /// Whether `value` is a legal `old`/`new` payload for this kind.
    pub fn accepts(self, value: &AtomValue) -> bool {
        matches!(
            (self, value),
            (Self::Create | Self::Remove, AtomValue::Placement(_) | AtomValue::None)
                | (Self::Changed, AtomValue::Position(_))
                | (Self::ColorChanged, AtomValue::Style(_))
                | (Self::AnnotChanged, AtomValue::Annotation(_))
                | (Self::ShapeChanged, AtomValue::Rect(_))
                | (Self::TextChanged, AtomValue::Text(_))
                | (Self::PageOrderChanged, AtomValue::Order(_))
                | (Self::FullState, AtomValue::State(_))
                | (Self::PagesRotated, AtomValue::Rotation(_))
                | (
                    Self::PagesAdded | Self::PagesDuplicated,
                    AtomValue::Pages(_) | AtomValue::None
                )
        )
    }

    pub const fn is_structural(self) -> bool {
        matches!(
            self,
            Self::Create
                | Self::Remove
                | Self::PageOrderChanged
                | Self::PagesAdded
                | Self::PagesDuplicated
        )
    }
}

/// A page and the root index it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlot {
    pub page: ItemId,
    pub index: usize,
}

/// Snapshot payload of an atom; the variant in use is fixed by the kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomValue {
    None,
    Placement(Placement),
    Position(Point),
    Rect(Rect),
    Style(PaintStyle),
    Text(String),
    Annotation(AnnotationInfo),
    State(Box<ItemState>),
    Order(Vec<ItemId>),
    Rotation(Rotation),
    Pages(Vec<PageSlot>),
}

impl AtomValue {
    fn referenced_items(&self, out: &mut Vec<ItemId>) {
        match self {
            Self::Placement(placement) => out.extend(placement.parent),
            Self::Order(order) => out.extend(order.iter().copied()),
            Self::Pages(slots) => out.extend(slots.iter().map(|slot| slot.page)),
            _ => {}
        }
    }
}

/// One elementary, invertible change. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    kind: AtomKind,
    item: Option<ItemId>,
    old: AtomValue,
    new: AtomValue,
    parent: Option<ItemId>,
}

impl Atom {
    pub(crate) fn new(
        kind: AtomKind,
        item: Option<ItemId>,
        old: AtomValue,
        new: AtomValue,
        parent: Option<ItemId>,
    ) -> Self {
        Self {
            kind,
            item,
            old,
            new,
            parent,
        }
    }

    /// `item` was inserted at `placement`.
    pub fn create(item: ItemId, placement: Placement) -> Self {
        Self::new(
            AtomKind::Create,
            Some(item),
            AtomValue::Placement(placement),
            AtomValue::None,
            placement.parent,
        )
    }

    /// `item` is about to be detached from `placement`.
    pub fn remove(item: ItemId, placement: Placement) -> Self {
        Self::new(
            AtomKind::Remove,
            Some(item),
            AtomValue::Placement(placement),
            AtomValue::None,
            placement.parent,
        )
    }

    pub fn change(
        kind: AtomKind,
        item: ItemId,
        parent: Option<ItemId>,
        old: AtomValue,
        new: AtomValue,
    ) -> Self {
        Self::new(kind, Some(item), old, new, parent)
    }

    pub fn page_order(item: Option<ItemId>, old: Vec<ItemId>, new: Vec<ItemId>) -> Self {
        Self::new(
            AtomKind::PageOrderChanged,
            item,
            AtomValue::Order(old),
            AtomValue::Order(new),
            None,
        )
    }

    pub fn pages_added(slots: Vec<PageSlot>) -> Self {
        Self::new(
            AtomKind::PagesAdded,
            None,
            AtomValue::None,
            AtomValue::Pages(slots),
            None,
        )
    }

    pub fn pages_duplicated(slots: Vec<PageSlot>) -> Self {
        Self::new(
            AtomKind::PagesDuplicated,
            None,
            AtomValue::None,
            AtomValue::Pages(slots),
            None,
        )
    }

    pub const fn kind(&self) -> AtomKind {
        self.kind
    }

    pub const fn item(&self) -> Option<ItemId> {
        self.item
    }

    pub const fn old(&self) -> &AtomValue {
        &self.old
    }

    pub const fn new_value(&self) -> &AtomValue {
        &self.new
    }

    pub const fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn is_well_formed(&self) -> bool {
        self.kind.accepts(&self.old) && self.kind.accepts(&self.new)
    }

    pub(crate) fn referenced_items(&self, out: &mut Vec<ItemId>) {
        out.extend(self.item);
        out.extend(self.parent);
        self.old.referenced_items(out);
        self.new.referenced_items(out);
    }
}
