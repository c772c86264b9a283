use super::atom::Atom;
use crate::scene::ItemId;

/// One undo/redo unit: atoms in the order they were recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    label: String,
    serial: u64,
    atoms: Vec<Atom>,
}

impl Action {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            serial: 0,
            atoms: Vec::new(),
        }
    }

    pub fn with_atom(atom: Atom) -> Self {
        let mut action = Self::new(atom.kind().label());
        action.push(atom);
        action
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Unique per tracker once the action is committed; zero before.
    pub const fn serial(&self) -> u64 {
        self.serial
    }

    pub(crate) fn set_serial(&mut self, serial: u64) {
        self.serial = serial;
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub(crate) fn referenced_items(&self, out: &mut Vec<ItemId>) {
        for atom in &self.atoms {
            atom.referenced_items(out);
        }
    }
}

impl From<Atom> for Action {
    fn from(atom: Atom) -> Self {
        Self::with_atom(atom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::AtomKind;
    use crate::scene::Placement;

    #[test]
    fn seeded_action_takes_label_from_atom_kind_and_keeps_push_order() {
        let placement = Placement {
            parent: None,
            index: 0,
        };
        let mut action = Action::with_atom(Atom::create(ItemId(1), placement));
        action.push(Atom::page_order(Some(ItemId(1)), vec![], vec![]));

        assert_eq!(action.label(), "create");
        assert_eq!(action.len(), 2);
        assert_eq!(action.atoms()[0].kind(), AtomKind::Create);
        assert_eq!(action.atoms()[1].kind(), AtomKind::PageOrderChanged);
    }
}
