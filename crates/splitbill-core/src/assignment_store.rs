//! Sparse item/person assignment store.
//!
//! Rows are keyed by item, columns by person. An absent cell means "not
//! assigned". The store accepts any id; stale ids are harmless because the
//! allocation engine only looks at the current items and people.

use std::collections::HashMap;

use splitbill_calculator::AssignmentLookup;
use splitbill_types::{ItemId, PersonId};

#[derive(Debug, Clone, Default)]
pub struct AssignmentStore {
    rows: HashMap<ItemId, HashMap<PersonId, bool>>,
}

impl AssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a cell and return its new state. An absent cell counts as `false`.
    pub fn toggle(&mut self, item: ItemId, person: PersonId) -> bool {
        let cell = self.rows.entry(item).or_default().entry(person).or_insert(false);
        *cell = !*cell;
        *cell
    }

    pub fn set(&mut self, item: ItemId, person: PersonId, assigned: bool) {
        self.rows.entry(item).or_default().insert(person, assigned);
    }

    pub fn is_assigned(&self, item: ItemId, person: PersonId) -> bool {
        self.rows.get(&item).and_then(|row| row.get(&person)).copied().unwrap_or(false)
    }

    /// Mark every given person on an item
    pub fn assign_all<I>(&mut self, item: ItemId, people: I)
    where
        I: IntoIterator<Item = PersonId>,
    {
        let row = self.rows.entry(item).or_default();
        for person in people {
            row.insert(person, true);
        }
    }

    pub fn remove_item(&mut self, item: ItemId) {
        self.rows.remove(&item);
    }

    pub fn remove_person(&mut self, person: PersonId) {
        for row in self.rows.values_mut() {
            row.remove(&person);
        }
        self.rows.retain(|_, row| !row.is_empty());
    }

    /// People currently marked on an item, in no particular order
    pub fn assignees(&self, item: ItemId) -> Vec<PersonId> {
        self.rows
            .get(&item)
            .map(|row| {
                row.iter().filter(|(_, assigned)| **assigned).map(|(person, _)| *person).collect()
            })
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|row| row.values().all(|assigned| !assigned))
    }
}

impl AssignmentLookup for AssignmentStore {
    fn is_assigned(&self, item: ItemId, person: PersonId) -> bool {
        AssignmentStore::is_assigned(self, item, person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_toggle_assigns_second_unassigns() {
        let mut store = AssignmentStore::new();
        let item = ItemId::new();
        let person = PersonId::new();

        assert!(!store.is_assigned(item, person));
        assert!(store.toggle(item, person));
        assert!(store.is_assigned(item, person));
        assert!(!store.toggle(item, person));
        assert!(!store.is_assigned(item, person));
    }

    #[test]
    fn set_and_assignees() {
        let mut store = AssignmentStore::new();
        let item = ItemId::new();
        let alice = PersonId::new();
        let bob = PersonId::new();

        store.set(item, alice, true);
        store.set(item, bob, false);

        assert_eq!(store.assignees(item), vec![alice]);
        assert!(store.assignees(ItemId::new()).is_empty());
    }

    #[test]
    fn assign_all_marks_everyone() {
        let mut store = AssignmentStore::new();
        let item = ItemId::new();
        let people = [PersonId::new(), PersonId::new(), PersonId::new()];

        store.toggle(item, people[0]);
        store.toggle(item, people[0]);
        store.assign_all(item, people);

        let mut assignees = store.assignees(item);
        assignees.sort();
        let mut expected = people.to_vec();
        expected.sort();
        assert_eq!(assignees, expected);
    }

    #[test]
    fn removing_prunes_row_and_column() {
        let mut store = AssignmentStore::new();
        let soup = ItemId::new();
        let rice = ItemId::new();
        let alice = PersonId::new();
        let bob = PersonId::new();

        store.set(soup, alice, true);
        store.set(soup, bob, true);
        store.set(rice, alice, true);

        store.remove_item(soup);
        assert!(!store.is_assigned(soup, alice));
        assert!(!store.is_assigned(soup, bob));
        assert!(store.is_assigned(rice, alice));

        store.remove_person(alice);
        assert!(!store.is_assigned(rice, alice));
        assert!(store.is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut store = AssignmentStore::new();
        store.toggle(ItemId::new(), PersonId::new());
        assert!(!store.is_empty());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn lookup_trait_matches_store() {
        let mut store = AssignmentStore::new();
        let item = ItemId::new();
        let person = PersonId::new();
        store.toggle(item, person);

        let lookup: &dyn AssignmentLookup = &store;
        assert!(lookup.is_assigned(item, person));
        assert!(!lookup.is_assigned(item, PersonId::new()));
    }
}
