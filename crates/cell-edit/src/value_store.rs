use std::collections::BTreeMap;

use crate::cell::{CellId, CellRecord, CellState};

/// Explicit `CellId -> CellRecord` mapping owned by the controller.
///
/// Records are created lazily the first time a cell is referenced and are never removed: a cell
/// back at rest is indistinguishable from a fresh one with the same value.
#[derive(Clone, Debug, Default)]
pub struct ValueStore {
    cells: BTreeMap<CellId, CellRecord>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &CellId) -> Option<&CellRecord> {
        self.cells.get(id)
    }

    pub fn get_mut(&mut self, id: &CellId) -> Option<&mut CellRecord> {
        self.cells.get_mut(id)
    }

    /// Return the record for `id`, creating it with `rest_value` if it does not exist yet.
    pub fn get_or_insert_with(
        &mut self,
        id: &CellId,
        rest_value: impl FnOnce() -> String,
    ) -> &mut CellRecord {
        self.cells
            .entry(id.clone())
            .or_insert_with(|| CellRecord::new(id.clone(), rest_value()))
    }

    pub fn contains(&self, id: &CellId) -> bool {
        self.cells.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn state(&self, id: &CellId) -> CellState {
        self.cells
            .get(id)
            .map(CellRecord::state)
            .unwrap_or(CellState::AtRest)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellRecord> {
        self.cells.values()
    }

    /// Dirty cells accepted by `filter`, in id order.
    pub fn dirty<'a>(
        &'a self,
        mut filter: impl FnMut(&CellId) -> bool + 'a,
    ) -> impl Iterator<Item = &'a CellRecord> + 'a {
        self.cells
            .values()
            .filter(move |record| record.is_dirty() && filter(record.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_created_once() {
        let mut store = ValueStore::new();
        let id = CellId::from("a");
        store.get_or_insert_with(&id, || "first".to_string());
        store.get_or_insert_with(&id, || "second".to_string());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).map(CellRecord::current), Some("first"));
    }

    #[test]
    fn unknown_cells_are_at_rest() {
        let store = ValueStore::new();
        assert_eq!(store.state(&CellId::from("missing")), CellState::AtRest);
    }

    #[test]
    fn dirty_filters_by_scope() {
        let mut store = ValueStore::new();
        for (id, value) in [("a", "x"), ("b", "y"), ("c", "z")] {
            let record = store.get_or_insert_with(&CellId::from(id), || "old".to_string());
            record.begin_edit();
            record.commit(value);
        }

        let ids: Vec<&str> = store
            .dirty(|id| id.as_str() != "b")
            .map(|record| record.id().as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
