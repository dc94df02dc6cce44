use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};

/// Stable identifier of an editable cell within its containing scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle stage of a cell, derived from its record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellState {
    /// No baseline captured, not dirty.
    AtRest,
    /// An editor is open on the cell.
    Editing,
    /// Editor closed with a committed value that differs from the pristine one.
    Dirty,
}

/// Value tracking for one cell.
///
/// `original` is the pristine value captured the first time an edit opens and dropped once the
/// cell is back to that value. `previous` is the value the open edit started from and only exists
/// while an editor is open on the cell. `current` always holds committed text; live keystrokes
/// stay in the editing surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRecord {
    id: CellId,
    original: Option<String>,
    previous: Option<String>,
    current: String,
    dirty: bool,
}

impl CellRecord {
    pub fn new(id: CellId, current: impl Into<String>) -> Self {
        Self {
            id,
            original: None,
            previous: None,
            current: current.into(),
            dirty: false,
        }
    }

    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_editing(&self) -> bool {
        self.previous.is_some()
    }

    pub fn state(&self) -> CellState {
        if self.previous.is_some() {
            CellState::Editing
        } else if self.dirty {
            CellState::Dirty
        } else {
            CellState::AtRest
        }
    }

    /// Capture the pristine baseline (once) and the value this edit starts from.
    pub fn begin_edit(&mut self) {
        if self.original.is_none() {
            self.original = Some(self.current.clone());
        }
        self.previous = Some(self.current.clone());
    }

    /// Commit `value` as the cell's text and close the edit.
    pub fn commit(&mut self, value: impl Into<String>) {
        self.current = value.into();
        self.previous = None;
        self.recompute_dirty();
    }

    /// Restore the value the open edit started from.
    pub fn rollback_to_previous(&mut self) -> Result<()> {
        let Some(previous) = self.previous.take() else {
            return Err(EditError::NoOpenEdit(self.id.clone()));
        };
        self.current = previous;
        self.recompute_dirty();
        Ok(())
    }

    /// Restore the pristine value, discarding every edit since the baseline was captured.
    ///
    /// Also drops `previous`: the caller closes any editor open on this cell.
    pub fn rollback_to_original(&mut self) -> Result<()> {
        let Some(original) = self.original.take() else {
            return Err(EditError::NotEdited(self.id.clone()));
        };
        self.current = original;
        self.previous = None;
        self.dirty = false;
        Ok(())
    }

    /// Reconcile after the remote store accepted `sent` for this cell.
    ///
    /// `sent` becomes the new pristine value. If the cell moved on while the write was in flight
    /// it stays dirty against that new baseline.
    pub fn mark_saved(&mut self, sent: &str) {
        if self.previous.is_some() || self.current != sent {
            self.original = Some(sent.to_string());
            self.dirty = self.current != sent;
        } else {
            self.original = None;
            self.dirty = false;
        }
    }

    /// Whether `live` (uncommitted surface text) differs from the pristine value.
    pub fn differs_from_original(&self, live: &str) -> bool {
        match &self.original {
            Some(original) => original != live,
            None => self.current != live,
        }
    }

    fn recompute_dirty(&mut self) {
        self.dirty = match &self.original {
            Some(original) => *original != self.current,
            None => false,
        };
        if !self.dirty && self.previous.is_none() {
            self.original = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str) -> CellRecord {
        CellRecord::new(CellId::from("5"), value)
    }

    #[test]
    fn begin_edit_captures_baseline_once() {
        let mut cell = record("hello");
        cell.begin_edit();
        cell.commit("world");
        cell.begin_edit();

        assert_eq!(cell.original(), Some("hello"));
        assert_eq!(cell.previous(), Some("world"));
        assert_eq!(cell.state(), CellState::Editing);
    }

    #[test]
    fn commit_of_unchanged_text_returns_to_rest() {
        let mut cell = record("hello");
        cell.begin_edit();
        cell.commit("hello");

        assert_eq!(cell.state(), CellState::AtRest);
        assert_eq!(cell.original(), None);
        assert_eq!(cell.previous(), None);
    }

    #[test]
    fn commit_back_to_original_clears_dirty() {
        let mut cell = record("hello");
        cell.begin_edit();
        cell.commit("world");
        assert!(cell.is_dirty());

        cell.begin_edit();
        cell.commit("hello");
        assert!(!cell.is_dirty());
        assert_eq!(cell.original(), None);
    }

    #[test]
    fn rollback_to_previous_restores_start_of_edit() {
        let mut cell = record("hello");
        cell.begin_edit();
        cell.commit("world");
        cell.begin_edit();
        cell.rollback_to_previous().unwrap();

        assert_eq!(cell.current(), "world");
        assert_eq!(cell.state(), CellState::Dirty);
        assert_eq!(cell.original(), Some("hello"));
    }

    #[test]
    fn rollback_to_previous_without_open_edit_fails() {
        let mut cell = record("hello");
        assert_eq!(
            cell.rollback_to_previous(),
            Err(EditError::NoOpenEdit(CellId::from("5")))
        );
        assert_eq!(cell, record("hello"));
    }

    #[test]
    fn rollback_to_original_restores_pristine_value() {
        let mut cell = record("a");
        for value in ["b", "c", "d"] {
            cell.begin_edit();
            cell.commit(value);
        }
        cell.begin_edit();
        cell.rollback_to_original().unwrap();

        assert_eq!(cell, record("a"));
    }

    #[test]
    fn rollback_to_original_on_unedited_cell_fails() {
        let mut cell = record("a");
        assert_eq!(
            cell.rollback_to_original(),
            Err(EditError::NotEdited(CellId::from("5")))
        );
    }

    #[test]
    fn mark_saved_moves_baseline_when_cell_changed_meanwhile() {
        let mut cell = record("a");
        cell.begin_edit();
        cell.commit("b");
        cell.begin_edit();
        cell.commit("c");

        cell.mark_saved("b");
        assert!(cell.is_dirty());
        assert_eq!(cell.original(), Some("b"));

        cell.mark_saved("c");
        assert_eq!(cell.state(), CellState::AtRest);
        assert_eq!(cell.original(), None);
    }

    #[test]
    fn mark_saved_keeps_baseline_defined_while_editing() {
        let mut cell = record("a");
        cell.begin_edit();
        cell.commit("b");
        cell.begin_edit();

        cell.mark_saved("b");
        assert_eq!(cell.original(), Some("b"));
        assert!(!cell.is_dirty());
        assert_eq!(cell.state(), CellState::Editing);
    }
}
