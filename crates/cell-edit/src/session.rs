use crate::cell::CellId;
use crate::error::{EditError, Result};
use crate::host::EditorSurface;
use crate::input::KeyBindings;

/// The one open editor: which cell, its surface, and how its signals are routed.
#[derive(Debug)]
pub struct ActiveEdit<S> {
    pub cell: CellId,
    pub surface: S,
    pub marker: String,
    pub bindings: KeyBindings,
    /// Dirty state last reported from live surface text.
    pub live_dirty: bool,
}

/// Tracks the single open editor.
///
/// Owned by a controller instance rather than shared globally, so independent document regions
/// can each run their own controller.
#[derive(Debug)]
pub struct EditSession<S> {
    active: Option<ActiveEdit<S>>,
}

impl<S> Default for EditSession<S> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<S: EditorSurface> EditSession<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn active_cell(&self) -> Option<&CellId> {
        self.active.as_ref().map(|active| &active.cell)
    }

    pub fn is_open_for(&self, cell: &CellId) -> bool {
        self.active_cell() == Some(cell)
    }

    pub fn active(&self) -> Option<&ActiveEdit<S>> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveEdit<S>> {
        self.active.as_mut()
    }

    /// Live text of the open surface, if `cell` is the one being edited.
    pub fn live_text(&self, cell: &CellId) -> Option<String> {
        self.active
            .as_ref()
            .filter(|active| active.cell == *cell)
            .map(|active| active.surface.text())
    }

    pub fn open(
        &mut self,
        cell: CellId,
        surface: S,
        marker: String,
        bindings: KeyBindings,
    ) -> Result<()> {
        if let Some(active) = &self.active {
            return Err(EditError::AlreadyEditing {
                active: active.cell.clone(),
                requested: cell,
            });
        }
        self.active = Some(ActiveEdit {
            cell,
            surface,
            marker,
            bindings,
            live_dirty: false,
        });
        Ok(())
    }

    /// Tear down the open editor, destroying its surface. No-op when idle.
    pub fn close(&mut self) -> Option<CellId> {
        let active = self.active.take()?;
        active.surface.destroy();
        Some(active.cell)
    }
}
