use std::str::FromStr;

use crate::cell::{CellId, CellRecord, CellState};
use crate::config::{EditorConfig, OpenConflictPolicy};
use crate::error::{EditError, Result};
use crate::host::{CellHost, EditorSurface, Notification, SurfaceSpec};
use crate::input::{Action, InputSignal, KeyBindings, RouteOutcome};
use crate::persistence::PersistenceCoordinator;
use crate::session::EditSession;
use crate::value_store::ValueStore;

/// Operations a host can request by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Open,
    Store,
    Cancel,
    Revert,
    Save,
    SaveAll,
    Close,
}

impl FromStr for Operation {
    type Err = EditError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "open" => Ok(Operation::Open),
            "store" => Ok(Operation::Store),
            "cancel" => Ok(Operation::Cancel),
            "revert" => Ok(Operation::Revert),
            "save" => Ok(Operation::Save),
            "saveAll" => Ok(Operation::SaveAll),
            "close" => Ok(Operation::Close),
            other => Err(EditError::UnknownOperation(other.to_string())),
        }
    }
}

/// Per-call overrides for [`LifecycleController::open`].
#[derive(Clone, Debug, Default)]
pub struct OpenOptions {
    pub edited_marker: Option<String>,
    pub bindings: Option<KeyBindings>,
}

impl OpenOptions {
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.edited_marker = Some(marker.into());
        self
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = Some(bindings);
        self
    }
}

/// Drives the open/store/cancel/revert/close lifecycle of cells hosted by `H`.
///
/// Every operation is synchronous. Calls made in a state that doesn't support them are logged
/// and returned as errors without touching any cell.
pub struct LifecycleController<H: CellHost> {
    pub(crate) host: H,
    pub(crate) config: EditorConfig,
    pub(crate) cells: ValueStore,
    pub(crate) session: EditSession<H::Surface>,
    pub(crate) persistence: PersistenceCoordinator,
    /// Marker of the most recent editor, used for cells that are not open.
    pub(crate) marker: String,
}

impl<H: CellHost> LifecycleController<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, EditorConfig::default())
    }

    pub fn with_config(host: H, config: EditorConfig) -> Self {
        let marker = config.edited_marker.clone();
        Self {
            host,
            config,
            cells: ValueStore::new(),
            session: EditSession::new(),
            persistence: PersistenceCoordinator::default(),
            marker,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn cells(&self) -> &ValueStore {
        &self.cells
    }

    pub fn record(&self, cell: &CellId) -> Option<&CellRecord> {
        self.cells.get(cell)
    }

    pub fn state(&self, cell: &CellId) -> CellState {
        self.cells.state(cell)
    }

    pub fn active_cell(&self) -> Option<&CellId> {
        self.session.active_cell()
    }

    /// Run a cell operation by name with default options.
    ///
    /// `save` and `saveAll` carry no endpoint this way and are rejected as configuration errors;
    /// use [`Self::save`] / [`Self::save_all`] instead.
    pub fn apply_named(&mut self, name: &str, cell: &CellId) -> Result<CellState> {
        let op = name.parse::<Operation>().map_err(EditError::logged)?;
        self.apply(op, cell)
    }

    pub fn apply(&mut self, op: Operation, cell: &CellId) -> Result<CellState> {
        match op {
            Operation::Open => self.open(cell, OpenOptions::default()),
            Operation::Store => self.store(cell),
            Operation::Cancel => self.cancel(cell),
            Operation::Revert => self.revert(cell),
            Operation::Close => self.close(cell),
            Operation::Save | Operation::SaveAll => Err(EditError::Config(
                "must supply an endpoint url when saving".to_string(),
            )
            .logged()),
        }
    }

    /// Open an editor on `cell`, capturing its pristine and previous values.
    pub fn open(&mut self, cell: &CellId, options: OpenOptions) -> Result<CellState> {
        if let Some(active) = self.session.active_cell().cloned() {
            match self.config.open_policy {
                OpenConflictPolicy::Reject => {
                    return Err(EditError::AlreadyEditing {
                        active,
                        requested: cell.clone(),
                    }
                    .logged());
                }
                OpenConflictPolicy::StoreActive => {
                    self.store(&active)?;
                }
                OpenConflictPolicy::CancelActive => {
                    self.cancel(&active)?;
                }
            }
        }

        self.ensure_record(cell).map_err(EditError::logged)?;
        let Some(record) = self.cells.get_mut(cell) else {
            return Err(EditError::UnknownCell(cell.clone()).logged());
        };
        record.begin_edit();
        let initial_text = record.current().to_string();
        let dirty = record.is_dirty();

        let marker = options
            .edited_marker
            .unwrap_or_else(|| self.config.edited_marker.clone());
        let bindings = options
            .bindings
            .unwrap_or_else(|| self.config.bindings.clone());
        self.marker = marker.clone();

        let spec = SurfaceSpec {
            surface_id: self.config.surface_id.clone(),
            initial_text,
            placement: self.host.placement(cell),
        };
        self.host.set_text(cell, "");
        let mut surface = self.host.create_surface(cell, spec);
        surface.focus();
        self.session.open(cell.clone(), surface, marker, bindings)?;
        if let Some(active) = self.session.active_mut() {
            active.live_dirty = dirty;
        }

        log::debug!("cell {cell}: editor opened");
        Ok(CellState::Editing)
    }

    /// Commit the surface text of the open editor on `cell`.
    pub fn store(&mut self, cell: &CellId) -> Result<CellState> {
        let Some(active) = self.session.active().filter(|active| active.cell == *cell) else {
            return Err(EditError::NoOpenEdit(cell.clone()).logged());
        };
        let live = active.surface.text();
        let was_dirty = active.live_dirty;
        let marker = active.marker.clone();

        let Some(record) = self.cells.get_mut(cell) else {
            return Err(EditError::UnknownCell(cell.clone()).logged());
        };
        record.commit(live);
        let dirty = record.is_dirty();
        let state = record.state();
        let current = record.current().to_string();

        self.session.close();
        self.host.set_text(cell, &current);
        self.host.set_marker(cell, &marker, dirty);
        match (was_dirty, dirty) {
            (false, true) => self.host.notify(Notification::Edited { cell: cell.clone() }),
            (true, false) => self.host.notify(Notification::Unedited { cell: cell.clone() }),
            _ => {}
        }

        log::debug!("cell {cell}: stored ({state:?})");
        Ok(state)
    }

    /// Discard the open edit on `cell`, restoring the value it started from.
    pub fn cancel(&mut self, cell: &CellId) -> Result<CellState> {
        let Some(record) = self.cells.get_mut(cell).filter(|record| record.is_editing()) else {
            return Err(EditError::NoOpenEdit(cell.clone()).logged());
        };
        record.rollback_to_previous()?;
        let dirty = record.is_dirty();
        let state = record.state();
        let current = record.current().to_string();

        let marker = self.marker_for(cell);
        self.close_session_for(cell);
        self.host.set_text(cell, &current);
        self.host.set_marker(cell, &marker, dirty);
        if !dirty {
            self.host.notify(Notification::Unedited { cell: cell.clone() });
        }

        log::debug!("cell {cell}: edit cancelled ({state:?})");
        Ok(state)
    }

    /// Restore the pristine value of `cell`, whether or not an editor is open on it.
    pub fn revert(&mut self, cell: &CellId) -> Result<CellState> {
        let Some(record) = self.cells.get_mut(cell) else {
            return Err(EditError::NotEdited(cell.clone()).logged());
        };
        record.rollback_to_original().map_err(EditError::logged)?;
        let current = record.current().to_string();

        let marker = self.marker_for(cell);
        self.close_session_for(cell);
        self.host.set_text(cell, &current);
        self.host.set_marker(cell, &marker, false);
        self.host.notify(Notification::Unedited { cell: cell.clone() });

        log::debug!("cell {cell}: reverted to original value");
        Ok(CellState::AtRest)
    }

    /// Tear down the editor on `cell` without committing its surface text.
    pub fn close(&mut self, cell: &CellId) -> Result<CellState> {
        if !self.session.is_open_for(cell) {
            match self.session.active_cell() {
                Some(active) => {
                    log::warn!("close requested for cell {cell}, but the open editor belongs to {active}")
                }
                None => log::warn!("close requested for cell {cell}, but no editor is open"),
            }
            return Ok(self.cells.state(cell));
        }

        let marker = self.marker_for(cell);
        self.session.close();
        let Some(record) = self.cells.get_mut(cell) else {
            return Ok(CellState::AtRest);
        };
        // Committed state never changed while the editor was open.
        record.rollback_to_previous()?;
        let dirty = record.is_dirty();
        let state = record.state();
        let current = record.current().to_string();
        self.host.set_text(cell, &current);
        self.host.set_marker(cell, &marker, dirty);

        log::debug!("cell {cell}: editor closed");
        Ok(state)
    }

    /// Route a host input signal to the open editor.
    ///
    /// Key signals first re-evaluate the live dirty state against the surface text; then the
    /// bound action (if any) runs.
    pub fn handle_input(&mut self, signal: InputSignal) -> Result<RouteOutcome> {
        let Some(active) = self.session.active_mut() else {
            log::debug!("ignoring {signal:?}: no editor is open");
            return Ok(RouteOutcome {
                signal,
                live_dirty: None,
                action: None,
            });
        };
        let cell = active.cell.clone();

        let mut live_dirty = None;
        if signal.is_key() {
            let live = active.surface.text();
            let dirty = self
                .cells
                .get(&cell)
                .map(|record| record.differs_from_original(&live))
                .unwrap_or(false);
            if dirty != active.live_dirty {
                active.live_dirty = dirty;
                self.host.set_marker(&cell, &active.marker, dirty);
                let notification = if dirty {
                    Notification::Edited { cell: cell.clone() }
                } else {
                    Notification::Unedited { cell: cell.clone() }
                };
                self.host.notify(notification);
            }
            live_dirty = Some(dirty);
        }

        let action = active.bindings.resolve(&signal);
        match action {
            Some(Action::Store) => {
                self.store(&cell)?;
            }
            Some(Action::Cancel) => {
                self.cancel(&cell)?;
            }
            Some(Action::Revert) => {
                self.revert(&cell)?;
            }
            Some(Action::Close) => {
                self.close(&cell)?;
            }
            None => {}
        }

        Ok(RouteOutcome {
            signal,
            live_dirty,
            action,
        })
    }

    /// Create the record for `cell` from the host's displayed text if it doesn't exist yet.
    pub(crate) fn ensure_record(&mut self, cell: &CellId) -> Result<()> {
        if self.cells.contains(cell) {
            return Ok(());
        }
        let text = self
            .host
            .text(cell)
            .ok_or_else(|| EditError::UnknownCell(cell.clone()))?;
        self.cells.get_or_insert_with(cell, || text);
        Ok(())
    }

    pub(crate) fn marker_for(&self, cell: &CellId) -> String {
        match self.session.active() {
            Some(active) if active.cell == *cell => active.marker.clone(),
            _ => self.marker.clone(),
        }
    }

    /// Bring the marker of `cell` in line with its record after an out-of-band change.
    pub(crate) fn refresh_marker(&mut self, cell: &CellId) {
        let Some(record) = self.cells.get(cell) else {
            return;
        };
        match self.session.active_mut() {
            Some(active) if active.cell == *cell => {
                let dirty = record.differs_from_original(&active.surface.text());
                active.live_dirty = dirty;
                self.host.set_marker(cell, &active.marker, dirty);
            }
            _ => self.host.set_marker(cell, &self.marker, record.is_dirty()),
        }
    }

    fn close_session_for(&mut self, cell: &CellId) {
        if self.session.is_open_for(cell) {
            self.session.close();
        }
    }
}
