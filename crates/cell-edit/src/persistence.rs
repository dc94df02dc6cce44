//! Single-cell and batch saves to a remote endpoint.
//!
//! A save is split in two so edits can continue while the write is in flight:
//! [`LifecycleController::prepare_save`] / [`LifecycleController::prepare_save_all`] capture the
//! open edit, collect the payload and return a [`PendingSave`]; once the write resolves,
//! [`LifecycleController::complete_save`] reconciles dirty state. [`LifecycleController::save`]
//! and [`LifecycleController::save_all`] do both around a [`RemoteWriter`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use futures_util::future::BoxFuture;
use serde::Serialize;
use url::Url;

use crate::cell::CellId;
use crate::controller::LifecycleController;
use crate::error::{EditError, RemoteWriteError, Result};
use crate::host::{CellHost, Notification};

/// The set of cells a batch save covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    name: String,
    members: Option<BTreeSet<CellId>>,
}

impl Scope {
    /// Every cell the controller knows about.
    pub fn all(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: None,
        }
    }

    pub fn cells<I, C>(name: impl Into<String>, cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CellId>,
    {
        Self {
            name: name.into(),
            members: Some(cells.into_iter().map(Into::into).collect()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, cell: &CellId) -> bool {
        match &self.members {
            Some(members) => members.contains(cell),
            None => true,
        }
    }
}

pub type SuccessCallback = Box<dyn FnOnce(&SaveReport)>;
pub type FailureCallback = Box<dyn FnOnce(&RemoteWriteError)>;

#[derive(Default)]
pub struct SaveOptions {
    pub endpoint_url: Option<String>,
    /// Posted alongside the cell values. A cell id overrides an entry with the same key.
    pub extra_data: BTreeMap<String, String>,
    on_success: Option<SuccessCallback>,
    on_failure: Option<FailureCallback>,
}

impl SaveOptions {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            ..Self::default()
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_data.insert(key.into(), value.into());
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(&SaveReport) + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_failure(mut self, callback: impl FnOnce(&RemoteWriteError) + 'static) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for SaveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveOptions")
            .field("endpoint_url", &self.endpoint_url)
            .field("extra_data", &self.extra_data)
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// One remote write, built at save time and consumed once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub endpoint: Url,
    pub payload: BTreeMap<CellId, String>,
    pub extra_data: BTreeMap<String, String>,
}

impl SaveRequest {
    /// Flattened body: extra data first, then cell values keyed by cell id.
    pub fn body(&self) -> BTreeMap<String, String> {
        let mut body = self.extra_data.clone();
        for (cell, value) in &self.payload {
            body.insert(cell.as_str().to_string(), value.clone());
        }
        body
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SaveTarget {
    Cell { cell: CellId },
    Scope { scope: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub target: SaveTarget,
    /// Cells back at rest after the write.
    pub saved: Vec<CellId>,
    /// Cells edited again while the write was in flight; dirty against the saved value.
    pub still_dirty: Vec<CellId>,
}

/// A save whose remote write has not resolved yet.
///
/// Its cells stay claimed until it is passed to [`LifecycleController::complete_save`] or
/// [`LifecycleController::abandon_save`].
#[must_use = "a pending save keeps its cells claimed until it is completed or abandoned"]
pub struct PendingSave {
    ticket: u64,
    target: SaveTarget,
    request: SaveRequest,
    on_success: Option<SuccessCallback>,
    on_failure: Option<FailureCallback>,
}

impl PendingSave {
    pub fn request(&self) -> &SaveRequest {
        &self.request
    }

    pub fn target(&self) -> &SaveTarget {
        &self.target
    }
}

impl fmt::Debug for PendingSave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSave")
            .field("ticket", &self.ticket)
            .field("target", &self.target)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Transport for save requests. Resolves `Ok` on a 2xx-equivalent answer.
pub trait RemoteWriter {
    fn post<'a>(&'a self, request: &'a SaveRequest) -> BoxFuture<'a, std::result::Result<(), RemoteWriteError>>;
}

/// Bookkeeping of cells covered by writes still in flight.
#[derive(Debug, Default)]
pub struct PersistenceCoordinator {
    in_flight: BTreeMap<CellId, u64>,
    next_ticket: u64,
}

impl PersistenceCoordinator {
    pub fn is_in_flight(&self, cell: &CellId) -> bool {
        self.in_flight.contains_key(cell)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn ensure_available<'a>(&self, mut cells: impl Iterator<Item = &'a CellId>) -> Result<()> {
        match cells.find(|cell| self.in_flight.contains_key(*cell)) {
            Some(cell) => Err(EditError::SaveInFlight(cell.clone())),
            None => Ok(()),
        }
    }

    fn begin<'a>(&mut self, cells: impl IntoIterator<Item = &'a CellId>) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        for cell in cells {
            self.in_flight.insert(cell.clone(), ticket);
        }
        ticket
    }

    /// Release the cells still claimed by `ticket`, returning how many were released.
    fn finish<'a>(&mut self, ticket: u64, cells: impl IntoIterator<Item = &'a CellId>) -> usize {
        let mut released = 0;
        for cell in cells {
            if self.in_flight.get(cell) == Some(&ticket) {
                self.in_flight.remove(cell);
                released += 1;
            }
        }
        released
    }
}

/// Releases the claim of a save whose future is dropped before the write resolves.
struct InFlightGuard<'a, H: CellHost> {
    controller: &'a mut LifecycleController<H>,
    ticket: u64,
    cells: Vec<CellId>,
}

impl<H: CellHost> Drop for InFlightGuard<'_, H> {
    fn drop(&mut self) {
        let released = self.controller.persistence.finish(self.ticket, &self.cells);
        if released > 0 {
            log::warn!(
                "save #{} dropped before its write resolved; released {released} cell(s)",
                self.ticket
            );
        }
    }
}

fn parse_endpoint(raw: Option<&str>) -> Result<Url> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(EditError::Config(
            "must supply an endpoint url when saving".to_string(),
        ));
    }
    Url::parse(raw).map_err(|err| EditError::Config(format!("invalid endpoint url {raw:?}: {err}")))
}

impl<H: CellHost> LifecycleController<H> {
    pub fn is_saving(&self, cell: &CellId) -> bool {
        self.persistence.is_in_flight(cell)
    }

    /// Dirty cells of `scope`, in id order.
    pub fn dirty_cells(&self, scope: &Scope) -> Vec<CellId> {
        self.cells
            .dirty(|cell| scope.contains(cell))
            .map(|record| record.id().clone())
            .collect()
    }

    /// Capture any open edit on `cell` and build a single-cell save request.
    pub fn prepare_save(&mut self, cell: &CellId, options: SaveOptions) -> Result<PendingSave> {
        let endpoint = parse_endpoint(options.endpoint_url.as_deref()).map_err(EditError::logged)?;
        self.persistence
            .ensure_available(std::iter::once(cell))
            .map_err(EditError::logged)?;
        self.ensure_record(cell).map_err(EditError::logged)?;

        if self.session.is_open_for(cell) {
            self.store(cell)?;
        }
        let Some(record) = self.cells.get(cell) else {
            return Err(EditError::UnknownCell(cell.clone()).logged());
        };

        let payload = BTreeMap::from([(cell.clone(), record.current().to_string())]);
        let ticket = self.persistence.begin(payload.keys());
        log::debug!("save #{ticket}: posting cell {cell} to {endpoint}");

        Ok(PendingSave {
            ticket,
            target: SaveTarget::Cell { cell: cell.clone() },
            request: SaveRequest {
                endpoint,
                payload,
                extra_data: options.extra_data,
            },
            on_success: options.on_success,
            on_failure: options.on_failure,
        })
    }

    /// Capture the open edit (if any) and build one request covering every dirty cell of `scope`.
    pub fn prepare_save_all(&mut self, scope: &Scope, options: SaveOptions) -> Result<PendingSave> {
        let endpoint = parse_endpoint(options.endpoint_url.as_deref()).map_err(EditError::logged)?;

        let active = self.session.active_cell().cloned();
        let candidates = self.dirty_cells(scope);
        let active_in_scope = active.iter().filter(|cell| scope.contains(cell));
        self.persistence
            .ensure_available(candidates.iter().chain(active_in_scope))
            .map_err(EditError::logged)?;

        if let Some(active) = active {
            self.store(&active)?;
        }

        let payload: BTreeMap<CellId, String> = self
            .cells
            .dirty(|cell| scope.contains(cell))
            .map(|record| (record.id().clone(), record.current().to_string()))
            .collect();
        let ticket = self.persistence.begin(payload.keys());
        log::debug!(
            "save #{ticket}: posting {} dirty cell(s) of scope {} to {endpoint}",
            payload.len(),
            scope.name()
        );

        Ok(PendingSave {
            ticket,
            target: SaveTarget::Scope {
                scope: scope.name().to_string(),
            },
            request: SaveRequest {
                endpoint,
                payload,
                extra_data: options.extra_data,
            },
            on_success: options.on_success,
            on_failure: options.on_failure,
        })
    }

    /// Reconcile cell state with the outcome of a pending save's remote write.
    ///
    /// On failure nothing is rolled back: covered cells stay dirty with their edited values.
    /// On success a cell edited again while the write was in flight stays dirty against the sent
    /// value; such cells are listed in [`SaveReport::still_dirty`].
    pub fn complete_save(
        &mut self,
        pending: PendingSave,
        outcome: std::result::Result<(), RemoteWriteError>,
    ) -> Result<SaveReport> {
        let PendingSave {
            ticket,
            target,
            request,
            on_success,
            on_failure,
        } = pending;
        self.persistence.finish(ticket, request.payload.keys());

        if let Err(err) = outcome {
            log::warn!("save #{ticket} failed: {err}");
            if let Some(callback) = on_failure {
                callback(&err);
            }
            return Err(EditError::RemoteWrite(err));
        }

        let mut saved = Vec::new();
        let mut still_dirty = Vec::new();
        for (cell, sent) in &request.payload {
            let Some(record) = self.cells.get_mut(cell) else {
                continue;
            };
            record.mark_saved(sent);
            if record.is_dirty() {
                still_dirty.push(cell.clone());
            } else {
                saved.push(cell.clone());
            }
            self.refresh_marker(cell);
        }

        match &target {
            SaveTarget::Cell { cell } => {
                if saved.contains(cell) {
                    self.host.notify(Notification::Unedited { cell: cell.clone() });
                }
            }
            SaveTarget::Scope { scope } => {
                self.host.notify(Notification::ScopeUnedited {
                    scope: scope.clone(),
                });
            }
        }
        log::debug!(
            "save #{ticket} succeeded: {} saved, {} still dirty",
            saved.len(),
            still_dirty.len()
        );

        let report = SaveReport {
            target,
            saved,
            still_dirty,
        };
        if let Some(callback) = on_success {
            callback(&report);
        }
        Ok(report)
    }

    /// Drop a pending save whose write will never be reported, releasing its cells.
    ///
    /// Cell state is left as is: covered cells stay dirty and no callback runs.
    pub fn abandon_save(&mut self, pending: PendingSave) {
        let released = self.persistence.finish(pending.ticket, pending.request.payload.keys());
        log::debug!("save #{} abandoned; released {released} cell(s)", pending.ticket);
    }

    /// Store any open edit on `cell`, post its value, and reconcile once the write resolves.
    ///
    /// Dropping the returned future before it resolves releases the cell without touching its
    /// state.
    pub async fn save<W>(&mut self, cell: &CellId, options: SaveOptions, writer: &W) -> Result<SaveReport>
    where
        W: RemoteWriter + ?Sized,
    {
        let pending = self.prepare_save(cell, options)?;
        self.post_and_complete(pending, writer).await
    }

    /// Store any open edit, post every dirty cell of `scope` in one write, and reconcile.
    ///
    /// Cancel-safe in the same way as [`Self::save`].
    pub async fn save_all<W>(&mut self, scope: &Scope, options: SaveOptions, writer: &W) -> Result<SaveReport>
    where
        W: RemoteWriter + ?Sized,
    {
        let pending = self.prepare_save_all(scope, options)?;
        self.post_and_complete(pending, writer).await
    }

    async fn post_and_complete<W>(&mut self, pending: PendingSave, writer: &W) -> Result<SaveReport>
    where
        W: RemoteWriter + ?Sized,
    {
        let guard = InFlightGuard {
            ticket: pending.ticket,
            cells: pending.request.payload.keys().cloned().collect(),
            controller: self,
        };
        let outcome = writer.post(pending.request()).await;
        guard.controller.complete_save(pending, outcome)
    }
}
