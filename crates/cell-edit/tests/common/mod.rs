#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::Mutex;

use cell_edit::{
    CellHost, CellId, EditorSurface, LifecycleController, Notification, Placement, RemoteWriteError,
    RemoteWriter, SaveRequest, SurfaceSpec,
};
use futures_util::future::BoxFuture;

#[derive(Debug, Default)]
struct SurfaceState {
    text: String,
    focused: bool,
    destroyed: bool,
}

pub struct FakeSurface(Rc<RefCell<SurfaceState>>);

impl EditorSurface for FakeSurface {
    fn text(&self) -> String {
        self.0.borrow().text.clone()
    }

    fn focus(&mut self) {
        self.0.borrow_mut().focused = true;
    }

    fn destroy(self) {
        self.0.borrow_mut().destroyed = true;
    }
}

/// In-memory stand-in for a document: cell texts, marker classes and one editing surface.
#[derive(Default)]
pub struct FakeHost {
    pub texts: BTreeMap<CellId, String>,
    pub markers: BTreeMap<CellId, BTreeSet<String>>,
    pub notifications: Vec<Notification>,
    pub surface_specs: Vec<SurfaceSpec>,
    live: Option<Rc<RefCell<SurfaceState>>>,
}

impl FakeHost {
    pub fn with_cells(cells: &[(&str, &str)]) -> Self {
        Self {
            texts: cells
                .iter()
                .map(|(id, text)| (CellId::from(*id), text.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Replace the text of the open editing surface, as if the user typed it.
    pub fn type_text(&self, text: &str) {
        let live = self.live.as_ref().expect("an editing surface is open");
        let mut state = live.borrow_mut();
        assert!(!state.destroyed, "typing into a destroyed surface");
        state.text = text.to_string();
    }

    pub fn surface_open(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|live| !live.borrow().destroyed)
    }

    pub fn surface_focused(&self) -> bool {
        self.live.as_ref().is_some_and(|live| live.borrow().focused)
    }

    pub fn text_of(&self, cell: &str) -> &str {
        self.texts
            .get(&CellId::from(cell))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn is_marked(&self, cell: &str, marker: &str) -> bool {
        self.markers
            .get(&CellId::from(cell))
            .is_some_and(|markers| markers.contains(marker))
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

impl CellHost for FakeHost {
    type Surface = FakeSurface;

    fn text(&self, cell: &CellId) -> Option<String> {
        self.texts.get(cell).cloned()
    }

    fn set_text(&mut self, cell: &CellId, text: &str) {
        self.texts.insert(cell.clone(), text.to_string());
    }

    fn set_marker(&mut self, cell: &CellId, marker: &str, present: bool) {
        let markers = self.markers.entry(cell.clone()).or_default();
        if present {
            markers.insert(marker.to_string());
        } else {
            markers.remove(marker);
        }
    }

    fn placement(&self, _cell: &CellId) -> Placement {
        Placement::default()
    }

    fn create_surface(&mut self, _cell: &CellId, spec: SurfaceSpec) -> FakeSurface {
        let state = Rc::new(RefCell::new(SurfaceState {
            text: spec.initial_text.clone(),
            ..SurfaceState::default()
        }));
        self.surface_specs.push(spec);
        self.live = Some(state.clone());
        FakeSurface(state)
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

pub fn controller(cells: &[(&str, &str)]) -> LifecycleController<FakeHost> {
    LifecycleController::new(FakeHost::with_cells(cells))
}

pub fn id(cell: &str) -> CellId {
    CellId::from(cell)
}

/// Open `cell`, type `text` and store it.
pub fn edit(controller: &mut LifecycleController<FakeHost>, cell: &str, text: &str) {
    controller
        .open(&id(cell), Default::default())
        .expect("open editor");
    controller.host().type_text(text);
    controller.store(&id(cell)).expect("store edit");
}

/// Records every request and answers with a fixed outcome.
#[derive(Default)]
pub struct RecordingWriter {
    pub requests: Mutex<Vec<SaveRequest>>,
    pub failure: Option<RemoteWriteError>,
}

impl RecordingWriter {
    pub fn failing(err: RemoteWriteError) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failure: Some(err),
        }
    }

    pub fn requests(&self) -> Vec<SaveRequest> {
        self.requests.lock().expect("writer mutex poisoned").clone()
    }
}

impl RemoteWriter for RecordingWriter {
    fn post<'a>(&'a self, request: &'a SaveRequest) -> BoxFuture<'a, Result<(), RemoteWriteError>> {
        self.requests
            .lock()
            .expect("writer mutex poisoned")
            .push(request.clone());
        let outcome = match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        };
        Box::pin(futures_util::future::ready(outcome))
    }
}

/// A writer whose requests never resolve.
pub struct StalledWriter;

impl RemoteWriter for StalledWriter {
    fn post<'a>(&'a self, _request: &'a SaveRequest) -> BoxFuture<'a, Result<(), RemoteWriteError>> {
        Box::pin(futures_util::future::pending())
    }
}
