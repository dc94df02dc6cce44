//! In-place editing of independently addressable text cells with deferred, batched persistence.
//!
//! A host UI toolkit implements [`CellHost`] (text, edited marker, editing surface) and forwards
//! key/blur signals to [`LifecycleController::handle_input`]. The controller owns the per-cell
//! value records and the single open editor, and exposes:
//! - `open` / `store` / `cancel` / `revert` / `close` on a cell
//! - `save` on one cell and `save_all` over a [`Scope`], each issuing exactly one remote write
//!   through a [`RemoteWriter`] (an HTTP implementation ships behind the `http` feature)

mod cell;
pub mod config;
mod controller;
mod error;
pub mod host;
#[cfg(feature = "http")]
mod http;
pub mod input;
mod persistence;
mod session;
mod value_store;

pub use cell::{CellId, CellRecord, CellState};
pub use config::{EditorConfig, HttpWriterConfig, OpenConflictPolicy, PayloadEncoding};
pub use controller::{LifecycleController, OpenOptions, Operation};
pub use error::{EditError, RemoteWriteError, Result};
pub use host::{CellHost, EditorSurface, Geometry, Notification, Placement, SurfaceSpec, Typography};
#[cfg(feature = "http")]
pub use http::HttpRemoteWriter;
pub use input::{Action, InputSignal, Key, KeyBindings, RouteOutcome};
pub use persistence::{
    FailureCallback, PendingSave, PersistenceCoordinator, RemoteWriter, SaveOptions, SaveReport,
    SaveRequest, SaveTarget, Scope, SuccessCallback,
};
pub use session::{ActiveEdit, EditSession};
pub use value_store::ValueStore;
