//! Boundary to the host UI toolkit.
//!
//! The core never renders anything itself. It reads and writes cell text, toggles the "edited"
//! marker, and asks the host to create, focus and destroy the transient editing surface.

use serde::{Deserialize, Serialize};

use crate::cell::CellId;

/// Bounding box of a cell in host coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Typographic style copied from the cell onto the editing surface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub geometry: Geometry,
    pub typography: Typography,
}

/// Everything the host needs to build an editing surface over a cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSpec {
    pub surface_id: String,
    pub initial_text: String,
    pub placement: Placement,
}

/// Lifecycle notifications raised towards the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    /// The cell became dirty (live, while typing, or on store).
    Edited { cell: CellId },
    /// The cell returned to its pristine value.
    Unedited { cell: CellId },
    /// A batch save over a whole scope succeeded.
    ScopeUnedited { scope: String },
}

/// The transient input control that holds uncommitted keystrokes.
pub trait EditorSurface {
    /// Live, uncommitted text.
    fn text(&self) -> String;
    fn focus(&mut self);
    fn destroy(self);
}

pub trait CellHost {
    type Surface: EditorSurface;

    /// Displayed text of a cell the core has not seen yet, or `None` if the host has no such cell.
    fn text(&self, cell: &CellId) -> Option<String>;
    fn set_text(&mut self, cell: &CellId, text: &str);
    /// Add (`present = true`) or remove the edited marker on a cell.
    fn set_marker(&mut self, cell: &CellId, marker: &str, present: bool);
    fn placement(&self, cell: &CellId) -> Placement;
    fn create_surface(&mut self, cell: &CellId, spec: SurfaceSpec) -> Self::Surface;

    fn notify(&mut self, notification: Notification) {
        let _ = notification;
    }
}
