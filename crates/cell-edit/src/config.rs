use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};
use crate::input::KeyBindings;

pub const DEFAULT_EDITED_MARKER: &str = "jqEdited";
pub const DEFAULT_SURFACE_ID: &str = "jqEditor";

/// What `open` does when another cell already has an editor open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenConflictPolicy {
    /// Refuse the new editor with `AlreadyEditing`.
    #[default]
    Reject,
    /// Store the active editor, then open the new one.
    StoreActive,
    /// Cancel the active editor, then open the new one.
    CancelActive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Marker (CSS class or equivalent) toggled on dirty cells.
    pub edited_marker: String,
    /// Identifier handed to the host for the editing surface.
    pub surface_id: String,
    pub bindings: KeyBindings,
    pub open_policy: OpenConflictPolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            edited_marker: DEFAULT_EDITED_MARKER.to_string(),
            surface_id: DEFAULT_SURFACE_ID.to_string(),
            bindings: KeyBindings::default(),
            open_policy: OpenConflictPolicy::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| EditError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.edited_marker.trim().is_empty() {
            return Err(EditError::Config("editedMarker must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Body encoding used by [`crate::HttpRemoteWriter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadEncoding {
    /// `application/x-www-form-urlencoded`, as a browser form POST sends it.
    #[default]
    Form,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpWriterConfig {
    pub encoding: PayloadEncoding,
    pub timeout_ms: u64,
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpWriterConfig {
    fn default() -> Self {
        Self {
            encoding: PayloadEncoding::default(),
            timeout_ms: 30_000,
            headers: BTreeMap::new(),
        }
    }
}

impl HttpWriterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}
