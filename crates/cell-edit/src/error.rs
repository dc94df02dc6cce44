use crate::cell::CellId;

/// Failure of the remote write issued by `save`/`save_all`.
///
/// The core never treats these as fatal: the cells covered by the write simply stay dirty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteWriteError {
    #[error("save endpoint {url} answered with HTTP {status}")]
    Status { status: u16, url: String },
    #[error("save request failed: {0}")]
    Transport(String),
    #[error("failed to encode save payload: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no edit is open on cell {0}")]
    NoOpenEdit(CellId),
    #[error("cell {0} has not been edited")]
    NotEdited(CellId),
    #[error("cannot open cell {requested}: cell {active} is already being edited")]
    AlreadyEditing { active: CellId, requested: CellId },
    #[error("unknown operation {0:?}")]
    UnknownOperation(String),
    #[error("unknown cell {0}")]
    UnknownCell(CellId),
    #[error("a save covering cell {0} is already in flight")]
    SaveInFlight(CellId),
    #[error(transparent)]
    RemoteWrite(#[from] RemoteWriteError),
}

pub type Result<T> = std::result::Result<T, EditError>;

impl EditError {
    /// Level this error is reported at when an operation rejects a call.
    pub fn severity(&self) -> log::Level {
        match self {
            EditError::Config(_) | EditError::UnknownCell(_) => log::Level::Error,
            _ => log::Level::Warn,
        }
    }

    /// Log the rejection and hand the error back, so call sites can `return Err(err.logged())`.
    pub(crate) fn logged(self) -> Self {
        log::log!(self.severity(), "{self}");
        self
    }
}
