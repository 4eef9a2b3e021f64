//! Errors raised by the drag core.
//!
//! Query-level errors (`UnsupportedFormat`, `NotSupported`, `AllocationFailure`)
//! are reported to the shell per call and never end the drag loop. Session
//! errors (`SessionInitFailure`, `DragLoopFailure`) are returned to the caller.

use thiserror::Error;

/// Errors produced while encoding, publishing or dragging a file list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DragError {
    /// The path list is empty or contains an unusable entry.
    #[error("Invalid file list: {0}")]
    InvalidInput(String),
    /// A `DROPFILES` block could not be decoded.
    #[error("Malformed DROPFILES block: {0}")]
    MalformedBlock(String),
    /// The receiver asked for a format or medium this source cannot provide.
    #[error("Requested format is not supported")]
    UnsupportedFormat,
    /// The requested operation is not implemented by this source.
    #[error("Operation not supported")]
    NotSupported,
    /// Shared memory for the payload could not be allocated or filled.
    #[error("Shared memory allocation failed: {0}")]
    AllocationFailure(String),
    /// The drag subsystem could not be initialized.
    #[error("Drag subsystem init failed: {0}")]
    SessionInitFailure(String),
    /// The drag loop itself reported a hard failure.
    #[error("Drag failed: {0}")]
    DragLoopFailure(String),
    /// The platform has no native drag loop.
    #[error("External drag-out is only supported on Windows in this build")]
    Unsupported,
}

impl DragError {
    /// Whether the error is local to one data query and the loop may continue.
    pub fn is_query_local(&self) -> bool {
        matches!(
            self,
            DragError::UnsupportedFormat | DragError::NotSupported | DragError::AllocationFailure(_)
        )
    }
}
