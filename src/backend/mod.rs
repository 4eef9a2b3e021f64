//! Drag loop backends.
//!
//! A backend owns the process-wide drag subsystem and the blocking loop that
//! drives the source callbacks. Windows uses OLE (`DoDragDrop`); the simulated
//! backend replays scripted input against a scripted drop target.

use std::sync::Arc;

use crate::data_exchange::FileDropSource;
use crate::drag_feedback::FileDragFeedback;
use crate::error::DragError;
use crate::format::DropEffect;
use crate::shared_memory::SharedMemory;

#[cfg(target_os = "windows")]
pub mod ole;
pub mod simulated;

/// Process-wide drag subsystem and its blocking drag loop.
pub trait DragBackend {
    /// Shared memory the data object publishes into.
    type Memory: SharedMemory;

    fn memory(&self) -> Self::Memory;

    /// Acquire the subsystem. Only a successful call is paired with
    /// `uninitialize`.
    fn initialize(&self) -> Result<(), DragError>;

    fn uninitialize(&self);

    /// Run the drag loop until the user drops or cancels.
    ///
    /// Returns the effect the drop target accepted.
    fn run_loop(
        &self,
        source: FileDropSource<Self::Memory>,
        feedback: Arc<FileDragFeedback>,
        allowed: DropEffect,
    ) -> Result<DropEffect, DragError>;
}
