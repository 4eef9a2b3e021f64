//! Library exports for the file drag source and its tests.
/// Application directory helpers.
pub mod app_dirs;
/// Platform drag loop backends.
pub mod backend;
/// User configuration loaded from `filedrag.toml`.
pub mod config;
/// Data exchange object answering shell format and data queries.
pub mod data_exchange;
/// Drag feedback state machine.
pub mod drag_feedback;
/// `DROPFILES` block encoding and decoding.
pub mod drop_files;
/// Error taxonomy shared by the drag core.
pub mod error;
/// Format descriptors, transfer media and drop effects.
pub mod format;
/// Logging setup.
pub mod logging;
/// Drag session orchestration.
pub mod session;
/// Shared memory publication of encoded payloads.
pub mod shared_memory;

pub use error::DragError;
pub use format::DropEffect;
pub use session::{run_drag_session, run_native_drag};
