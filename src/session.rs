//! Drag session orchestration.
//!
//! A session validates the file list, acquires the drag subsystem through a
//! scoped guard, runs the blocking drag loop offering `Copy`, and returns the
//! negotiated effect. Sessions are serialized process-wide.

use std::sync::{Arc, Mutex};

use crate::backend::DragBackend;
use crate::data_exchange::FileDropSource;
use crate::drag_feedback::{DragState, FileDragFeedback};
use crate::drop_files::FileDropPayload;
use crate::error::DragError;
use crate::format::DropEffect;

static SESSION_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard balancing drag subsystem initialization.
struct SubsystemGuard<'a, B: DragBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: DragBackend + ?Sized> SubsystemGuard<'a, B> {
    fn acquire(backend: &'a B) -> Result<Self, DragError> {
        backend.initialize()?;
        Ok(Self { backend })
    }
}

impl<B: DragBackend + ?Sized> Drop for SubsystemGuard<'_, B> {
    fn drop(&mut self) {
        self.backend.uninitialize();
    }
}

/// Drag `paths` out of the process using `backend`'s drag loop.
///
/// Blocks until the user drops or cancels. Returns `DropEffect::None` when the
/// drag was cancelled or the target refused it.
pub fn run_drag_session<B, S>(backend: &B, paths: &[S]) -> Result<DropEffect, DragError>
where
    B: DragBackend + ?Sized,
    S: AsRef<str>,
{
    let payload = FileDropPayload::new(paths.iter().map(|p| p.as_ref().to_owned()).collect())?;
    let _session = SESSION_LOCK.lock().unwrap_or_else(|err| err.into_inner());
    let _subsystem = SubsystemGuard::acquire(backend).inspect_err(|err| {
        tracing::error!("Drag session not started: {err}");
    })?;

    let source = FileDropSource::new(payload, backend.memory());
    let feedback = Arc::new(FileDragFeedback::new());
    feedback.begin();
    tracing::info!("Starting drag of {} file(s)", source.payload().paths().len());

    let effect = backend.run_loop(source, Arc::clone(&feedback), DropEffect::Copy)?;
    let effect = match feedback.state() {
        DragState::Cancelled => DropEffect::None,
        _ => effect,
    };
    tracing::info!("Drag finished in state {:?} with effect {effect}", feedback.state());
    Ok(effect)
}

/// Drag `paths` using the platform's native drag loop.
pub fn run_native_drag<S: AsRef<str>>(paths: &[S]) -> Result<DropEffect, DragError> {
    platform::run_native_drag(paths)
}

#[cfg(not(target_os = "windows"))]
mod platform {
    use super::*;

    pub fn run_native_drag<S: AsRef<str>>(paths: &[S]) -> Result<DropEffect, DragError> {
        FileDropPayload::new(paths.iter().map(|p| p.as_ref().to_owned()).collect())?;
        Err(DragError::Unsupported)
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use crate::backend::ole::OleBackend;

    pub fn run_native_drag<S: AsRef<str>>(paths: &[S]) -> Result<DropEffect, DragError> {
        run_drag_session(&OleBackend, paths)
    }
}
