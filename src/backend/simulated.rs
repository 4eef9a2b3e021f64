//! Scripted drag loop that behaves like the shell without a desktop.
//!
//! Input states are replayed one per continuation query. When the feedback
//! object answers `Drop`, the drop target negotiates and fetches data through
//! the same capability surface the shell uses.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use super::DragBackend;
use crate::data_exchange::{DataExchange, FileDropSource};
use crate::drag_feedback::{ContinueAction, DragFeedback, FileDragFeedback, InputState};
use crate::drop_files::decode;
use crate::error::DragError;
use crate::format::{DataDirection, DropEffect, FormatDescriptor, ReleasePolicy};
use crate::shared_memory::ProcessHeap;

/// Receiving side of a simulated drag.
pub trait DropTarget {
    /// Called once when the drag enters the target; returns the effect it
    /// would accept.
    fn drag_enter(&mut self, data: &dyn DataExchange, allowed: DropEffect) -> DropEffect;
    /// Called when the source reports a drop; returns the accepted effect.
    fn accept_drop(&mut self, data: &dyn DataExchange, allowed: DropEffect) -> DropEffect;
}

/// Drop target that accepts `CF_HDROP` lists the way a file manager does.
#[derive(Debug)]
pub struct FileListTarget {
    heap: ProcessHeap,
    accept: bool,
    received: Vec<String>,
    fetches: usize,
}

impl FileListTarget {
    pub fn new(heap: ProcessHeap) -> Self {
        Self {
            heap,
            accept: true,
            received: Vec::new(),
            fetches: 0,
        }
    }

    /// A target that inspects the data but refuses the drop.
    pub fn rejecting(heap: ProcessHeap) -> Self {
        Self {
            accept: false,
            ..Self::new(heap)
        }
    }

    /// Paths decoded from the last successful fetch.
    pub fn received(&self) -> &[String] {
        &self.received
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }

    fn fetch(&mut self, data: &dyn DataExchange) -> Result<Vec<String>, DragError> {
        let medium = data.get_data(&FormatDescriptor::file_drop())?;
        self.fetches += 1;
        let bytes = self
            .heap
            .read(medium.handle)
            .ok_or_else(|| DragError::MalformedBlock("medium handle is not live".into()))?;
        if medium.release == ReleasePolicy::ReceiverOwns {
            self.heap.release(medium.handle);
        }
        decode(&bytes)
    }
}

impl DropTarget for FileListTarget {
    fn drag_enter(&mut self, data: &dyn DataExchange, allowed: DropEffect) -> DropEffect {
        let offers_files = data
            .enumerate_formats(DataDirection::Get)
            .iter()
            .any(|format| data.query_supports_format(format));
        if offers_files && allowed != DropEffect::None {
            DropEffect::Copy
        } else {
            DropEffect::None
        }
    }

    fn accept_drop(&mut self, data: &dyn DataExchange, allowed: DropEffect) -> DropEffect {
        if !data.query_supports_format(&FormatDescriptor::file_drop()) {
            return DropEffect::None;
        }
        match self.fetch(data) {
            Ok(paths) => self.received = paths,
            Err(err) => {
                tracing::warn!("Drop target could not read file list: {err}");
                return DropEffect::None;
            }
        }
        if self.accept && allowed.bits() & DropEffect::Copy.bits() != 0 {
            DropEffect::Copy
        } else {
            DropEffect::None
        }
    }
}

/// Drag backend that replays scripted input against a scripted target.
pub struct SimulatedDragLoop<T> {
    inputs: Vec<InputState>,
    heap: ProcessHeap,
    target: RefCell<T>,
    init_error: Option<String>,
    initialized: Cell<usize>,
    torn_down: Cell<usize>,
    queries: Cell<usize>,
}

impl<T: DropTarget> SimulatedDragLoop<T> {
    pub fn new(heap: ProcessHeap, target: T, inputs: Vec<InputState>) -> Self {
        Self {
            inputs,
            heap,
            target: RefCell::new(target),
            init_error: None,
            initialized: Cell::new(0),
            torn_down: Cell::new(0),
            queries: Cell::new(0),
        }
    }

    /// Make subsystem initialization fail with `message`.
    pub fn failing_init(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_string());
        self
    }

    pub fn target(&self) -> std::cell::Ref<'_, T> {
        self.target.borrow()
    }

    pub fn init_count(&self) -> usize {
        self.initialized.get()
    }

    pub fn teardown_count(&self) -> usize {
        self.torn_down.get()
    }

    /// Continuation queries answered during the last loop.
    pub fn continue_queries(&self) -> usize {
        self.queries.get()
    }
}

impl<T: DropTarget> DragBackend for SimulatedDragLoop<T> {
    type Memory = ProcessHeap;

    fn memory(&self) -> ProcessHeap {
        self.heap.clone()
    }

    fn initialize(&self) -> Result<(), DragError> {
        if let Some(message) = &self.init_error {
            return Err(DragError::SessionInitFailure(message.clone()));
        }
        self.initialized.set(self.initialized.get() + 1);
        Ok(())
    }

    fn uninitialize(&self) {
        self.torn_down.set(self.torn_down.get() + 1);
    }

    fn run_loop(
        &self,
        source: FileDropSource<ProcessHeap>,
        feedback: Arc<FileDragFeedback>,
        allowed: DropEffect,
    ) -> Result<DropEffect, DragError> {
        let mut target = self.target.borrow_mut();
        let mut effect = target.drag_enter(&source, allowed);
        self.queries.set(0);
        for input in &self.inputs {
            self.queries.set(self.queries.get() + 1);
            match feedback.query_continue(*input) {
                ContinueAction::Continue => {
                    feedback.give_feedback(effect);
                }
                ContinueAction::Cancel => return Ok(DropEffect::None),
                ContinueAction::Drop => {
                    effect = target.accept_drop(&source, allowed);
                    return Ok(effect);
                }
            }
        }
        Err(DragError::DragLoopFailure(
            "input script ended while still dragging".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drop_files::FileDropPayload;

    fn source(heap: &ProcessHeap) -> FileDropSource<ProcessHeap> {
        let payload = FileDropPayload::new(vec!["C:\\one.wav".into()]).unwrap();
        FileDropSource::new(payload, heap.clone())
    }

    #[test]
    fn file_list_target_releases_what_it_reads() {
        let heap = ProcessHeap::new();
        let mut target = FileListTarget::new(heap.clone());
        let source = source(&heap);
        assert_eq!(target.drag_enter(&source, DropEffect::Copy), DropEffect::Copy);
        assert_eq!(target.accept_drop(&source, DropEffect::Copy), DropEffect::Copy);
        assert_eq!(target.received(), ["C:\\one.wav".to_string()]);
        assert_eq!(heap.live_regions(), 0);
    }

    #[test]
    fn rejecting_target_still_frees_fetched_data() {
        let heap = ProcessHeap::new();
        let mut target = FileListTarget::rejecting(heap.clone());
        let source = source(&heap);
        assert_eq!(target.accept_drop(&source, DropEffect::Copy), DropEffect::None);
        assert_eq!(target.fetches(), 1);
        assert_eq!(heap.live_regions(), 0);
    }

    #[test]
    fn cancel_skips_the_drop_target() {
        let heap = ProcessHeap::new();
        let target = FileListTarget::new(heap.clone());
        let backend = SimulatedDragLoop::new(
            heap.clone(),
            target,
            vec![InputState::button_held(), InputState::escape_pressed()],
        );
        let feedback = Arc::new(FileDragFeedback::new());
        feedback.begin();
        let effect = backend
            .run_loop(source(&heap), feedback, DropEffect::Copy)
            .unwrap();
        assert_eq!(effect, DropEffect::None);
        assert_eq!(backend.target().fetches(), 0);
        assert_eq!(backend.continue_queries(), 2);
    }
}
