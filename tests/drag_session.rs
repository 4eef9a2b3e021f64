use filedrag::backend::simulated::{DropTarget, FileListTarget, SimulatedDragLoop};
use filedrag::data_exchange::DataExchange;
use filedrag::drag_feedback::InputState;
use filedrag::drop_files::decode;
use filedrag::format::{DataDirection, DropEffect, FormatDescriptor, Media, MemoryHandle};
use filedrag::shared_memory::ProcessHeap;
use filedrag::{DragError, run_drag_session};

/// Target that records every query it makes and keeps the handles it fetched.
struct RecordingTarget {
    heap: ProcessHeap,
    fetch_twice: bool,
    supported: Option<bool>,
    handles: Vec<MemoryHandle>,
    decoded: Vec<Vec<String>>,
}

impl RecordingTarget {
    fn new(heap: ProcessHeap) -> Self {
        Self {
            heap,
            fetch_twice: false,
            supported: None,
            handles: Vec::new(),
            decoded: Vec::new(),
        }
    }
}

impl DropTarget for RecordingTarget {
    fn drag_enter(&mut self, data: &dyn DataExchange, _allowed: DropEffect) -> DropEffect {
        let stream_only = FormatDescriptor {
            media: Media::ISTREAM,
            ..FormatDescriptor::file_drop()
        };
        assert!(!data.query_supports_format(&stream_only));
        assert!(data.enumerate_formats(DataDirection::Set).is_empty());
        DropEffect::Copy
    }

    fn accept_drop(&mut self, data: &dyn DataExchange, allowed: DropEffect) -> DropEffect {
        let format = FormatDescriptor::file_drop();
        self.supported = Some(data.query_supports_format(&format));
        let fetches = if self.fetch_twice { 2 } else { 1 };
        for _ in 0..fetches {
            let medium = data.get_data(&format).unwrap();
            let bytes = self.heap.read(medium.handle).unwrap();
            self.decoded.push(decode(&bytes).unwrap());
            self.handles.push(medium.handle);
            self.heap.release(medium.handle);
        }
        allowed
    }
}

#[test]
fn drop_delivers_the_file_list_and_reports_copy() {
    let heap = ProcessHeap::new();
    let backend = SimulatedDragLoop::new(
        heap.clone(),
        RecordingTarget::new(heap.clone()),
        vec![
            InputState::button_held(),
            InputState::button_held(),
            InputState::button_released(),
        ],
    );

    let effect = run_drag_session(&backend, &["/tmp/a.txt", "/tmp/b.txt"]).unwrap();

    assert_eq!(effect, DropEffect::Copy);
    let target = backend.target();
    assert_eq!(target.supported, Some(true));
    assert_eq!(target.decoded, vec![vec!["/tmp/a.txt", "/tmp/b.txt"]]);
    assert_eq!(heap.live_regions(), 0);
    assert_eq!(backend.init_count(), 1);
    assert_eq!(backend.teardown_count(), 1);
}

#[test]
fn every_fetch_gets_its_own_region() {
    let heap = ProcessHeap::new();
    let mut target = RecordingTarget::new(heap.clone());
    target.fetch_twice = true;
    let backend = SimulatedDragLoop::new(
        heap.clone(),
        target,
        vec![InputState::button_released()],
    );

    run_drag_session(&backend, &["C:\\Music\\loop.wav"]).unwrap();

    let target = backend.target();
    assert_eq!(target.handles.len(), 2);
    assert_ne!(target.handles[0], target.handles[1]);
    assert_eq!(target.decoded[0], target.decoded[1]);
    assert_eq!(heap.total_allocations(), 2);
}

#[test]
fn escape_cancels_without_publishing() {
    let heap = ProcessHeap::new();
    let backend = SimulatedDragLoop::new(
        heap.clone(),
        FileListTarget::new(heap.clone()),
        vec![
            InputState::button_held(),
            InputState::button_held(),
            InputState::escape_pressed(),
            InputState::button_released(),
        ],
    );

    let effect = run_drag_session(&backend, &["/tmp/a.txt"]).unwrap();

    assert_eq!(effect, DropEffect::None);
    assert_eq!(backend.continue_queries(), 3);
    assert_eq!(heap.total_allocations(), 0);
    assert!(backend.target().received().is_empty());
}

#[test]
fn exhausted_heap_leaves_target_without_files() {
    let heap = ProcessHeap::with_allocation_limit(0);
    let backend = SimulatedDragLoop::new(
        heap.clone(),
        FileListTarget::new(heap.clone()),
        vec![InputState::button_released()],
    );

    let effect = run_drag_session(&backend, &["/tmp/a.txt"]).unwrap();

    assert_eq!(effect, DropEffect::None);
    assert!(backend.target().received().is_empty());
    assert_eq!(heap.live_regions(), 0);
}

#[test]
fn embedded_null_is_rejected_before_the_loop() {
    let heap = ProcessHeap::new();
    let backend = SimulatedDragLoop::new(
        heap.clone(),
        FileListTarget::new(heap),
        vec![InputState::button_released()],
    );
    let result = run_drag_session(&backend, &["a\0b"]);
    assert!(matches!(result, Err(DragError::InvalidInput(_))));
    assert_eq!(backend.init_count(), 0);
}

#[cfg(not(target_os = "windows"))]
#[test]
fn native_drag_is_unsupported_off_windows() {
    assert_eq!(
        filedrag::run_native_drag(&["/tmp/a.txt"]),
        Err(DragError::Unsupported)
    );
}
