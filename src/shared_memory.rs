//! Publication of encoded payloads into OS-shared, relocatable memory.
//!
//! A published region belongs to the receiver once `publish` returns `Ok`; the
//! source never touches it again. If filling the region fails, the region is
//! freed here before the error is returned.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::drop_files::EncodedBlock;
use crate::error::DragError;
use crate::format::{MemoryHandle, TransferMedium};

/// Backend able to allocate moveable shared memory regions.
pub trait SharedMemory {
    /// Allocate a moveable region of exactly `len` bytes.
    fn allocate(&self, len: usize) -> Result<MemoryHandle, DragError>;
    /// Copy `bytes` into the region while it is locked in place.
    fn write_locked(&self, handle: MemoryHandle, bytes: &[u8]) -> Result<(), DragError>;
    /// Free a region that was never handed to a receiver.
    fn free(&self, handle: MemoryHandle);
}

/// Copy `block` into a fresh shared region and hand it over to the receiver.
pub fn publish<M: SharedMemory + ?Sized>(
    memory: &M,
    block: &EncodedBlock,
) -> Result<TransferMedium, DragError> {
    let handle = memory.allocate(block.len())?;
    if let Err(err) = memory.write_locked(handle, block.as_bytes()) {
        tracing::warn!("Freeing partially published drop payload: {err}");
        memory.free(handle);
        return Err(err);
    }
    tracing::trace!(
        "Published {} byte drop payload as handle {:#x}",
        block.len(),
        handle.0
    );
    Ok(TransferMedium::receiver_owned(handle))
}

/// In-process stand-in for the global heap, used by the simulated drag loop.
///
/// Clones share the same heap so a simulated receiver can read and release
/// the regions the source published.
#[derive(Debug, Clone, Default)]
pub struct ProcessHeap {
    inner: Arc<Mutex<HeapState>>,
}

#[derive(Debug, Default)]
struct HeapState {
    next_handle: usize,
    regions: HashMap<usize, Vec<u8>>,
    allocation_limit: Option<usize>,
    fail_writes: bool,
    total_allocations: usize,
}

impl ProcessHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any allocation after `limit` successful ones.
    pub fn with_allocation_limit(limit: usize) -> Self {
        let heap = Self::default();
        heap.lock().allocation_limit = Some(limit);
        heap
    }

    /// Make every subsequent copy into a region fail, as if locking failed.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Copy of a live region's contents.
    pub fn read(&self, handle: MemoryHandle) -> Option<Vec<u8>> {
        self.lock().regions.get(&handle.0).cloned()
    }

    /// Release a region as its receiver. Returns false for unknown handles.
    pub fn release(&self, handle: MemoryHandle) -> bool {
        self.lock().regions.remove(&handle.0).is_some()
    }

    /// Number of regions allocated and not yet freed.
    pub fn live_regions(&self) -> usize {
        self.lock().regions.len()
    }

    /// Number of successful allocations over the heap's lifetime.
    pub fn total_allocations(&self) -> usize {
        self.lock().total_allocations
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeapState> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl SharedMemory for ProcessHeap {
    fn allocate(&self, len: usize) -> Result<MemoryHandle, DragError> {
        let mut state = self.lock();
        if state
            .allocation_limit
            .is_some_and(|limit| state.total_allocations >= limit)
        {
            return Err(DragError::AllocationFailure(format!(
                "process heap refused {len} bytes"
            )));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.regions.insert(handle, vec![0u8; len]);
        state.total_allocations += 1;
        Ok(MemoryHandle(handle))
    }

    fn write_locked(&self, handle: MemoryHandle, bytes: &[u8]) -> Result<(), DragError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(DragError::AllocationFailure("region lock failed".into()));
        }
        let region = state
            .regions
            .get_mut(&handle.0)
            .ok_or_else(|| DragError::AllocationFailure("unknown region".into()))?;
        if region.len() != bytes.len() {
            return Err(DragError::AllocationFailure(format!(
                "region holds {} bytes, payload is {}",
                region.len(),
                bytes.len()
            )));
        }
        region.copy_from_slice(bytes);
        Ok(())
    }

    fn free(&self, handle: MemoryHandle) {
        self.lock().regions.remove(&handle.0);
    }
}

#[cfg(target_os = "windows")]
pub use platform::GlobalHeap;

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use std::ffi::c_void;
    use std::ptr::copy_nonoverlapping;
    use windows::Win32::Foundation::HGLOBAL;
    use windows::Win32::System::Memory::{
        GMEM_MOVEABLE, GlobalAlloc, GlobalFree, GlobalLock, GlobalUnlock,
    };

    /// The Windows global heap (`GlobalAlloc(GMEM_MOVEABLE)`).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct GlobalHeap;

    impl GlobalHeap {
        pub(crate) fn hglobal(handle: MemoryHandle) -> HGLOBAL {
            HGLOBAL(handle.0 as *mut c_void)
        }
    }

    impl SharedMemory for GlobalHeap {
        fn allocate(&self, len: usize) -> Result<MemoryHandle, DragError> {
            // SAFETY: allocating movable global memory for shell drag.
            let handle = unsafe { GlobalAlloc(GMEM_MOVEABLE, len) }
                .map_err(|err| DragError::AllocationFailure(format!("GlobalAlloc failed: {err}")))?;
            Ok(MemoryHandle(handle.0 as usize))
        }

        fn write_locked(&self, handle: MemoryHandle, bytes: &[u8]) -> Result<(), DragError> {
            let hglobal = Self::hglobal(handle);
            // SAFETY: handle came from `allocate`; locking pins it for the copy.
            let ptr = unsafe { GlobalLock(hglobal) };
            if ptr.is_null() {
                return Err(DragError::AllocationFailure("GlobalLock failed".into()));
            }
            // SAFETY: the region was allocated with exactly `bytes.len()` bytes.
            unsafe {
                copy_nonoverlapping(bytes.as_ptr(), ptr as *mut u8, bytes.len());
                let _ = GlobalUnlock(hglobal);
            }
            Ok(())
        }

        fn free(&self, handle: MemoryHandle) {
            // SAFETY: only called for regions never handed to a receiver.
            unsafe {
                let _ = GlobalFree(Some(Self::hglobal(handle)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drop_files::encode;
    use crate::format::ReleasePolicy;

    #[test]
    fn publish_copies_block_and_transfers_ownership() {
        let heap = ProcessHeap::new();
        let block = encode(&["/tmp/a.txt"]).unwrap();
        let medium = publish(&heap, &block).unwrap();
        assert_eq!(medium.release, ReleasePolicy::ReceiverOwns);
        assert_eq!(heap.read(medium.handle).unwrap(), block.as_bytes());
        assert!(heap.release(medium.handle));
        assert_eq!(heap.live_regions(), 0);
    }

    #[test]
    fn failed_copy_frees_the_region() {
        let heap = ProcessHeap::new();
        heap.fail_writes(true);
        let block = encode(&["/tmp/a.txt"]).unwrap();
        let result = publish(&heap, &block);
        assert!(matches!(result, Err(DragError::AllocationFailure(_))));
        assert_eq!(heap.total_allocations(), 1);
        assert_eq!(heap.live_regions(), 0);
    }

    #[test]
    fn allocation_limit_reports_failure() {
        let heap = ProcessHeap::with_allocation_limit(1);
        let block = encode(&["/tmp/a.txt"]).unwrap();
        assert!(publish(&heap, &block).is_ok());
        assert!(matches!(
            publish(&heap, &block),
            Err(DragError::AllocationFailure(_))
        ));
        assert_eq!(heap.live_regions(), 1);
    }
}
