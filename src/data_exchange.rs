//! The data object the shell queries while a file drag is in progress.

use crate::drop_files::FileDropPayload;
use crate::error::DragError;
use crate::format::{DataDirection, FormatDescriptor, TransferMedium};
use crate::shared_memory::{SharedMemory, publish};

/// Data and format queries a drop target may issue against a drag source.
pub trait DataExchange {
    /// Whether data can be rendered for `format`. Has no side effects.
    fn query_supports_format(&self, format: &FormatDescriptor) -> bool;
    /// Render the data into a fresh medium owned by the caller.
    fn get_data(&self, format: &FormatDescriptor) -> Result<TransferMedium, DragError>;
    /// Render into a caller-supplied medium.
    fn get_data_in_place(
        &self,
        format: &FormatDescriptor,
        target: &mut TransferMedium,
    ) -> Result<(), DragError>;
    /// Formats available in the given direction.
    fn enumerate_formats(&self, direction: DataDirection) -> Vec<FormatDescriptor>;
}

/// Offers one file list as `CF_HDROP` in global memory.
#[derive(Debug, Clone)]
pub struct FileDropSource<M> {
    payload: FileDropPayload,
    memory: M,
}

impl<M: SharedMemory> FileDropSource<M> {
    pub fn new(payload: FileDropPayload, memory: M) -> Self {
        Self { payload, memory }
    }

    pub fn payload(&self) -> &FileDropPayload {
        &self.payload
    }
}

impl<M: SharedMemory> DataExchange for FileDropSource<M> {
    fn query_supports_format(&self, format: &FormatDescriptor) -> bool {
        let supported = format.is_file_drop();
        tracing::trace!(
            "QueryGetData cf={} aspect={} tymed={:#x} -> {supported}",
            format.format,
            format.aspect,
            format.media.0
        );
        supported
    }

    fn get_data(&self, format: &FormatDescriptor) -> Result<TransferMedium, DragError> {
        if !self.query_supports_format(format) {
            return Err(DragError::UnsupportedFormat);
        }
        let block = self.payload.encode();
        let medium = publish(&self.memory, &block)?;
        tracing::debug!(
            "Rendered {} path(s) for drop target",
            self.payload.paths().len()
        );
        Ok(medium)
    }

    fn get_data_in_place(
        &self,
        _format: &FormatDescriptor,
        _target: &mut TransferMedium,
    ) -> Result<(), DragError> {
        Err(DragError::NotSupported)
    }

    fn enumerate_formats(&self, direction: DataDirection) -> Vec<FormatDescriptor> {
        match direction {
            DataDirection::Get => vec![FormatDescriptor::file_drop()],
            DataDirection::Set => Vec::new(),
        }
    }
}
