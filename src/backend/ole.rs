//! OLE drag loop: exposes the capability objects to the shell as COM
//! `IDataObject` / `IDropSource` and runs `DoDragDrop`.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use windows::Win32::Foundation::{
    DRAGDROP_S_CANCEL, DRAGDROP_S_DROP, DRAGDROP_S_USEDEFAULTCURSORS, DV_E_FORMATETC,
    E_INVALIDARG, E_NOTIMPL, OLE_E_ADVISENOTSUPPORTED, S_OK,
};
use windows::Win32::System::Com::{
    FORMATETC, IAdviseSink, IDataObject, IDataObject_Impl, IEnumFORMATETC, IEnumSTATDATA,
    STGMEDIUM, STGMEDIUM_0, TYMED_HGLOBAL,
};
use windows::Win32::System::Ole::{
    DROPEFFECT, DoDragDrop, IDropSource, IDropSource_Impl, OleInitialize, OleUninitialize,
};
use windows::Win32::System::SystemServices::MODIFIERKEYS_FLAGS;
use windows::Win32::UI::Shell::SHCreateStdEnumFmtEtc;
use windows::core::{BOOL, HRESULT, Ref};
use windows_implement::implement;

use super::DragBackend;
use crate::data_exchange::{DataExchange, FileDropSource};
use crate::drag_feedback::{
    ContinueAction, DragFeedback, FeedbackAction, FileDragFeedback, InputState,
};
use crate::error::DragError;
use crate::format::{
    DataDirection, DropEffect, FormatDescriptor, Media, MemoryHandle, TransferMedium,
};
use crate::shared_memory::GlobalHeap;

/// The OLE drag subsystem of the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct OleBackend;

impl DragBackend for OleBackend {
    type Memory = GlobalHeap;

    fn memory(&self) -> GlobalHeap {
        GlobalHeap
    }

    fn initialize(&self) -> Result<(), DragError> {
        // SAFETY: single-threaded OLE init for drag/drop, balanced by `uninitialize`.
        unsafe { OleInitialize(None) }
            .map_err(|err| DragError::SessionInitFailure(format!("OleInitialize failed: {err}")))
    }

    fn uninitialize(&self) {
        unsafe { OleUninitialize() };
    }

    fn run_loop(
        &self,
        source: FileDropSource<GlobalHeap>,
        feedback: Arc<FileDragFeedback>,
        allowed: DropEffect,
    ) -> Result<DropEffect, DragError> {
        let data_object: IDataObject = FileDropDataObject { source }.into();
        let drop_source: IDropSource = FeedbackDropSource { feedback }.into();
        let mut effect = DROPEFFECT(0);
        // SAFETY: OLE initialized by the session guard; both objects satisfy COM contracts.
        unsafe {
            DoDragDrop(
                &data_object,
                &drop_source,
                DROPEFFECT(allowed.bits()),
                &mut effect,
            )
        }
        .ok()
        .map_err(|err| DragError::DragLoopFailure(err.to_string()))?;
        Ok(DropEffect::from_bits(effect.0))
    }
}

#[implement(IDataObject)]
struct FileDropDataObject {
    source: FileDropSource<GlobalHeap>,
}

#[implement(IDropSource)]
struct FeedbackDropSource {
    feedback: Arc<FileDragFeedback>,
}

fn descriptor(format: &FORMATETC) -> FormatDescriptor {
    FormatDescriptor {
        format: format.cfFormat,
        aspect: format.dwAspect,
        index: format.lindex,
        media: Media(format.tymed),
    }
}

fn formatetc(descriptor: &FormatDescriptor) -> FORMATETC {
    FORMATETC {
        cfFormat: descriptor.format,
        ptd: std::ptr::null_mut(),
        dwAspect: descriptor.aspect,
        lindex: descriptor.index,
        tymed: descriptor.media.0,
    }
}

fn read_format(format: *const FORMATETC) -> windows::core::Result<FormatDescriptor> {
    if format.is_null() {
        return Err(windows::core::Error::from(E_INVALIDARG));
    }
    // SAFETY: checked for null; the shell keeps it alive for the call.
    Ok(descriptor(unsafe { &*format }))
}

fn hresult(err: &DragError) -> HRESULT {
    match err {
        DragError::NotSupported => E_NOTIMPL,
        _ => DV_E_FORMATETC,
    }
}

fn continue_hresult(action: ContinueAction) -> HRESULT {
    match action {
        ContinueAction::Continue => S_OK,
        ContinueAction::Drop => DRAGDROP_S_DROP,
        ContinueAction::Cancel => DRAGDROP_S_CANCEL,
    }
}

fn feedback_hresult(action: FeedbackAction) -> HRESULT {
    match action {
        FeedbackAction::UseDefaultCursors => DRAGDROP_S_USEDEFAULTCURSORS,
    }
}

#[allow(non_snake_case)]
impl IDataObject_Impl for FileDropDataObject_Impl {
    fn GetData(&self, pformatetcin: *const FORMATETC) -> windows::core::Result<STGMEDIUM> {
        let format = read_format(pformatetcin)?;
        let medium = self.source.get_data(&format).map_err(|err| {
            if err.is_query_local() {
                tracing::debug!("GetData refused: {err}");
            } else {
                tracing::warn!("GetData failed: {err}");
            }
            windows::core::Error::from(hresult(&err))
        })?;
        Ok(STGMEDIUM {
            tymed: TYMED_HGLOBAL.0 as u32,
            u: STGMEDIUM_0 {
                hGlobal: GlobalHeap::hglobal(medium.handle),
            },
            // Null release object: the receiver frees the HGLOBAL.
            pUnkForRelease: ManuallyDrop::new(None),
        })
    }

    fn GetDataHere(
        &self,
        pformatetc: *const FORMATETC,
        pmedium: *mut STGMEDIUM,
    ) -> windows::core::Result<()> {
        let format = read_format(pformatetc)?;
        if pmedium.is_null() {
            return Err(windows::core::Error::from(E_INVALIDARG));
        }
        // SAFETY: checked for null; only the handle value is read.
        let handle = unsafe { (*pmedium).u.hGlobal.0 as usize };
        let mut target = TransferMedium::receiver_owned(MemoryHandle(handle));
        self.source
            .get_data_in_place(&format, &mut target)
            .map_err(|err| windows::core::Error::from(hresult(&err)))
    }

    fn QueryGetData(&self, pformatetc: *const FORMATETC) -> HRESULT {
        match read_format(pformatetc) {
            Ok(format) if self.source.query_supports_format(&format) => S_OK,
            Ok(_) => DV_E_FORMATETC,
            Err(err) => err.code(),
        }
    }

    fn GetCanonicalFormatEtc(
        &self,
        pformatectin: *const FORMATETC,
        pformatetcout: *mut FORMATETC,
    ) -> HRESULT {
        if pformatectin.is_null() || pformatetcout.is_null() {
            return E_INVALIDARG;
        }
        unsafe {
            *pformatetcout = *pformatectin;
            (*pformatetcout).ptd = std::ptr::null_mut();
        }
        S_OK
    }

    fn SetData(
        &self,
        _pformatetc: *const FORMATETC,
        _pmedium: *const STGMEDIUM,
        _frelease: BOOL,
    ) -> windows::core::Result<()> {
        Err(windows::core::Error::from(E_NOTIMPL))
    }

    fn EnumFormatEtc(&self, dwdirection: u32) -> windows::core::Result<IEnumFORMATETC> {
        let direction = DataDirection::from_raw(dwdirection)
            .ok_or_else(|| windows::core::Error::from(E_INVALIDARG))?;
        let formats: Vec<FORMATETC> = self
            .source
            .enumerate_formats(direction)
            .iter()
            .map(formatetc)
            .collect();
        unsafe { SHCreateStdEnumFmtEtc(&formats) }
    }

    fn DAdvise(
        &self,
        _pformatetc: *const FORMATETC,
        _advf: u32,
        _padvsink: Ref<'_, IAdviseSink>,
    ) -> windows::core::Result<u32> {
        Err(windows::core::Error::from(OLE_E_ADVISENOTSUPPORTED))
    }

    fn DUnadvise(&self, _dwconnection: u32) -> windows::core::Result<()> {
        Err(windows::core::Error::from(OLE_E_ADVISENOTSUPPORTED))
    }

    fn EnumDAdvise(&self) -> windows::core::Result<IEnumSTATDATA> {
        Err(windows::core::Error::from(OLE_E_ADVISENOTSUPPORTED))
    }
}

#[allow(non_snake_case)]
impl IDropSource_Impl for FeedbackDropSource_Impl {
    fn QueryContinueDrag(&self, escape_pressed: BOOL, key_state: MODIFIERKEYS_FLAGS) -> HRESULT {
        let input = InputState {
            escape_pressed: escape_pressed.as_bool(),
            key_state: key_state.0 as u32,
        };
        continue_hresult(self.feedback.query_continue(input))
    }

    fn GiveFeedback(&self, dweffect: DROPEFFECT) -> HRESULT {
        feedback_hresult(self.feedback.give_feedback(DropEffect::from_bits(dweffect.0)))
    }
}
