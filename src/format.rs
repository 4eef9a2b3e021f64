//! Format descriptors, transfer media and drop effects exchanged with the shell.
//!
//! The numeric values mirror the OLE constants (`CF_HDROP`, `DVASPECT_CONTENT`,
//! `TYMED_HGLOBAL`, `DROPEFFECT_*`) so the COM adapter can convert without
//! lookup tables.

use std::fmt;

/// Clipboard format tag for a list of dropped files.
pub const CF_HDROP: u16 = 15;
/// Default "content" rendering aspect.
pub const DVASPECT_CONTENT: u32 = 1;
/// Item index meaning "all of the data".
pub const LINDEX_ALL: i32 = -1;

/// Bitmask of storage media a receiver will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Media(pub u32);

impl Media {
    /// Relocatable global memory (`TYMED_HGLOBAL`).
    pub const HGLOBAL: Media = Media(1);
    /// A file on disk (`TYMED_FILE`).
    pub const FILE: Media = Media(2);
    /// A COM stream (`TYMED_ISTREAM`).
    pub const ISTREAM: Media = Media(4);
    /// A COM storage (`TYMED_ISTORAGE`).
    pub const ISTORAGE: Media = Media(8);
    /// A GDI bitmap (`TYMED_GDI`).
    pub const GDI: Media = Media(16);

    /// Whether every bit of `other` is present.
    pub fn contains(self, other: Media) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Media {
    type Output = Media;

    fn bitor(self, rhs: Media) -> Media {
        Media(self.0 | rhs.0)
    }
}

/// A requested data shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatDescriptor {
    /// Clipboard format tag.
    pub format: u16,
    /// Rendering aspect.
    pub aspect: u32,
    /// Item index; `-1` for the whole payload.
    pub index: i32,
    /// Media the requester is able to receive.
    pub media: Media,
}

impl FormatDescriptor {
    /// The one descriptor this source provides: `CF_HDROP` in global memory.
    pub const fn file_drop() -> Self {
        Self {
            format: CF_HDROP,
            aspect: DVASPECT_CONTENT,
            index: LINDEX_ALL,
            media: Media::HGLOBAL,
        }
    }

    /// Whether this descriptor asks for the file list in global memory.
    pub fn is_file_drop(&self) -> bool {
        self.format == CF_HDROP
            && self.aspect == DVASPECT_CONTENT
            && (self.index == LINDEX_ALL || self.index == 0)
            && self.media.contains(Media::HGLOBAL)
    }
}

/// Which way a format enumeration is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    /// Formats the source can render (`DATADIR_GET`).
    Get,
    /// Formats the source accepts (`DATADIR_SET`).
    Set,
}

impl DataDirection {
    /// Map the raw OLE direction value.
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            1 => Some(DataDirection::Get),
            2 => Some(DataDirection::Set),
            _ => None,
        }
    }
}

/// Opaque handle to a published shared memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryHandle(pub usize);

/// Who frees a published region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasePolicy {
    /// The receiver owns the region and must free it.
    ReceiverOwns,
    /// The source keeps ownership.
    SourceOwns,
}

/// Storage backend holding transferred data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumKind {
    /// Relocatable global memory.
    HGlobal,
}

/// Data handed to a receiver for one successful query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferMedium {
    pub kind: MediumKind,
    pub handle: MemoryHandle,
    pub release: ReleasePolicy,
}

impl TransferMedium {
    /// A global memory medium whose ownership passes to the receiver.
    pub fn receiver_owned(handle: MemoryHandle) -> Self {
        Self {
            kind: MediumKind::HGlobal,
            handle,
            release: ReleasePolicy::ReceiverOwns,
        }
    }
}

/// Negotiated outcome of a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DropEffect {
    #[default]
    None,
    Copy,
    Move,
    Link,
}

impl DropEffect {
    /// OLE bit value of the effect.
    pub fn bits(self) -> u32 {
        match self {
            DropEffect::None => 0,
            DropEffect::Copy => 1,
            DropEffect::Move => 2,
            DropEffect::Link => 4,
        }
    }

    /// Interpret an OLE effect mask, preferring copy over move over link.
    pub fn from_bits(bits: u32) -> Self {
        if bits & 1 != 0 {
            DropEffect::Copy
        } else if bits & 2 != 0 {
            DropEffect::Move
        } else if bits & 4 != 0 {
            DropEffect::Link
        } else {
            DropEffect::None
        }
    }
}

impl fmt::Display for DropEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DropEffect::None => "None",
            DropEffect::Copy => "Copy",
            DropEffect::Move => "Move",
            DropEffect::Link => "Link",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_drop_descriptor_accepts_combined_media() {
        let mut fd = FormatDescriptor::file_drop();
        fd.media = Media::HGLOBAL | Media::ISTREAM;
        assert!(fd.is_file_drop());
        fd.index = 0;
        assert!(fd.is_file_drop());
        fd.index = 3;
        assert!(!fd.is_file_drop());
    }

    #[test]
    fn effect_bits_prefer_copy() {
        assert_eq!(DropEffect::from_bits(0b111), DropEffect::Copy);
        assert_eq!(DropEffect::from_bits(0b110), DropEffect::Move);
        assert_eq!(DropEffect::from_bits(0), DropEffect::None);
        assert_eq!(DropEffect::Link.bits(), 4);
    }

    #[test]
    fn direction_maps_raw_values() {
        assert_eq!(DataDirection::from_raw(1), Some(DataDirection::Get));
        assert_eq!(DataDirection::from_raw(2), Some(DataDirection::Set));
        assert_eq!(DataDirection::from_raw(7), None);
    }
}
