//! Directory entries: 32-byte on-disk layout, attribute bits, and the 8.3
//! short-name codec.
//!
//! On-disk fields are only touched through offset accessors over the sector
//! slice - never through a struct overlay - so layout and endianness stay
//! explicit.

use alloc::string::String;

use bitflags::bitflags;

use crate::fs::error::{FsError, FsResult};
use crate::storage::buffer::NO_CLUSTER;
use crate::storage::{get_long, get_short, write_long, write_short};

use super::volume::FatWidth;

// ══════════════════════════════════════════════════════════════
//  Entry layout
// ══════════════════════════════════════════════════════════════

pub(crate) const ENTRY_LEN: usize = 32;

const NAME_OFFSET: usize = 0x00;
const ATTR_OFFSET: usize = 0x0B;
const CLUSTER_HIGH_OFFSET: usize = 0x14; // FAT32 only
const CLUSTER_LOW_OFFSET: usize = 0x1A;
const LENGTH_OFFSET: usize = 0x1C;

/// First name byte marking a free entry; also terminates the directory.
pub(crate) const FREE_MARK: u8 = 0x00;
/// First name byte marking a deleted entry; scan continues past it.
pub(crate) const DELETED_MARK: u8 = 0xE5;
/// Escape for a real first name byte of 0xE5.
const KANJI_ESCAPE: u8 = 0x05;

const BASE_LEN: usize = 8;
const EXT_LEN: usize = 3;

bitflags! {
    /// Attribute bits of a directory entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
    }
}

impl EntryAttributes {
    /// Long-filename entries carry all four low bits at once.
    pub fn is_long_name(self) -> bool {
        self.contains(
            Self::READ_ONLY | Self::HIDDEN | Self::SYSTEM | Self::VOLUME_ID,
        )
    }

    pub fn is_directory(self) -> bool {
        self.contains(Self::DIRECTORY)
    }
}

// ── Field accessors ──────────────────────────────────────────

pub(crate) fn raw_name(sector: &[u8], entry: usize) -> [u8; 11] {
    let mut name = [0u8; 11];
    name.copy_from_slice(&sector[entry + NAME_OFFSET..entry + NAME_OFFSET + 11]);
    name
}

pub(crate) fn attributes(sector: &[u8], entry: usize) -> EntryAttributes {
    EntryAttributes::from_bits_retain(sector[entry + ATTR_OFFSET])
}

/// Assemble the starting cluster: low word, plus the high word on FAT32
/// with the four reserved top bits cleared.
pub(crate) fn first_cluster(sector: &[u8], entry: usize, width: FatWidth) -> u32 {
    let low = get_short(sector, entry + CLUSTER_LOW_OFFSET) as u32;
    match width {
        FatWidth::Fat32 => {
            let high = get_short(sector, entry + CLUSTER_HIGH_OFFSET) as u32;
            ((high << 16) | low) & 0x0FFF_FFFF
        }
        _ => low,
    }
}

pub(crate) fn set_first_cluster(sector: &mut [u8], entry: usize, cluster: u32, width: FatWidth) {
    write_short(sector, entry + CLUSTER_LOW_OFFSET, cluster as u16);
    if width == FatWidth::Fat32 {
        write_short(sector, entry + CLUSTER_HIGH_OFFSET, (cluster >> 16) as u16);
    }
}

pub(crate) fn length(sector: &[u8], entry: usize) -> u32 {
    get_long(sector, entry + LENGTH_OFFSET)
}

pub(crate) fn set_length(sector: &mut [u8], entry: usize, len: u32) {
    write_long(sector, entry + LENGTH_OFFSET, len);
}

pub(crate) fn mark_deleted(sector: &mut [u8], entry: usize) {
    sector[entry + NAME_OFFSET] = DELETED_MARK;
}

/// Fill a fresh 32-byte entry: name, attributes, starting cluster, zero
/// length. Timestamp fields stay zero.
pub(crate) fn write_new_entry(
    sector: &mut [u8],
    entry: usize,
    name83: &[u8; 11],
    attrs: EntryAttributes,
    cluster: u32,
    width: FatWidth,
) {
    sector[entry..entry + ENTRY_LEN].fill(0);
    sector[entry + NAME_OFFSET..entry + NAME_OFFSET + 11].copy_from_slice(name83);
    sector[entry + ATTR_OFFSET] = attrs.bits();
    set_first_cluster(sector, entry, cluster, width);
    set_length(sector, entry, 0);
}

// ══════════════════════════════════════════════════════════════
//  8.3 names
// ══════════════════════════════════════════════════════════════

/// Encode a user-supplied name into the 11-byte space-padded 8.3 form.
/// Comparison is case-insensitive because both sides get uppercased.
pub(crate) fn encode_83(name: &str) -> FsResult<[u8; 11]> {
    let name = name.trim();
    if name.is_empty() || name.len() > BASE_LEN + EXT_LEN + 1 {
        return Err(FsError::InvalidFilename);
    }

    let (base, ext) = match name.rfind('.') {
        Some(dot) => (&name[..dot], &name[dot + 1..]),
        None => (name, ""),
    };
    if base.is_empty() || base.len() > BASE_LEN || ext.len() > EXT_LEN {
        return Err(FsError::InvalidFilename);
    }

    let mut out = [b' '; 11];
    for (i, b) in base.bytes().enumerate() {
        if !b.is_ascii() || b == b' ' {
            return Err(FsError::InvalidFilename);
        }
        out[i] = b.to_ascii_uppercase();
    }
    for (i, b) in ext.bytes().enumerate() {
        if !b.is_ascii() || b == b' ' {
            return Err(FsError::InvalidFilename);
        }
        out[BASE_LEN + i] = b.to_ascii_uppercase();
    }
    Ok(out)
}

/// Decode the padded on-disk form back into `NAME.EXT`, honoring the 0x05
/// escape for a first byte of 0xE5.
pub(crate) fn decode_83(raw: &[u8; 11]) -> ([u8; 12], usize) {
    let mut out = [0u8; 12];
    let mut n = 0;

    for (i, &b) in raw[..BASE_LEN].iter().enumerate() {
        if b == b' ' {
            continue;
        }
        out[n] = if i == 0 && b == KANJI_ESCAPE { DELETED_MARK } else { b };
        n += 1;
    }
    if raw[BASE_LEN] != b' ' {
        out[n] = b'.';
        n += 1;
        for &b in &raw[BASE_LEN..] {
            if b != b' ' {
                out[n] = b;
                n += 1;
            }
        }
    }
    (out, n)
}

// ══════════════════════════════════════════════════════════════
//  Traversal state
// ══════════════════════════════════════════════════════════════

/// Position within a directory. The FAT12/16 root lives in a fixed region
/// rather than a cluster chain; `cluster` holds the no-cluster sentinel
/// there and `index` counts sectors from the start of the region.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DirCursor {
    pub(crate) cluster: u32,
    /// Absolute sector currently pointed at.
    pub(crate) sector: u32,
    /// Sector index within the cluster (or the fixed root region).
    pub(crate) index: u32,
}

impl DirCursor {
    pub(crate) fn in_fixed_root(&self) -> bool {
        self.cluster == NO_CLUSTER
    }
}

/// A directory entry located by `find`: where it lives plus the fields a
/// file handle needs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Located {
    pub(crate) dir_sector: u32,
    pub(crate) entry_offset: usize,
    pub(crate) attributes: EntryAttributes,
    pub(crate) first_cluster: u32,
    pub(crate) length: u32,
}

/// A decoded entry as returned by directory listing.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub attributes: EntryAttributes,
    pub size: u32,
    pub first_cluster: u32,
}

// ══════════════════════════════════════════════════════════════
//  Unit tests
// ══════════════════════════════════════════════════════════════
