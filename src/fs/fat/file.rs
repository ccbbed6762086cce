//! Per-open-file state and the shared-buffer positioning logic common to
//! readers and writers.
//!
//! Each handle keeps its own position counters (current cluster number,
//! cluster index, sector index) separate from the shared buffer's metadata,
//! so several files can interleave access to the one buffer. Losing the
//! buffer to another owner costs a flush-and-reload; that reload is the
//! price of sharing and is never skipped.

use crate::fs::error::{FsError, FsResult};
use crate::storage::BlockDevice;

use super::dir::Located;
use super::volume::FatVolume;

/// Byte-at-a-time read capability; the seam a text scanner or any other
/// byte consumer layers on.
pub trait Readable {
    fn read_byte<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<u8>;
    fn eof(&self) -> bool;
}

/// Byte-at-a-time write capability; the seam a printer layers on.
pub trait Writable {
    fn write_byte<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>, byte: u8) -> FsResult<()>;
    fn flush<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<()>;
}

/// Open mode of a file handle.
///
/// `Read` belongs to readers only; every other mode opens a writer.
/// The update variants open an existing file for in-place modification;
/// `Write`/`Append` create the file when it is missing; `CreateNew`
/// insists on creating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    ReadUpdate,
    Write,
    WriteUpdate,
    Append,
    AppendUpdate,
    CreateNew,
}

impl FileMode {
    pub(crate) fn writable(self) -> bool {
        !matches!(self, FileMode::Read)
    }

    pub(crate) fn creates_missing(self) -> bool {
        matches!(
            self,
            FileMode::Write
                | FileMode::WriteUpdate
                | FileMode::Append
                | FileMode::AppendUpdate
                | FileMode::CreateNew
        )
    }

    pub(crate) fn appends(self) -> bool {
        matches!(self, FileMode::Append | FileMode::AppendUpdate)
    }
}

/// State of one open file: identity, byte cursor, cluster cursor, and the
/// location of its 32-byte directory entry (needed to rewrite the length
/// on flush).
pub(crate) struct FileHandle {
    pub(crate) name: [u8; 11],
    /// Unique per open handle; tags shared-buffer ownership.
    pub(crate) id: u32,
    pub(crate) mode: FileMode,
    pub(crate) length: u32,
    pub(crate) pos: u32,
    /// Set when `length` changed and must be persisted on flush.
    pub(crate) modified_length: bool,
    pub(crate) first_cluster: u32,
    pub(crate) dir_sector: u32,
    pub(crate) dir_entry_offset: usize,
    /// Cluster number currently under the cursor.
    pub(crate) cluster: u32,
    /// 0-based count of that cluster within the file.
    pub(crate) cluster_index: u32,
    /// 0-based count of the loaded sector within the file.
    pub(crate) sector_index: u32,
    pub(crate) open: bool,
}

impl FileHandle {
    pub(crate) fn new(name: [u8; 11], id: u32, mode: FileMode, located: &Located) -> Self {
        FileHandle {
            name,
            id,
            mode,
            length: located.length,
            pos: 0,
            modified_length: false,
            first_cluster: located.first_cluster,
            dir_sector: located.dir_sector,
            dir_entry_offset: located.entry_offset,
            cluster: located.first_cluster,
            cluster_index: 0,
            sector_index: 0,
            open: false,
        }
    }

    /// Make the sector containing `pos` the buffer's content, owned by this
    /// handle. Reclaims the buffer when another owner holds it, then walks
    /// the cluster chain if the cursor moved.
    pub(crate) fn position_buffer<D: BlockDevice>(
        &mut self,
        vol: &mut FatVolume<D>,
    ) -> FsResult<()> {
        if !self.open {
            return Err(FsError::FileNotOpen);
        }
        let g = vol.geometry()?;
        let target = self.pos >> g.sector_shift;

        if vol.buffer_owner() != self.id {
            self.reclaim(vol)?;
        }
        if target != self.sector_index {
            self.move_to_sector(vol, target)?;
        }
        Ok(())
    }

    /// Re-load the sector under this handle's own counters after the buffer
    /// served someone else, re-fetching the chain look-ahead.
    fn reclaim<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<()> {
        vol.flush_buffer()?;
        let g = vol.geometry()?;
        let next = vol.get_fat_value(self.cluster)?;
        let within = self.sector_index & g.sector_mask();
        vol.load_sector(g.sector_of_cluster(self.cluster) + within, self.id)?;
        vol.set_buffer_chain(self.cluster, within, next);
        Ok(())
    }

    /// Walk the cluster chain to the file-relative sector `target` and load
    /// it. A forward step of one cluster rides the pre-fetched look-ahead,
    /// so the boundary itself costs no extra FAT read; a backward move
    /// restarts from the head of the chain.
    fn move_to_sector<D: BlockDevice>(
        &mut self,
        vol: &mut FatVolume<D>,
        target: u32,
    ) -> FsResult<()> {
        let g = vol.geometry()?;
        let target_cluster = target >> g.cluster_shift;

        // Walk on locals and commit at the end, so a chain that comes up
        // short leaves the handle's counters consistent.
        let mut cluster = self.cluster;
        let mut index = self.cluster_index;
        let mut next = vol.buffer_next_cluster();
        if target_cluster < index {
            cluster = self.first_cluster;
            index = 0;
            next = vol.get_fat_value(cluster)?;
        }
        while index < target_cluster {
            if next < 2 || vol.is_eoc(next) {
                return Err(FsError::ReadingPastEoc);
            }
            cluster = next;
            index += 1;
            next = vol.get_fat_value(cluster)?;
        }

        self.cluster = cluster;
        self.cluster_index = index;
        self.sector_index = target;
        let within = target & g.sector_mask();
        vol.load_sector(g.sector_of_cluster(cluster) + within, self.id)?;
        vol.set_buffer_chain(cluster, within, next);
        Ok(())
    }

    /// Move the byte cursor. Positions up to and including `length` are
    /// valid; the sector itself is loaded lazily by the next access.
    pub(crate) fn seek_to(&mut self, pos: u32) -> FsResult<()> {
        if !self.open {
            return Err(FsError::FileNotOpen);
        }
        if pos > self.length {
            return Err(FsError::EndOfFile);
        }
        self.pos = pos;
        Ok(())
    }
}
