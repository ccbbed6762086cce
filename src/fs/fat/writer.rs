//! Byte-at-a-time file writing, chain extension, and flush.

use crate::fs::error::{FsError, FsResult};
use crate::storage::BlockDevice;

use super::file::FileHandle;
use super::volume::FatVolume;

/// Write access to a file opened by [`FatVolume::open_writer`].
pub struct FatFileWriter {
    handle: FileHandle,
}

impl FatFileWriter {
    pub(crate) fn new(handle: FileHandle) -> Self {
        FatFileWriter { handle }
    }

    /// Store one byte at the cursor and advance, growing the file when the
    /// cursor sits at the current end.
    ///
    /// Crossing into a cluster the chain does not have yet allocates
    /// exactly one cluster and links it to the chain before the byte is
    /// placed.
    pub fn write_byte<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>, byte: u8) -> FsResult<()> {
        if self.needs_extension(vol)? {
            vol.alloc_cluster(Some(self.handle.cluster))?;
        }
        match self.handle.position_buffer(vol) {
            Ok(()) => {}
            Err(FsError::ReadingPastEoc) => {
                // The cluster cursor lagged behind the chain tail (an append
                // that landed exactly on a cluster boundary): grow the chain
                // at its real tail and position again.
                self.extend_at_tail(vol)?;
                self.handle.position_buffer(vol)?;
            }
            Err(e) => return Err(e),
        }

        let g = vol.geometry()?;
        let offset = (self.handle.pos & (g.sector_size - 1)) as usize;
        vol.buffer_set_byte(offset, byte);

        if self.handle.pos == self.handle.length {
            self.handle.length += 1;
            self.handle.modified_length = true;
        }
        self.handle.pos += 1;
        Ok(())
    }

    /// Write a whole slice through the byte-at-a-time path.
    pub fn write_all<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>, bytes: &[u8]) -> FsResult<()> {
        for &b in bytes {
            self.write_byte(vol, b)?;
        }
        Ok(())
    }

    /// Walk from the cursor's cluster to the chain tail and hang one fresh
    /// cluster off it.
    fn extend_at_tail<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<()> {
        let mut tail = self.handle.cluster;
        loop {
            let next = vol.get_fat_value(tail)?;
            if next < 2 || vol.is_eoc(next) {
                break;
            }
            tail = next;
        }
        vol.alloc_cluster(Some(tail))?;
        Ok(())
    }

    /// The write position needs a cluster beyond the current one while the
    /// look-ahead already marks end-of-chain.
    fn needs_extension<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<bool> {
        if !self.handle.open {
            return Err(FsError::FileNotOpen);
        }
        let g = vol.geometry()?;
        let required = (self.handle.pos >> g.sector_shift) >> g.cluster_shift;
        if self.handle.cluster_index >= required {
            return Ok(false);
        }
        let next = if vol.buffer_owner() == self.handle.id {
            vol.buffer_next_cluster()
        } else {
            vol.get_fat_value(self.handle.cluster)?
        };
        Ok(vol.is_eoc(next))
    }

    /// Write back anything pending: the data sector if this handle owns a
    /// dirty buffer, then the directory entry's length field when it
    /// changed. A second flush with nothing new performs no physical write.
    pub fn flush<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<()> {
        if !self.handle.open {
            return Err(FsError::FileNotOpen);
        }
        if vol.buffer_owner() == self.handle.id {
            vol.flush_buffer()?;
        }
        if self.handle.modified_length {
            vol.load_sector(self.handle.dir_sector, crate::storage::FS_OWNER)?;
            vol.buffer_write_length(self.handle.dir_entry_offset, self.handle.length);
            vol.flush_buffer()?;
            self.handle.modified_length = false;
        }
        Ok(())
    }

    /// Flush and release the handle. Always flushes first.
    pub fn close<D: BlockDevice>(mut self, vol: &mut FatVolume<D>) -> FsResult<()> {
        self.flush(vol)?;
        self.handle.open = false;
        Ok(())
    }

    pub fn len(&self) -> u32 {
        self.handle.length
    }

    pub fn is_empty(&self) -> bool {
        self.handle.length == 0
    }

    /// Decoded 8.3 name this handle was opened with.
    pub fn name(&self) -> alloc::string::String {
        let (buf, n) = super::dir::decode_83(&self.handle.name);
        alloc::string::String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    pub fn mode(&self) -> super::file::FileMode {
        self.handle.mode
    }

    /// This handle's buffer-ownership id.
    pub fn id(&self) -> u32 {
        self.handle.id
    }

    /// Current byte position.
    pub fn tell(&self) -> u32 {
        self.handle.pos
    }

    /// Reposition the cursor anywhere in `0..=len()`.
    pub fn seek(&mut self, pos: u32) -> FsResult<()> {
        self.handle.seek_to(pos)
    }
}

impl super::file::Writable for FatFileWriter {
    fn write_byte<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>, byte: u8) -> FsResult<()> {
        FatFileWriter::write_byte(self, vol, byte)
    }

    fn flush<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<()> {
        FatFileWriter::flush(self, vol)
    }
}
