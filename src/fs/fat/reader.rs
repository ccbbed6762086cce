//! Byte-at-a-time file reading.

use crate::fs::error::{FsError, FsResult};
use crate::storage::BlockDevice;

use super::file::FileHandle;
use super::volume::FatVolume;

/// Read access to a file opened by [`FatVolume::open_reader`].
///
/// The handle holds no reference to the volume; every call takes the volume
/// explicitly. Several handles over the same volume interleave through its
/// one shared buffer.
pub struct FatFileReader {
    handle: FileHandle,
}

impl FatFileReader {
    pub(crate) fn new(handle: FileHandle) -> Self {
        FatFileReader { handle }
    }

    /// Read the byte under the cursor and advance.
    ///
    /// Reading at `len()` yields `EndOfFile`. If another handle took the
    /// shared buffer since the last call, it is flushed and reloaded for
    /// this file first.
    pub fn read_byte<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<u8> {
        if self.handle.open && self.handle.pos >= self.handle.length {
            return Err(FsError::EndOfFile);
        }
        self.handle.position_buffer(vol)?;

        let g = vol.geometry()?;
        let offset = (self.handle.pos & (g.sector_size - 1)) as usize;
        let byte = vol.buffer_byte(offset);
        self.handle.pos += 1;
        Ok(byte)
    }

    /// Read the byte under the cursor without advancing.
    pub fn peek_byte<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<u8> {
        let byte = self.read_byte(vol)?;
        self.handle.pos -= 1;
        Ok(byte)
    }

    /// True once the cursor sits at the end of the file.
    pub fn eof(&self) -> bool {
        self.handle.pos == self.handle.length
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

    /// Close the handle. Readers never dirty the shared buffer, so there is
    /// nothing to flush.
    pub fn close(mut self) {
        self.handle.open = false;
    }
}

impl super::file::Readable for FatFileReader {
    fn read_byte<D: BlockDevice>(&mut self, vol: &mut FatVolume<D>) -> FsResult<u8> {
        FatFileReader::read_byte(self, vol)
    }

    fn eof(&self) -> bool {
        FatFileReader::eof(self)
    }
}
