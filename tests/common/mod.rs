//! Shared fixtures: an in-memory block device and `fatfs`-formatted images
//! used to cross-check this crate's FAT driver against an independent
//! implementation.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use sdfat::storage::{BlockDevice, IoError, IoResult};

pub const SECTOR: usize = 512;

pub struct MemDisk {
    pub data: Vec<u8>,
}

impl MemDisk {
    pub fn new(data: Vec<u8>) -> Self {
        MemDisk { data }
    }

    pub fn blank(sectors: usize) -> Self {
        MemDisk { data: vec![0; sectors * SECTOR] }
    }
}

impl BlockDevice for MemDisk {
    fn sector_size(&self) -> u16 {
        SECTOR as u16
    }
    fn sector_size_shift(&self) -> u8 {
        9
    }
    fn read_data_block(&mut self, sector: u32, buf: &mut [u8]) -> IoResult<()> {
        let off = sector as usize * SECTOR;
        if off + SECTOR > self.data.len() {
            return Err(IoError::DeviceFault);
        }
        buf.copy_from_slice(&self.data[off..off + SECTOR]);
        Ok(())
    }
    fn write_data_block(&mut self, sector: u32, buf: &[u8]) -> IoResult<()> {
        let off = sector as usize * SECTOR;
        if off + SECTOR > self.data.len() {
            return Err(IoError::DeviceFault);
        }
        self.data[off..off + SECTOR].copy_from_slice(buf);
        Ok(())
    }
}

/// MemDisk wrapper that counts physical reads and writes.
pub struct CountingDisk {
    pub inner: MemDisk,
    pub reads: u32,
    pub writes: u32,
}

impl CountingDisk {
    pub fn new(data: Vec<u8>) -> Self {
        CountingDisk { inner: MemDisk::new(data), reads: 0, writes: 0 }
    }
}

impl BlockDevice for CountingDisk {
    fn sector_size(&self) -> u16 {
        SECTOR as u16
    }
    fn sector_size_shift(&self) -> u8 {
        9
    }
    fn read_data_block(&mut self, sector: u32, buf: &mut [u8]) -> IoResult<()> {
        self.reads += 1;
        self.inner.read_data_block(sector, buf)
    }
    fn write_data_block(&mut self, sector: u32, buf: &[u8]) -> IoResult<()> {
        self.writes += 1;
        self.inner.write_data_block(sector, buf)
    }
}

// ── fatfs-built images ───────────────────────────────────────

fn format_image(size: usize, fat_type: fatfs::FatType, bytes_per_cluster: Option<u32>) -> Vec<u8> {
    let mut cursor = Cursor::new(vec![0u8; size]);
    let mut opts = fatfs::FormatVolumeOptions::new().fat_type(fat_type);
    if let Some(b) = bytes_per_cluster {
        opts = opts.bytes_per_cluster(b);
    }
    fatfs::format_volume(&mut cursor, opts).expect("format_volume failed");
    cursor.into_inner()
}

/// FAT16, 512-byte sectors, 8 sectors per cluster.
pub fn fat16_image() -> Vec<u8> {
    format_image(20 * 1024 * 1024, fatfs::FatType::Fat16, Some(4096))
}

/// FAT32. Needs >= 65 525 data clusters, hence the large image.
pub fn fat32_image() -> Vec<u8> {
    format_image(40 * 1024 * 1024, fatfs::FatType::Fat32, None)
}

/// FAT12, one sector per cluster.
pub fn fat12_image() -> Vec<u8> {
    format_image(1024 * 1024, fatfs::FatType::Fat12, Some(512))
}

/// Write a file into the image via `fatfs`.
pub fn add_file(image: &mut Vec<u8>, name: &str, content: &[u8]) {
    let mut cursor = Cursor::new(image);
    let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new()).unwrap();
    let mut f = fs.root_dir().create_file(name).unwrap();
    f.truncate().unwrap();
    f.write_all(content).unwrap();
}

/// Create a subdirectory with one file in it via `fatfs`.
pub fn add_dir_with_file(image: &mut Vec<u8>, dir: &str, name: &str, content: &[u8]) {
    let mut cursor = Cursor::new(image);
    let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new()).unwrap();
    let d = fs.root_dir().create_dir(dir).unwrap();
    let mut f = d.create_file(name).unwrap();
    f.write_all(content).unwrap();
}

/// Read a root-directory file back via `fatfs`.
pub fn read_via_fatfs(image: &mut Vec<u8>, name: &str) -> Vec<u8> {
    let mut cursor = Cursor::new(image);
    let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new()).unwrap();
    let mut f = fs.root_dir().open_file(name).unwrap();
    let mut out = Vec::new();
    f.read_to_end(&mut out).unwrap();
    out
}

/// True iff `fatfs` can still open the named root-directory file.
pub fn fatfs_has_file(image: &mut Vec<u8>, name: &str) -> bool {
    let mut cursor = Cursor::new(image);
    let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new()).unwrap();
    let found = fs.root_dir().open_file(name).is_ok();
    found
}
