//! Mount, lookup, and read paths against `fatfs`-formatted images.

mod common;

use common::{add_dir_with_file, add_file, fat12_image, fat16_image, fat32_image, MemDisk};
use sdfat::fs::error::FsError;
use sdfat::fs::fat::{FatVolume, FatWidth, Readable};
use sdfat::storage::BlockDevice;

fn mounted(image: Vec<u8>) -> FatVolume<MemDisk> {
    let mut vol = FatVolume::new(MemDisk::new(image));
    vol.mount(0).unwrap();
    vol
}

fn read_fully<D: BlockDevice, R: Readable>(reader: &mut R, vol: &mut FatVolume<D>) -> Vec<u8> {
    let mut out = Vec::new();
    while !reader.eof() {
        out.push(reader.read_byte(vol).unwrap());
    }
    out
}

#[test]
fn mounts_fat16_with_expected_geometry() {
    let vol = mounted(fat16_image());
    assert_eq!(vol.width(), Some(FatWidth::Fat16));
    assert_eq!(vol.sectors_per_cluster(), Some(8));
}

#[test]
fn mounts_fat32() {
    let vol = mounted(fat32_image());
    assert_eq!(vol.width(), Some(FatWidth::Fat32));
}

#[test]
fn mounts_fat12() {
    let vol = mounted(fat12_image());
    assert_eq!(vol.width(), Some(FatWidth::Fat12));
}

#[test]
fn mount_rejects_blank_disk() {
    let mut vol = FatVolume::new(MemDisk::blank(2048));
    assert_eq!(vol.mount(0), Err(FsError::UnsupportedFilesystem));
}

#[test]
fn missing_file_is_not_found() {
    let mut vol = mounted(fat16_image());
    assert!(matches!(vol.open_reader("NOSUCH.TXT"), Err(FsError::FilenameNotFound)));
}

#[test]
fn reads_a_file_fatfs_wrote() {
    let mut image = fat16_image();
    add_file(&mut image, "HELLO.TXT", b"world");
    let mut vol = mounted(image);

    let mut reader = vol.open_reader("HELLO.TXT").unwrap();
    assert_eq!(reader.len(), 5);
    assert_eq!(read_fully(&mut reader, &mut vol), b"world");
}

#[test]
fn lookup_is_case_insensitive() {
    let mut image = fat16_image();
    add_file(&mut image, "README.TXT", b"data");
    let mut vol = mounted(image);
    assert!(vol.open_reader("readme.txt").is_ok());
    assert!(vol.open_reader("Readme.Txt").is_ok());
}

#[test]
fn read_dir_lists_root_entries() {
    let mut image = fat16_image();
    for name in ["FILE1.TXT", "FILE2.TXT", "FILE3.TXT"] {
        add_file(&mut image, name, name.as_bytes());
    }
    let mut vol = mounted(image);
    let entries = vol.read_dir().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().any(|e| e.name == "FILE1.TXT" && e.size == 9));
    assert!(entries.iter().all(|e| !e.attributes.is_directory()));
}

#[test]
fn read_dir_of_lists_a_subdirectory() {
    let mut image = fat16_image();
    add_dir_with_file(&mut image, "SUB", "INNER.BIN", b"abc");
    let mut vol = mounted(image);

    let entries = vol.read_dir_of("SUB").unwrap();
    assert!(entries.iter().any(|e| e.name == "INNER.BIN" && e.size == 3));
}

#[test]
fn read_dir_of_rejects_files() {
    let mut image = fat16_image();
    add_file(&mut image, "PLAIN.TXT", b"x");
    let mut vol = mounted(image);
    assert_eq!(vol.read_dir_of("PLAIN.TXT").unwrap_err(), FsError::EntryNotDir);
}

#[test]
fn open_reader_rejects_directories() {
    let mut image = fat16_image();
    add_dir_with_file(&mut image, "SUB", "INNER.BIN", b"abc");
    let mut vol = mounted(image);
    assert!(matches!(vol.open_reader("SUB"), Err(FsError::EntryNotFile)));
}

#[test]
fn reads_multi_cluster_file_on_fat12() {
    // One sector per cluster: 180 KB runs the chain past entry 341, whose
    // 12-bit FAT entry straddles the first FAT sector boundary.
    let content: Vec<u8> = (0..180_000u32).map(|i| (i % 253) as u8).collect();
    let mut image = fat12_image();
    add_file(&mut image, "BIG.BIN", &content);
    let mut vol = mounted(image);

    let mut reader = vol.open_reader("BIG.BIN").unwrap();
    assert_eq!(read_fully(&mut reader, &mut vol), content);
}

#[test]
fn reads_multi_cluster_file_on_fat32() {
    let content: Vec<u8> = (0..10_000u32).map(|i| (i ^ 0xAB) as u8).collect();
    let mut image = fat32_image();
    add_file(&mut image, "MULTI.BIN", &content);
    let mut vol = mounted(image);

    let mut reader = vol.open_reader("MULTI.BIN").unwrap();
    assert_eq!(read_fully(&mut reader, &mut vol), content);
}

#[test]
fn eof_is_exact() {
    let mut image = fat16_image();
    add_file(&mut image, "FIVE.TXT", b"12345");
    let mut vol = mounted(image);

    let mut reader = vol.open_reader("FIVE.TXT").unwrap();
    for _ in 0..5 {
        assert!(!reader.eof());
        reader.read_byte(&mut vol).unwrap();
    }
    assert!(reader.eof());
    assert_eq!(reader.read_byte(&mut vol), Err(FsError::EndOfFile));
}

#[test]
fn seek_rewinds_across_clusters() {
    let content: Vec<u8> = (0..9000u32).map(|i| (i % 251) as u8).collect();
    let mut image = fat16_image();
    add_file(&mut image, "SEEK.BIN", &content);
    let mut vol = mounted(image);

    let mut reader = vol.open_reader("SEEK.BIN").unwrap();
    reader.seek(8500).unwrap();
    assert_eq!(reader.read_byte(&mut vol).unwrap(), content[8500]);
    reader.seek(10).unwrap();
    assert_eq!(reader.read_byte(&mut vol).unwrap(), content[10]);
    assert_eq!(reader.seek(content.len() as u32 + 1), Err(FsError::EndOfFile));
}

#[test]
fn peek_does_not_advance() {
    let mut image = fat16_image();
    add_file(&mut image, "PEEK.TXT", b"xy");
    let mut vol = mounted(image);

    let mut reader = vol.open_reader("PEEK.TXT").unwrap();
    assert_eq!(reader.peek_byte(&mut vol).unwrap(), b'x');
    assert_eq!(reader.tell(), 0);
    assert_eq!(reader.read_byte(&mut vol).unwrap(), b'x');
    assert_eq!(reader.read_byte(&mut vol).unwrap(), b'y');
}
