//! FAT12/16/32 on a single partition: volume mounting, cluster-chain math,
//! directory lookup, and byte-at-a-time file readers/writers sharing one
//! sector buffer.

mod dir;
mod file;
mod reader;
mod volume;
mod writer;

pub use dir::{DirEntryInfo, EntryAttributes};
pub use file::{FileMode, Readable, Writable};
pub use reader::FatFileReader;
pub use volume::{FatVolume, FatWidth};
pub use writer::FatFileWriter;
