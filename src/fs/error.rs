use core::fmt;

use crate::storage::IoError;

/// Filesystem error types.
///
/// Transport errors arrive wrapped in `Io` and are surfaced without any
/// internal retry. Volume errors are fatal to the mount attempt; the
/// directory/file group is recoverable and reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Underlying block transport failed.
    Io(IoError),
    AlreadyMounted,
    NotMounted,
    /// Boot-sector signature or partition type not recognized.
    UnsupportedFilesystem,
    PartitionDoesNotExist,
    BadSectorsPerCluster,
    TooManyFats,
    FilenameNotFound,
    InvalidFilename,
    EntryNotFile,
    EntryNotDir,
    BadFileMode,
    FileAlreadyExists,
    FileNotOpen,
    EndOfFile,
    /// A cluster chain ended. Real traversal condition; directory lookups
    /// remap it to `FilenameNotFound` when it cuts a search short.
    EndOfChain,
    /// An operation tried to walk past an end-of-chain marker.
    ReadingPastEoc,
    NoSpace,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FsError::Io(e) => write!(f, "I/O error: {}", e),
            FsError::AlreadyMounted => write!(f, "Filesystem already mounted"),
            FsError::NotMounted => write!(f, "No filesystem mounted"),
            FsError::UnsupportedFilesystem => write!(f, "Unsupported or unrecognized filesystem"),
            FsError::PartitionDoesNotExist => write!(f, "Partition does not exist"),
            FsError::BadSectorsPerCluster => write!(f, "Bad sectors-per-cluster value"),
            FsError::TooManyFats => write!(f, "Unsupported FAT count"),
            FsError::FilenameNotFound => write!(f, "No such file"),
            FsError::InvalidFilename => write!(f, "Invalid 8.3 file name"),
            FsError::EntryNotFile => write!(f, "Entry is not a file"),
            FsError::EntryNotDir => write!(f, "Entry is not a directory"),
            FsError::BadFileMode => write!(f, "Bad file mode"),
            FsError::FileAlreadyExists => write!(f, "File exists"),
            FsError::FileNotOpen => write!(f, "File not open"),
            FsError::EndOfFile => write!(f, "End of file"),
            FsError::EndOfChain => write!(f, "End of cluster chain"),
            FsError::ReadingPastEoc => write!(f, "Read past end of cluster chain"),
            FsError::NoSpace => write!(f, "No space left"),
        }
    }
}

impl From<IoError> for FsError {
    fn from(e: IoError) -> Self {
        FsError::Io(e)
    }
}

pub type FsResult<T> = Result<T, FsError>;
