//! Internal error types for the UTL scheduler and SFS file system.
//!
//! Public API methods never return these directly (see `sfs` and `utl` for
//! the sentinel-returning surface); they are the `Err` side of the fallible
//! helpers those methods call, logged and converted at the boundary.

use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum UtlError {
    #[error("maximum thread limit ({max}) reached, task creation refused")]
    TooManyTasks { max: usize },
    #[error("task {0} is not the task currently running on this executor")]
    NotCurrentTask(u32),
    #[error("I/O primitive called outside of a running task")]
    NoCurrentTask,
    #[error("backing syscall failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(ThisError, Debug)]
pub enum SfsError {
    #[error("failed to open backing disk image at '{}'", .path.display())]
    DiskOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("disk I/O failed at lba {lba} (+{count} blocks)")]
    DiskIo {
        lba: u32,
        count: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("superblock magic mismatch: expected {expected:#x}, found {found:#x}")]
    BadMagic { expected: u32, found: u32 },
    #[error("filename '{0}' is empty or exceeds the {1}-byte limit")]
    NameTooLong(String, usize),
    #[error("filename '{0}' already exists")]
    NameExists(String),
    #[error("no free inode available")]
    InodesExhausted,
    #[error("no free file descriptor available")]
    DescriptorsExhausted,
    #[error("no free data block available")]
    BlocksExhausted,
    #[error("file descriptor {0} is not open")]
    DescriptorNotOpen(i32),
    #[error("file descriptor {0} is out of range")]
    DescriptorOutOfRange(i32),
    #[error("file '{0}' is already open")]
    AlreadyOpen(String),
    #[error("file '{0}' was not found")]
    NotFound(String),
    #[error("seek target {loc} is out of bounds for file of size {size}")]
    SeekOutOfBounds { loc: i64, size: u32 },
    #[error("invariant violated: {0}")]
    Invariant(String),
}
