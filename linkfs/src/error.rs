use crate::BlockAddress;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkFsError {
    #[error("block {addr} out of range (disk has {total} blocks)")]
    OutOfRange { addr: BlockAddress, total: usize },
    #[error("no free blocks left on disk")]
    DiskFull,
    #[error("insufficient space: {needed} blocks needed, {available} free")]
    InsufficientSpace { needed: usize, available: usize },
    #[error("block {0} is already free")]
    AlreadyFree(BlockAddress),
    #[error("file \"{0}\" already exists")]
    DuplicateIdentifier(String),
    #[error("found no file named \"{0}\"")]
    NotFound(String),
    #[error("corrupt chain starting at block {head}: block {addr} {reason}")]
    CorruptChain {
        head: BlockAddress,
        addr: BlockAddress,
        reason: String,
    },
    #[error("payload of {len} bytes exceeds block capacity of {capacity}")]
    PayloadTooLarge { len: usize, capacity: usize },
    #[error("invalid disk configuration: {0}")]
    InvalidConfig(String),
    #[error("block device error")]
    Io(#[from] std::io::Error),
}

impl LinkFsError {
    /// Errors that point at broken bookkeeping or a damaged medium rather than
    /// a condition the caller can fix by retrying or renaming.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LinkFsError::OutOfRange { .. } | LinkFsError::CorruptChain { .. } | LinkFsError::Io(_)
        )
    }

    /// True for the two out-of-space conditions.
    pub fn is_out_of_space(&self) -> bool {
        matches!(
            self,
            LinkFsError::DiskFull | LinkFsError::InsufficientSpace { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LinkFsError>;
