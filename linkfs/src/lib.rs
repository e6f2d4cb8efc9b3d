//! Linked allocation on a simulated disk.
//!
//! A disk is a fixed run of fixed-width blocks. Each file is a chain of blocks
//! where every block carries a slice of the file and a pointer to the next
//! block, and a free pool hands out blocks scattered across the disk.

#[macro_use]
extern crate log;

mod block;
mod chain;
mod config;
mod disk;
mod error;
mod fat;
mod loader;
mod pool;

/// Index of a block on the disk, `0..total_blocks`.
pub type BlockAddress = fileblock::BlockNumber;

pub use block::{Block, BlockStore, EOF_POINTER, HEADER_BLOCK, RECORD_TRAILER_BYTES};
pub use chain::{ChainReader, ChainWriter};
pub use config::{
    AllocationPolicy, DiskConfig, DiskConfigBuilder, DEFAULT_PAYLOAD_CAPACITY,
    DEFAULT_TOTAL_BLOCKS,
};
pub use disk::{AuditReport, DiskUsage, FileEntry, LinkedDisk};
pub use error::{LinkFsError, Result};
pub use fat::FileAllocationTable;
pub use fileblock::{BlockStorage, FileBlockEmulator, FileBlockEmulatorBuilder, MemoryBlockDevice};
pub use loader::{parse_pairs, LoadSummary};
pub use pool::FreeBlockPool;
