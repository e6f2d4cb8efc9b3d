//! Fixed-width block storage used as the backing medium for simulated disks.
//!
//! A device is a flat run of `block_count` records, each exactly `block_bytes`
//! long, so block `n` always lives at byte offset `n * block_bytes`.

#[macro_use]
extern crate log;

mod blockio;
mod emulator;
mod memory;

pub use blockio::{BlockNumber, BlockStorage};
pub use emulator::{FileBlockEmulator, FileBlockEmulatorBuilder};
pub use memory::MemoryBlockDevice;
