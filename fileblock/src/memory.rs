use crate::blockio::{check_range, check_width, BlockNumber, BlockStorage};
use std::io::ErrorKind;
use std::path::Path;

/// Block storage held entirely in memory. Contents live as long as the value.
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    bytes: Vec<u8>,
    block_count: usize,
    block_bytes: usize,
}

impl MemoryBlockDevice {
    /// Creates a zeroed device of `block_count` records, each `block_bytes` wide.
    pub fn new(block_count: usize, block_bytes: usize) -> Self {
        Self {
            bytes: vec![0; block_count * block_bytes],
            block_count,
            block_bytes,
        }
    }

    /// Raw view of the whole medium.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn span(&self, blocknr: BlockNumber) -> std::ops::Range<usize> {
        let start = blocknr * self.block_bytes;
        start..start + self.block_bytes
    }
}

impl BlockStorage for MemoryBlockDevice {
    /// Loads a disk image from `path` into memory.
    fn open_disk<P: AsRef<Path>>(path: P, nblocks: usize, block_bytes: usize) -> std::io::Result<Self> {
        let mut bytes = std::fs::read(path)?;
        if bytes.len() < nblocks * block_bytes {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                "disk image is smaller than the requested geometry",
            ));
        }
        bytes.truncate(nblocks * block_bytes);
        Ok(Self {
            bytes,
            block_count: nblocks,
            block_bytes,
        })
    }

    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()> {
        check_range(blocknr, self.block_count)?;
        if buf.len() < self.block_bytes {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer does not contain enough space to read block",
            ));
        }
        let span = self.span(blocknr);
        buf[..self.block_bytes].copy_from_slice(&self.bytes[span]);
        Ok(())
    }

    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        check_range(blocknr, self.block_count)?;
        check_width(buf.len(), self.block_bytes)?;
        let span = self.span(blocknr);
        self.bytes[span].copy_from_slice(buf);
        Ok(())
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn block_count(&self) -> usize {
        self.block_count
    }

    fn block_bytes(&self) -> usize {
        self.block_bytes
    }
}
