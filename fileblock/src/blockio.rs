use std::io::{Error, ErrorKind};
use std::path::Path;

/// The block number to access ranging from 0 (the first block) to n - 1 (the last
/// block) where n is number of blocks available.
pub type BlockNumber = usize;

/// Tried to map as closely as possible to the prescribed interface found here:
/// http://web.mit.edu/6.033/1997/handouts/html/04sfs.html.
///
/// Unlike a real disk the record width is chosen by whoever formats the
/// device, so both the block count and the block width are part of the
/// device geometry.
pub trait BlockStorage {
    /// Opens an existing disk at the specified path. This method does not
    /// validate the stored records, it is up for clients to ensure disks are
    /// appropriately initialized.
    fn open_disk<P: AsRef<Path>>(path: P, nblocks: usize, block_bytes: usize) -> std::io::Result<Self>
    where
        Self: std::marker::Sized;
    /// Reads disk block number into provided buffer.
    ///
    /// # Errors
    ///
    /// Attempting to read a block out of range, or into a buffer shorter than
    /// one block, will return an error.
    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()>;
    /// Writes provided buffer into the specified block number.
    ///
    /// # Errors
    ///
    /// Attempting to write a block out of range, or a buffer that is not
    /// exactly one block wide, will return an error.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()>;
    /// Flush any buffered disk IO from memory.
    fn sync_disk(&mut self) -> std::io::Result<()>;
    /// Total number of addressable blocks.
    fn block_count(&self) -> usize;
    /// Width in bytes of every block.
    fn block_bytes(&self) -> usize;
}

pub(crate) fn check_range(blocknr: BlockNumber, block_count: usize) -> std::io::Result<()> {
    if blocknr >= block_count {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("block {} out of range (device has {})", blocknr, block_count),
        ));
    }
    Ok(())
}

pub(crate) fn check_width(len: usize, block_bytes: usize) -> std::io::Result<()> {
    if len != block_bytes {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("buffer of {} bytes does not match block width {}", len, block_bytes),
        ));
    }
    Ok(())
}
