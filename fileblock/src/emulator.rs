use crate::blockio::{check_range, check_width, BlockNumber, BlockStorage};
use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{BufWriter, ErrorKind, SeekFrom};
use std::path::Path;

/// Emulates block disk storage in userspace using a file as block storage.
/// This is only meant to be used for file system development and testing.
pub struct FileBlockEmulator {
    /// The file must be a fixed-size file some exact multiple of the size of a block.
    fd: File,
    /// The total number of blocks available in the file store.
    block_count: usize,
    /// Width of one record in bytes.
    block_bytes: usize,
}

impl FileBlockEmulator {
    /// Returns ownership of the underlying file descriptor to the caller.
    pub fn into_file(self) -> File {
        self.fd
    }

    fn seek_to(&mut self, blocknr: BlockNumber) -> std::io::Result<()> {
        self.fd
            .seek(SeekFrom::Start((blocknr * self.block_bytes) as u64))?;
        Ok(())
    }
}

impl BlockStorage for FileBlockEmulator {
    fn open_disk<P: AsRef<Path>>(dest: P, nblocks: usize, block_bytes: usize) -> std::io::Result<Self>
    where
        Self: std::marker::Sized,
    {
        // Return error if the file does not exist rather than create one.
        let file = OpenOptions::new().read(true).write(true).open(dest)?;
        let expected = (nblocks * block_bytes) as u64;
        if file.metadata()?.len() < expected {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                "disk image is smaller than the requested geometry",
            ));
        }
        Ok(FileBlockEmulator {
            fd: file,
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
        self.seek_to(blocknr)?;
        // Limit the read to just the block specified.
        let width = self.block_bytes;
        self.fd.read_exact(&mut buf[..width])?;
        Ok(())
    }

    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        check_range(blocknr, self.block_count)?;
        check_width(buf.len(), self.block_bytes)?;
        self.seek_to(blocknr)?;
        self.fd.write_all(buf)?;
        Ok(())
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        self.fd.sync_all()?;
        Ok(())
    }

    fn block_count(&self) -> usize {
        self.block_count
    }

    fn block_bytes(&self) -> usize {
        self.block_bytes
    }
}

pub struct FileBlockEmulatorBuilder {
    fd: File,
    block_count: usize,
    block_bytes: usize,
}

impl From<File> for FileBlockEmulatorBuilder {
    fn from(fd: File) -> Self {
        FileBlockEmulatorBuilder {
            fd,
            block_count: 0,
            block_bytes: 0,
        }
    }
}

impl FileBlockEmulatorBuilder {
    /// Sets the number of desired blocks in the block store device.
    pub fn with_block_count(mut self, blocks: usize) -> Self {
        self.block_count = blocks;
        self
    }

    /// Sets the width of each block record in bytes.
    pub fn with_block_bytes(mut self, bytes: usize) -> Self {
        self.block_bytes = bytes;
        self
    }

    /// This builder assumed ownership of the file descriptor used and does
    /// destructive things to prepare the file for use. Additionally, ownership
    /// of the file is transfered to the emulator meaning this builder can only
    /// be used to create one emulator.
    pub fn build(mut self) -> std::io::Result<FileBlockEmulator> {
        if self.block_count == 0 || self.block_bytes == 0 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block count and block width must both be non-zero",
            ));
        }
        self.zero_blocks()?;
        debug!(
            "formatted file device with {} blocks of {} bytes",
            self.block_count, self.block_bytes
        );
        Ok(FileBlockEmulator {
            fd: self.fd,
            block_count: self.block_count,
            block_bytes: self.block_bytes,
        })
    }

    fn zero_blocks(&mut self) -> std::io::Result<()> {
        self.fd.set_len(0)?;
        self.fd.seek(SeekFrom::Start(0))?;
        let zeroed = vec![0x00; self.block_bytes];
        let mut bfd = BufWriter::new(&self.fd);
        // Zero out every record, buffering each write to prevent excessive syscalls.
        for _ in 0..self.block_count {
            bfd.write_all(&zeroed)?;
        }
        bfd.flush()?;
        Ok(())
    }
}
