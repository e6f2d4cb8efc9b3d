use crate::error::{LinkFsError, Result};
use crate::BlockAddress;
use fileblock::BlockStorage;
use std::convert::TryFrom;
use zerocopy::byteorder::{BigEndian, I32, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

/// Block reserved for the disk header. Never part of a chain.
pub const HEADER_BLOCK: BlockAddress = 0;

/// Value of the pointer field on the last block of a chain.
pub const EOF_POINTER: i32 = -1;

/// Bytes following the payload in every record.
pub const RECORD_TRAILER_BYTES: usize = std::mem::size_of::<RecordTrailer>();

const PAYLOAD_PAD: u8 = b' ';

/// Fixed tail of every on-disk record.
///
/// # Layout
/// =====================================================
/// | payload (P bytes, space padded) | len | next      |
/// =====================================================
///
/// `len` is the number of meaningful payload bytes so payloads that end in
/// spaces survive the padding. `next` is the address of the following block
/// or `EOF_POINTER`.
#[repr(C)]
#[derive(FromZeroes, FromBytes, AsBytes, Unaligned, Clone, Copy)]
struct RecordTrailer {
    len: U32<BigEndian>,
    next: I32<BigEndian>,
}

/// One unit of allocation: a slice of file content and the link to the rest
/// of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub payload: Vec<u8>,
    /// `None` marks the end of the chain.
    pub next: Option<BlockAddress>,
}

impl Block {
    pub fn new(payload: Vec<u8>, next: Option<BlockAddress>) -> Self {
        Self { payload, next }
    }

    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }

    fn encode(&self, capacity: usize, next: i32) -> Vec<u8> {
        let mut record = Vec::with_capacity(capacity + RECORD_TRAILER_BYTES);
        record.extend_from_slice(&self.payload);
        record.resize(capacity, PAYLOAD_PAD);

        let trailer = RecordTrailer {
            len: U32::new(self.payload.len() as u32),
            next: I32::new(next),
        };
        record.extend_from_slice(trailer.as_bytes());
        record
    }

    fn decode(record: &[u8], capacity: usize) -> std::result::Result<Self, String> {
        let trailer = RecordTrailer::read_from(&record[capacity..])
            .ok_or_else(|| "record is truncated".to_string())?;

        let len = trailer.len.get() as usize;
        if len > capacity {
            return Err(format!(
                "claims {} payload bytes but blocks hold {}",
                len, capacity
            ));
        }
        let next = match trailer.next.get() {
            EOF_POINTER => None,
            ptr if ptr >= 0 => Some(ptr as BlockAddress),
            ptr => return Err(format!("has invalid pointer {}", ptr)),
        };
        Ok(Block {
            payload: record[..len].to_vec(),
            next,
        })
    }
}

/// Addressable array of blocks over a fixed-width record device.
///
/// Only checks addresses and payload width. Keeping chains consistent is up
/// to the chain writer and reader.
pub struct BlockStore<T: BlockStorage> {
    dev: T,
    payload_capacity: usize,
    record_buf: Vec<u8>,
}

impl<T: BlockStorage> BlockStore<T> {
    /// Writes the header block to `dev`.
    ///
    /// Data blocks are left as they are: a block is only ever read after a
    /// chain writer has filled it.
    pub fn format(dev: T, payload_capacity: usize) -> Result<Self> {
        let mut store = Self::attach(dev, payload_capacity)?;
        store.write(HEADER_BLOCK, &Block::default())?;
        store.dev.sync_disk()?;
        Ok(store)
    }

    /// Attaches to a device that already holds records, e.g. a disk image
    /// written by an earlier run. Only the header block is checked.
    pub fn open(dev: T, payload_capacity: usize) -> Result<Self> {
        let mut store = Self::attach(dev, payload_capacity)?;
        let header = store.read(HEADER_BLOCK)?;
        if !header.is_last() {
            return Err(LinkFsError::CorruptChain {
                head: HEADER_BLOCK,
                addr: HEADER_BLOCK,
                reason: "is not a formatted header".to_string(),
            });
        }
        Ok(store)
    }

    fn attach(dev: T, payload_capacity: usize) -> Result<Self> {
        let record_bytes = payload_capacity + RECORD_TRAILER_BYTES;
        if dev.block_bytes() != record_bytes {
            return Err(LinkFsError::InvalidConfig(format!(
                "device records are {} bytes wide, expected {}",
                dev.block_bytes(),
                record_bytes
            )));
        }
        Ok(Self {
            dev,
            payload_capacity,
            record_buf: vec![0; record_bytes],
        })
    }

    pub fn total_blocks(&self) -> usize {
        self.dev.block_count()
    }

    pub fn payload_capacity(&self) -> usize {
        self.payload_capacity
    }

    pub fn read(&mut self, addr: BlockAddress) -> Result<Block> {
        self.check_range(addr)?;
        self.dev.read_block(addr, &mut self.record_buf)?;
        Block::decode(&self.record_buf, self.payload_capacity).map_err(|reason| {
            LinkFsError::CorruptChain {
                head: addr,
                addr,
                reason,
            }
        })
    }

    pub fn write(&mut self, addr: BlockAddress, block: &Block) -> Result<()> {
        self.check_range(addr)?;
        if block.payload.len() > self.payload_capacity {
            return Err(LinkFsError::PayloadTooLarge {
                len: block.payload.len(),
                capacity: self.payload_capacity,
            });
        }
        let next = match block.next {
            Some(next) => i32::try_from(next).map_err(|_| LinkFsError::OutOfRange {
                addr: next,
                total: self.total_blocks(),
            })?,
            None => EOF_POINTER,
        };
        let record = block.encode(self.payload_capacity, next);
        self.dev.write_block(addr, &record)?;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<()> {
        self.dev.sync_disk()?;
        Ok(())
    }

    pub fn device(&self) -> &T {
        &self.dev
    }

    /// Returns ownership of the underlying device to the caller.
    pub fn into_device(self) -> T {
        self.dev
    }

    fn check_range(&self, addr: BlockAddress) -> Result<()> {
        if addr >= self.total_blocks() {
            return Err(LinkFsError::OutOfRange {
                addr,
                total: self.total_blocks(),
            });
        }
        Ok(())
    }
}
