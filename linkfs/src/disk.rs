use crate::block::{BlockStore, HEADER_BLOCK};
use crate::chain::{ChainReader, ChainWriter};
use crate::config::DiskConfig;
use crate::error::{LinkFsError, Result};
use crate::fat::FileAllocationTable;
use crate::pool::FreeBlockPool;
use crate::BlockAddress;
use fileblock::BlockStorage;
use std::collections::HashSet;

/// Capacity figures reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub payload_capacity: usize,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub head: BlockAddress,
    pub blocks: usize,
    pub bytes: usize,
}

/// Result of checking block accounting across the whole disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditReport {
    pub total_blocks: usize,
    pub free_blocks: usize,
    pub used_blocks: usize,
    /// Blocks that are neither free nor reachable from any chain.
    pub leaked_blocks: usize,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.leaked_blocks == 0
    }
}

/// A simulated disk using linked allocation.
///
/// Owns the block store, the free pool and the file table together; every
/// operation takes the disk by reference so the three never drift apart.
///
/// # Layout
/// ==========================================================
/// | Header (block 0) | Data blocks 1 .. N-1, linked chains |
/// ==========================================================
pub struct LinkedDisk<T: BlockStorage> {
    config: DiskConfig,
    store: BlockStore<T>,
    pool: FreeBlockPool,
    table: FileAllocationTable,
}

impl<T: BlockStorage> LinkedDisk<T> {
    /// Formats `dev` with the geometry in `config` and returns an empty disk.
    pub fn format(dev: T, config: DiskConfig) -> Result<Self> {
        if dev.block_count() != config.total_blocks {
            return Err(LinkFsError::InvalidConfig(format!(
                "device has {} blocks, configuration expects {}",
                dev.block_count(),
                config.total_blocks
            )));
        }
        let store = BlockStore::format(dev, config.payload_capacity)?;
        let pool = FreeBlockPool::new(config.total_blocks, config.policy);
        info!(
            "formatted disk: {} blocks, {} payload bytes each",
            config.total_blocks, config.payload_capacity
        );
        Ok(Self {
            config,
            store,
            pool,
            table: FileAllocationTable::new(),
        })
    }

    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// Stores `content` as a new file and returns the head of its chain.
    pub fn write_file(&mut self, id: &str, content: &[u8]) -> Result<BlockAddress> {
        ChainWriter::new(&mut self.store, &mut self.pool, &mut self.table).write(id, content)
    }

    pub fn read_file(&mut self, id: &str) -> Result<Vec<u8>> {
        ChainReader::new(&mut self.store).read(&self.table, id)
    }

    /// Releases every block of the file and forgets it.
    ///
    /// The chain is walked and checked before anything is released, so a
    /// delete that fails leaves the disk as it was.
    pub fn delete_file(&mut self, id: &str) -> Result<()> {
        let head = self.table.lookup(id)?;
        let chain = ChainReader::new(&mut self.store).addresses(head)?;
        if let Some(&addr) = chain.iter().find(|&&addr| self.pool.is_free(addr)) {
            return Err(LinkFsError::CorruptChain {
                head,
                addr,
                reason: "is already in the free pool".to_string(),
            });
        }

        for &addr in &chain {
            self.pool.release(addr)?;
        }
        self.table.remove(id)?;
        info!("deleted \"{}\", freed {} blocks", id, chain.len());
        Ok(())
    }

    pub fn disk_usage(&self) -> DiskUsage {
        DiskUsage {
            total_blocks: self.store.total_blocks(),
            free_blocks: self.pool.remaining(),
            payload_capacity: self.store.payload_capacity(),
        }
    }

    /// Every file on disk, sorted by identifier.
    pub fn list_files(&mut self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::with_capacity(self.table.len());
        for (id, head) in self.table.iter() {
            let (mut blocks, mut bytes) = (0, 0);
            ChainReader::new(&mut self.store).walk(head, |_, block| {
                blocks += 1;
                bytes += block.payload.len();
            })?;
            entries.push(FileEntry {
                id: id.to_string(),
                head,
                blocks,
                bytes,
            });
        }
        Ok(entries)
    }

    /// Block addresses of a file in chain order.
    pub fn chain_of(&mut self, id: &str) -> Result<Vec<BlockAddress>> {
        let head = self.table.lookup(id)?;
        ChainReader::new(&mut self.store).addresses(head)
    }

    /// Walks every chain and checks that no block is both free and in use, or
    /// shared by two chains.
    pub fn audit(&mut self) -> Result<AuditReport> {
        let mut used = HashSet::new();
        for (_, head) in self.table.iter() {
            for addr in ChainReader::new(&mut self.store).addresses(head)? {
                if self.pool.is_free(addr) {
                    return Err(LinkFsError::CorruptChain {
                        head,
                        addr,
                        reason: "is also in the free pool".to_string(),
                    });
                }
                if !used.insert(addr) {
                    return Err(LinkFsError::CorruptChain {
                        head,
                        addr,
                        reason: "is shared with another chain".to_string(),
                    });
                }
            }
        }

        let total_blocks = self.store.total_blocks();
        let free_blocks = self.pool.remaining();
        let reserved = HEADER_BLOCK + 1;
        let report = AuditReport {
            total_blocks,
            free_blocks,
            used_blocks: used.len(),
            leaked_blocks: total_blocks - reserved - free_blocks - used.len(),
        };
        if !report.is_consistent() {
            warn!("{} blocks are unaccounted for", report.leaked_blocks);
        }
        Ok(report)
    }

    /// Flushes the backing device.
    pub fn sync(&mut self) -> Result<()> {
        self.store.sync()
    }

    /// Returns ownership of the underlying device to the caller.
    pub fn into_device(self) -> T {
        self.store.into_device()
    }
}
