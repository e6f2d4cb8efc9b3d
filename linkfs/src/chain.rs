use crate::block::{Block, BlockStore, HEADER_BLOCK};
use crate::error::{LinkFsError, Result};
use crate::fat::FileAllocationTable;
use crate::pool::FreeBlockPool;
use crate::BlockAddress;
use fileblock::BlockStorage;
use std::collections::HashSet;

/// Splits content into block-sized payloads and lays them out as a linked
/// chain of freshly acquired blocks.
pub struct ChainWriter<'a, T: BlockStorage> {
    store: &'a mut BlockStore<T>,
    pool: &'a mut FreeBlockPool,
    table: &'a mut FileAllocationTable,
}

impl<'a, T: BlockStorage> ChainWriter<'a, T> {
    pub fn new(
        store: &'a mut BlockStore<T>,
        pool: &'a mut FreeBlockPool,
        table: &'a mut FileAllocationTable,
    ) -> Self {
        Self { store, pool, table }
    }

    /// Writes `content` as a new chain registered under `id` and returns its
    /// head.
    ///
    /// Empty content still occupies one block holding no payload. Nothing is
    /// consumed from the pool unless the whole write succeeds.
    pub fn write(&mut self, id: &str, content: &[u8]) -> Result<BlockAddress> {
        if self.table.contains(id) {
            return Err(LinkFsError::DuplicateIdentifier(id.to_string()));
        }

        let chunks: Vec<&[u8]> = if content.is_empty() {
            vec![content]
        } else {
            content.chunks(self.store.payload_capacity()).collect()
        };
        let needed = chunks.len();
        let available = self.pool.remaining();
        if needed > available {
            warn!(
                "rejecting \"{}\": {} blocks needed, {} free",
                id, needed, available
            );
            return Err(LinkFsError::InsufficientSpace { needed, available });
        }

        let blocks = self.acquire(needed)?;
        if let Err(e) = self.link(&chunks, &blocks) {
            self.rollback(&blocks);
            return Err(e);
        }
        if let Err(e) = self.table.insert(id, blocks[0]) {
            self.rollback(&blocks);
            return Err(e);
        }

        info!(
            "wrote \"{}\" ({} bytes) across {} blocks starting at {}",
            id,
            content.len(),
            needed,
            blocks[0]
        );
        Ok(blocks[0])
    }

    fn acquire(&mut self, needed: usize) -> Result<Vec<BlockAddress>> {
        let mut acquired = Vec::with_capacity(needed);
        while acquired.len() < needed {
            match self.pool.acquire() {
                Ok(addr) => acquired.push(addr),
                Err(LinkFsError::DiskFull) => {
                    let available = acquired.len();
                    self.rollback(&acquired);
                    return Err(LinkFsError::InsufficientSpace { needed, available });
                }
                Err(e) => {
                    self.rollback(&acquired);
                    return Err(e);
                }
            }
        }
        Ok(acquired)
    }

    fn link(&mut self, chunks: &[&[u8]], blocks: &[BlockAddress]) -> Result<()> {
        for (i, (chunk, &addr)) in chunks.iter().zip(blocks).enumerate() {
            let next = blocks.get(i + 1).copied();
            self.store.write(addr, &Block::new(chunk.to_vec(), next))?;
        }
        Ok(())
    }

    /// Hands back blocks taken by a write that did not complete.
    fn rollback(&mut self, acquired: &[BlockAddress]) {
        warn!("rolling back {} acquired blocks", acquired.len());
        // Reverse order restores the pool to its pre-write layout.
        for &addr in acquired.iter().rev() {
            if let Err(e) = self.pool.release(addr) {
                error!("rollback could not release block {}: {}", addr, e);
            }
        }
    }
}

/// Follows chains block by block.
///
/// Every traversal tracks the addresses it has seen, so a looping or
/// tampered chain ends in `CorruptChain` instead of spinning forever.
pub struct ChainReader<'a, T: BlockStorage> {
    store: &'a mut BlockStore<T>,
}

impl<'a, T: BlockStorage> ChainReader<'a, T> {
    pub fn new(store: &'a mut BlockStore<T>) -> Self {
        Self { store }
    }

    /// Reads the file registered under `id`.
    pub fn read(&mut self, table: &FileAllocationTable, id: &str) -> Result<Vec<u8>> {
        let head = table.lookup(id)?;
        self.read_chain(head)
    }

    /// Concatenates the payloads of the chain starting at `head`.
    pub fn read_chain(&mut self, head: BlockAddress) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        self.walk(head, |_, block| content.extend_from_slice(&block.payload))?;
        Ok(content)
    }

    /// Addresses of the chain starting at `head`, in chain order.
    pub fn addresses(&mut self, head: BlockAddress) -> Result<Vec<BlockAddress>> {
        let mut chain = Vec::new();
        self.walk(head, |addr, _| chain.push(addr))?;
        Ok(chain)
    }

    /// Calls `visit` with each block of the chain in order until the end of
    /// the chain is reached.
    pub fn walk<F>(&mut self, head: BlockAddress, mut visit: F) -> Result<()>
    where
        F: FnMut(BlockAddress, Block),
    {
        let total = self.store.total_blocks();
        let mut visited = HashSet::new();
        let mut next = Some(head);

        while let Some(addr) = next {
            if addr == HEADER_BLOCK || addr >= total {
                return Err(corrupt(head, addr, "lies outside the data region"));
            }
            if !visited.insert(addr) {
                return Err(corrupt(head, addr, "appears twice in the chain"));
            }
            let block = self.store.read(addr).map_err(|e| match e {
                LinkFsError::CorruptChain { addr, reason, .. } => {
                    LinkFsError::CorruptChain { head, addr, reason }
                }
                other => other,
            })?;
            next = block.next;
            visit(addr, block);
        }
        Ok(())
    }
}

fn corrupt(head: BlockAddress, addr: BlockAddress, reason: &str) -> LinkFsError {
    LinkFsError::CorruptChain {
        head,
        addr,
        reason: reason.to_string(),
    }
}
