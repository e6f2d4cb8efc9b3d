use crate::error::{LinkFsError, Result};
use crate::BlockAddress;
use std::collections::BTreeMap;

/// Directory of the disk: file identifier to chain head.
///
/// Kept ordered so listings come out sorted by name.
#[derive(Debug, Default)]
pub struct FileAllocationTable {
    heads: BTreeMap<String, BlockAddress>,
}

impl FileAllocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new chain head.
    ///
    /// # Errors
    ///
    /// Fails with `DuplicateIdentifier` if `id` is already registered; the old
    /// chain must be deleted first or its blocks would leak.
    pub fn insert(&mut self, id: &str, head: BlockAddress) -> Result<()> {
        if self.heads.contains_key(id) {
            return Err(LinkFsError::DuplicateIdentifier(id.to_string()));
        }
        self.heads.insert(id.to_string(), head);
        Ok(())
    }

    pub fn lookup(&self, id: &str) -> Result<BlockAddress> {
        self.heads
            .get(id)
            .copied()
            .ok_or_else(|| LinkFsError::NotFound(id.to_string()))
    }

    /// Drops the entry for `id`. Callers release the chain's blocks first.
    pub fn remove(&mut self, id: &str) -> Result<BlockAddress> {
        self.heads
            .remove(id)
            .ok_or_else(|| LinkFsError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.heads.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, BlockAddress)> {
        self.heads.iter().map(|(id, &head)| (id.as_str(), head))
    }
}
