use crate::block::HEADER_BLOCK;
use crate::config::AllocationPolicy;
use crate::error::{LinkFsError, Result};
use crate::BlockAddress;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The set of unallocated block addresses.
///
/// Free addresses are packed into a vector and each address remembers its
/// slot, so taking any address out is a swap-remove and putting one back is a
/// push. Random placement draws a slot index instead of probing the whole
/// address range, so it does not slow down as the disk fills.
pub struct FreeBlockPool {
    free: Vec<BlockAddress>,
    /// Slot of each address in `free`, `None` while the block is allocated.
    slots: Vec<Option<usize>>,
    picker: Picker,
}

enum Picker {
    Random(StdRng),
    Sequential,
}

impl FreeBlockPool {
    /// Builds a pool holding every address of a `total_blocks` disk except the
    /// header block.
    pub fn new(total_blocks: usize, policy: AllocationPolicy) -> Self {
        // Stored highest first so the sequential picker pops 1, 2, 3, ...
        let free: Vec<BlockAddress> = (HEADER_BLOCK + 1..total_blocks).rev().collect();
        let mut slots = vec![None; total_blocks];
        for (slot, &addr) in free.iter().enumerate() {
            slots[addr] = Some(slot);
        }

        let picker = match policy {
            AllocationPolicy::Random { seed: Some(seed) } => {
                Picker::Random(StdRng::seed_from_u64(seed))
            }
            AllocationPolicy::Random { seed: None } => Picker::Random(StdRng::from_entropy()),
            AllocationPolicy::Sequential => Picker::Sequential,
        };

        Self { free, slots, picker }
    }

    /// Takes one free block out of the pool.
    ///
    /// # Errors
    ///
    /// Fails fast with `DiskFull` when no block is left.
    pub fn acquire(&mut self) -> Result<BlockAddress> {
        if self.free.is_empty() {
            return Err(LinkFsError::DiskFull);
        }
        let slot = match &mut self.picker {
            Picker::Random(rng) => rng.gen_range(0..self.free.len()),
            Picker::Sequential => self.free.len() - 1,
        };
        let addr = self.take_slot(slot);
        debug!("acquired block {} ({} left)", addr, self.free.len());
        Ok(addr)
    }

    /// Returns an allocated block to the pool.
    ///
    /// # Errors
    ///
    /// Releasing a block that is already free is a bookkeeping bug upstream
    /// and fails with `AlreadyFree`. The header block and addresses past the
    /// end of the disk fail with `OutOfRange`.
    pub fn release(&mut self, addr: BlockAddress) -> Result<()> {
        if addr == HEADER_BLOCK || addr >= self.slots.len() {
            return Err(LinkFsError::OutOfRange {
                addr,
                total: self.slots.len(),
            });
        }
        if self.slots[addr].is_some() {
            return Err(LinkFsError::AlreadyFree(addr));
        }
        self.slots[addr] = Some(self.free.len());
        self.free.push(addr);
        debug!("released block {} ({} free)", addr, self.free.len());
        Ok(())
    }

    /// Number of blocks still available.
    pub fn remaining(&self) -> usize {
        self.free.len()
    }

    pub fn is_free(&self, addr: BlockAddress) -> bool {
        self.slots.get(addr).map_or(false, Option::is_some)
    }

    fn take_slot(&mut self, slot: usize) -> BlockAddress {
        let addr = self.free.swap_remove(slot);
        self.slots[addr] = None;
        // The former last element now sits in the vacated slot.
        if let Some(&moved) = self.free.get(slot) {
            self.slots[moved] = Some(slot);
        }
        addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fresh_pool_excludes_header_block() {
        let mut pool = FreeBlockPool::new(10, AllocationPolicy::Random { seed: Some(7) });
        assert_eq!(pool.remaining(), 9);
        assert!(!pool.is_free(HEADER_BLOCK));

        let mut seen = HashSet::new();
        while let Ok(addr) = pool.acquire() {
            assert_ne!(addr, HEADER_BLOCK);
            assert!(seen.insert(addr), "block {} handed out twice", addr);
        }
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn sequential_policy_counts_up_and_reuses_latest_release() {
        let mut pool = FreeBlockPool::new(6, AllocationPolicy::Sequential);
        assert_eq!(pool.acquire().unwrap(), 1);
        assert_eq!(pool.acquire().unwrap(), 2);
        assert_eq!(pool.acquire().unwrap(), 3);

        pool.release(2).unwrap();
        assert_eq!(pool.acquire().unwrap(), 2);
        assert_eq!(pool.acquire().unwrap(), 4);
    }

    #[test]
    fn empty_pool_reports_disk_full() {
        let mut pool = FreeBlockPool::new(2, AllocationPolicy::Sequential);
        assert_eq!(pool.acquire().unwrap(), 1);
        match pool.acquire() {
            Err(LinkFsError::DiskFull) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn double_free_is_surfaced() {
        let mut pool = FreeBlockPool::new(5, AllocationPolicy::Sequential);
        let addr = pool.acquire().unwrap();
        pool.release(addr).unwrap();
        match pool.release(addr) {
            Err(LinkFsError::AlreadyFree(a)) => assert_eq!(a, addr),
            other => panic!("unexpected result {:?}", other),
        }
        // Never-allocated blocks are free too.
        assert!(pool.release(4).is_err());
        assert_eq!(pool.remaining(), 4);
    }

    #[test]
    fn header_and_out_of_range_addresses_cannot_be_released() {
        let mut pool = FreeBlockPool::new(5, AllocationPolicy::Sequential);
        assert!(matches!(
            pool.release(HEADER_BLOCK),
            Err(LinkFsError::OutOfRange { .. })
        ));
        assert!(matches!(
            pool.release(5),
            Err(LinkFsError::OutOfRange { .. })
        ));
    }

    #[test]
    fn slots_stay_consistent_through_random_churn() {
        let mut pool = FreeBlockPool::new(64, AllocationPolicy::Random { seed: Some(42) });
        let mut held = Vec::new();
        for round in 0..200 {
            if round % 3 == 2 {
                if let Some(addr) = held.pop() {
                    pool.release(addr).unwrap();
                }
            } else if let Ok(addr) = pool.acquire() {
                held.push(addr);
            }
            assert_eq!(pool.remaining() + held.len(), 63);
            for &addr in &held {
                assert!(!pool.is_free(addr));
            }
        }
        for (slot, &addr) in pool.free.iter().enumerate() {
            assert_eq!(pool.slots[addr], Some(slot));
        }
    }

    #[test]
    fn same_seed_gives_same_placement() {
        let policy = AllocationPolicy::Random { seed: Some(99) };
        let mut a = FreeBlockPool::new(100, policy);
        let mut b = FreeBlockPool::new(100, policy);
        for _ in 0..20 {
            assert_eq!(a.acquire().unwrap(), b.acquire().unwrap());
        }
    }
}
