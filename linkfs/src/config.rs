use crate::block::RECORD_TRAILER_BYTES;
use crate::error::{LinkFsError, Result};

/// Number of blocks on a disk formatted with default settings.
pub const DEFAULT_TOTAL_BLOCKS: usize = 1000;
/// Payload bytes per block on a disk formatted with default settings. Each
/// 64 character line of the classic simulator kept 3 characters for the pointer.
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 61;

/// How the free pool picks the next block to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Uniform choice among the free blocks. A seed makes runs reproducible.
    Random { seed: Option<u64> },
    /// Deterministic: a fresh disk hands out 1, 2, 3, ... and released blocks
    /// are reused most recent first.
    Sequential,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy::Random { seed: None }
    }
}

/// Geometry and placement policy of a simulated disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskConfig {
    pub total_blocks: usize,
    pub payload_capacity: usize,
    pub policy: AllocationPolicy,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            total_blocks: DEFAULT_TOTAL_BLOCKS,
            payload_capacity: DEFAULT_PAYLOAD_CAPACITY,
            policy: AllocationPolicy::default(),
        }
    }
}

impl DiskConfig {
    pub fn builder() -> DiskConfigBuilder {
        DiskConfigBuilder {
            config: DiskConfig::default(),
        }
    }

    /// Width of one on-disk record: payload plus length and pointer fields.
    pub fn record_bytes(&self) -> usize {
        self.payload_capacity + RECORD_TRAILER_BYTES
    }
}

pub struct DiskConfigBuilder {
    config: DiskConfig,
}

impl DiskConfigBuilder {
    /// Sets the number of blocks, including the reserved header block.
    pub fn with_total_blocks(mut self, blocks: usize) -> Self {
        self.config.total_blocks = blocks;
        self
    }

    pub fn with_payload_capacity(mut self, bytes: usize) -> Self {
        self.config.payload_capacity = bytes;
        self
    }

    pub fn with_policy(mut self, policy: AllocationPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn build(self) -> Result<DiskConfig> {
        let config = self.config;
        if config.total_blocks < 2 {
            return Err(LinkFsError::InvalidConfig(format!(
                "a disk needs at least 2 blocks, got {}",
                config.total_blocks
            )));
        }
        // Pointers are stored as signed 32-bit values with -1 marking the end.
        if config.total_blocks > i32::MAX as usize {
            return Err(LinkFsError::InvalidConfig(format!(
                "{} blocks cannot be addressed by the pointer field",
                config.total_blocks
            )));
        }
        if config.payload_capacity == 0 || config.payload_capacity > u32::MAX as usize {
            return Err(LinkFsError::InvalidConfig(format!(
                "payload capacity must be between 1 and {} bytes",
                u32::MAX
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_simulator() {
        let config = DiskConfig::builder().build().unwrap();
        assert_eq!(config.total_blocks, 1000);
        assert_eq!(config.payload_capacity, 61);
        assert_eq!(config.policy, AllocationPolicy::Random { seed: None });
        assert_eq!(config.record_bytes(), 61 + RECORD_TRAILER_BYTES);
    }

    #[test]
    fn rejects_disk_without_data_blocks() {
        let result = DiskConfig::builder().with_total_blocks(1).build();
        match result {
            Err(LinkFsError::InvalidConfig(_)) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn rejects_zero_payload() {
        assert!(DiskConfig::builder()
            .with_payload_capacity(0)
            .build()
            .is_err());
    }
}
