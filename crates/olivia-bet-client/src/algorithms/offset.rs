//! # Computation Offsets
//!
//! Random 64-bit correlation ids, one per submission attempt.

use rand::RngCore;

use crate::domain::ComputationOffset;

/// Source of computation offsets.
pub trait OffsetGenerator: Send + Sync {
    /// Next offset.
    fn next_offset(&self) -> ComputationOffset;
}

/// Offsets from eight uniformly random bytes, read little-endian.
///
/// Collisions are not checked; at 2^64 the odds are negligible.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOffsetGenerator;

impl OffsetGenerator for RandomOffsetGenerator {
    fn next_offset(&self) -> ComputationOffset {
        generate_computation_offset()
    }
}

/// Draw a fresh random offset.
pub fn generate_computation_offset() -> ComputationOffset {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    ComputationOffset::new(u64::from_le_bytes(bytes))
}
