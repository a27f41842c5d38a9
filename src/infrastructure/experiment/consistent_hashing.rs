//! Consistent hashing for experiment variant assignment
//!
//! Ensures the same entity always gets assigned to the same variant for a given
//! experiment and traffic split, in any process.

use sha2::{Digest, Sha256};

use crate::domain::experiment::{Assignment, TrafficSplit};

/// 2^64, so that a `u64` maps strictly into [0, 1)
const U64_RANGE: f64 = 18_446_744_073_709_551_616.0;

/// Consistent hasher for experiment assignments
#[derive(Debug, Clone, Copy)]
pub struct ConsistentHasher;

impl ConsistentHasher {
    /// Map a test and entity to a point uniform in [0, 1)
    ///
    /// SHA-256 over the concatenation of both ids; the first eight digest bytes
    /// are read big-endian and scaled by 2^64.
    pub fn unit_point(test_id: &str, entity_id: &str) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(test_id.as_bytes());
        hasher.update(entity_id.as_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);

        let point = u64::from_be_bytes(prefix) as f64 / U64_RANGE;
        // u64 values within 2^11 of the top round up to 2^64 as f64
        point.min(1.0 - f64::EPSILON)
    }

    /// Assign an entity to a variant of the given split
    ///
    /// Pure: the result depends only on the arguments.
    pub fn assign(test_id: &str, entity_id: &str, split: &TrafficSplit) -> Option<Assignment> {
        let point = Self::unit_point(test_id, entity_id);

        split
            .variant_for_point(point)
            .map(|variant_id| Assignment::new(test_id, entity_id, variant_id, point))
    }
}
