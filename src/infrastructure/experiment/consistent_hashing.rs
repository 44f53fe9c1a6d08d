//! Consistent hashing for experiment variant assignment
//!
//! The same session key always maps to the same point for a given experiment,
//! independent of process, platform or toolchain version.

use sha2::{Digest, Sha256};

use crate::domain::experiment::Variant;

/// Consistent hasher for experiment assignments
#[derive(Debug, Clone, Copy)]
pub struct ConsistentHasher;

impl ConsistentHasher {
    /// Map a session key and experiment to a uniform point in [0, 1)
    pub fn assignment_point(experiment_id: &str, session_key: &str) -> f64 {
        let digest = Sha256::new()
            .chain_update(experiment_id.as_bytes())
            .chain_update([0u8])
            .chain_update(session_key.as_bytes())
            .finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);

        // 53 high bits give an exactly representable f64 in [0, 1)
        (u64::from_be_bytes(prefix) >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Variant for a session: B with probability `traffic_split`
    pub fn assign(experiment_id: &str, session_key: &str, traffic_split: f64) -> Variant {
        if Self::assignment_point(experiment_id, session_key) < traffic_split {
            Variant::B
        } else {
            Variant::A
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_hash_same_input() {
        let p1 = ConsistentHasher::assignment_point("exp-1", "session-1");
        let p2 = ConsistentHasher::assignment_point("exp-1", "session-1");
        assert_eq!(p1, p2, "Same inputs should produce same point");
    }

    #[test]
    fn test_points_are_in_unit_interval() {
        for i in 0..1000 {
            let p = ConsistentHasher::assignment_point("exp-1", &format!("key-{}", i));
            assert!((0.0..1.0).contains(&p));
        }
    }

    #[test]
    fn test_separator_prevents_boundary_collisions() {
        let p1 = ConsistentHasher::assignment_point("ab", "c");
        let p2 = ConsistentHasher::assignment_point("a", "bc");
        assert_ne!(p1, p2);
    }

    #[test]
    fn test_hash_distribution() {
        let mut buckets = [0u32; 10];

        for i in 0..1000 {
            let p = ConsistentHasher::assignment_point("exp-1", &format!("key-{}", i));
            buckets[(p * 10.0) as usize] += 1;
        }

        for count in buckets {
            assert!(count > 50, "Bucket has too few items: {}", count);
            assert!(count < 150, "Bucket has too many items: {}", count);
        }
    }

    #[test]
    fn test_extreme_splits() {
        for i in 0..200 {
            let key = format!("key-{}", i);
            assert_eq!(ConsistentHasher::assign("exp", &key, 0.0), Variant::A);
            assert_eq!(ConsistentHasher::assign("exp", &key, 1.0), Variant::B);
        }
    }

    #[test]
    fn test_split_ratio() {
        let b_count = (0..2000)
            .filter(|i| {
                ConsistentHasher::assign("ab-test", &format!("key-{}", i), 0.2) == Variant::B
            })
            .count();

        // Expect roughly 400 of 2000
        assert!(
            (300..500).contains(&b_count),
            "Split is too uneven: {} of 2000 assigned to B",
            b_count
        );
    }
}
