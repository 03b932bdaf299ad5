//! Channel model: named, partitioned, retention-bounded event streams.

use std::time::Duration;

/// How long and how much a channel keeps before dropping its oldest records.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Duration,
    /// Budget for the whole channel, summed over all partitions.
    pub max_bytes: u64,
}

impl RetentionPolicy {
    pub fn new(max_age: Duration, max_bytes: u64) -> Self {
        Self { max_age, max_bytes }
    }
}

impl Default for RetentionPolicy {
    /// 24 hours, 512 MiB.
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(24 * 60 * 60),
            max_bytes: 512 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    name: String,
    partitions: u32,
    retention: RetentionPolicy,
}

impl ChannelConfig {
    /// `partitions` is clamped to at least one.
    pub fn new(name: impl Into<String>, partitions: u32, retention: RetentionPolicy) -> Self {
        Self {
            name: name.into(),
            partitions: partitions.max(1),
            retention,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    pub fn partition_for(&self, key: &str) -> u32 {
        partition_for(key, self.partitions)
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable partition for `key`: 64-bit FNV-1a modulo `partitions`.
///
/// Stable across processes and releases, unlike `std`'s `DefaultHasher`.
pub fn partition_for(key: &str, partitions: u32) -> u32 {
    let partitions = partitions.max(1);
    let hash = key.bytes().fold(FNV_OFFSET_BASIS, |acc, b| {
        (acc ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    });
    (hash % u64::from(partitions)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_vectors() {
        // Reference 64-bit FNV-1a values for "" and "a".
        let hash = |s: &str| {
            s.bytes()
                .fold(FNV_OFFSET_BASIS, |acc, b| (acc ^ u64::from(b)).wrapping_mul(FNV_PRIME))
        };
        assert_eq!(hash(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(hash("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn same_key_same_partition() {
        let key = "01930c1e-7d1a-7cc0-8f5e-5d7a1c1b2a3f";
        let first = partition_for(key, 3);
        for _ in 0..10 {
            assert_eq!(partition_for(key, 3), first);
        }
        assert!(first < 3);
    }

    #[test]
    fn zero_partitions_is_treated_as_one() {
        assert_eq!(partition_for("anything", 0), 0);
        assert_eq!(ChannelConfig::new("c", 0, RetentionPolicy::default()).partitions(), 1);
    }

    #[test]
    fn keys_spread_over_partitions() {
        let mut seen = [false; 3];
        for i in 0..64 {
            seen[partition_for(&format!("key-{i}"), 3) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
