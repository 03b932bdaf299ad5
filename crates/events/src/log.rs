//! Append-only, partitioned, retention-bounded record log for one channel.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::channel::ChannelConfig;

/// A record stored in a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord<M> {
    pub partition: u32,
    /// Position within the partition. Never reused, even after eviction.
    pub offset: u64,
    pub appended_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub message: M,
}

/// The records of one channel, split into partitions.
///
/// Retention is enforced on every append:
/// 1. records older than `max_age` are dropped from every partition;
/// 2. while the channel exceeds `max_bytes`, the oldest record across all
///    partitions is dropped. The record just appended is always kept.
#[derive(Debug)]
pub struct PartitionedLog<M> {
    config: ChannelConfig,
    partitions: Vec<VecDeque<LogRecord<M>>>,
    next_offsets: Vec<u64>,
    total_bytes: u64,
}

impl<M> PartitionedLog<M> {
    pub fn new(config: ChannelConfig) -> Self {
        let n = config.partitions() as usize;
        Self {
            config,
            partitions: (0..n).map(|_| VecDeque::new()).collect(),
            next_offsets: vec![0; n],
            total_bytes: 0,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Append `message` under `key`; returns `(partition, offset)`.
    pub fn append_at(
        &mut self,
        key: &str,
        message: M,
        size_bytes: u64,
        now: DateTime<Utc>,
    ) -> (u32, u64) {
        let partition = self.config.partition_for(key);
        let idx = partition as usize;
        let offset = self.next_offsets[idx];
        self.next_offsets[idx] += 1;

        self.partitions[idx].push_back(LogRecord {
            partition,
            offset,
            appended_at: now,
            size_bytes,
            message,
        });
        self.total_bytes += size_bytes;

        self.enforce_retention(now, Some((partition, offset)));
        (partition, offset)
    }

    /// Drop everything outside the retention window as of `now`.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        self.enforce_retention(now, None);
    }

    fn enforce_retention(&mut self, now: DateTime<Utc>, keep: Option<(u32, u64)>) {
        let retention = self.config.retention();

        if let Ok(max_age) = chrono::Duration::from_std(retention.max_age) {
            let cutoff = now - max_age;
            for partition in &mut self.partitions {
                while partition.front().is_some_and(|r| r.appended_at < cutoff) {
                    if let Some(r) = partition.pop_front() {
                        self.total_bytes -= r.size_bytes;
                    }
                }
            }
        }

        while self.total_bytes > retention.max_bytes {
            let oldest = self
                .partitions
                .iter()
                .enumerate()
                .filter_map(|(i, p)| p.front().map(|r| (i, r)))
                .filter(|(_, r)| keep != Some((r.partition, r.offset)))
                .min_by_key(|(_, r)| r.appended_at)
                .map(|(i, _)| i);

            let Some(idx) = oldest else { break };
            if let Some(r) = self.partitions[idx].pop_front() {
                self.total_bytes -= r.size_bytes;
            }
        }
    }

    /// Records of `partition` with `offset >= from_offset`, oldest first.
    pub fn read(&self, partition: u32, from_offset: u64) -> Vec<&LogRecord<M>> {
        self.partitions
            .get(partition as usize)
            .map(|p| p.iter().filter(|r| r.offset >= from_offset).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn partition_len(&self, partition: u32) -> usize {
        self.partitions.get(partition as usize).map_or(0, VecDeque::len)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}
