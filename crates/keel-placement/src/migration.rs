//! Partition table snapshots and the migrations between them.

use std::collections::HashMap;

/// A partition that changes owner between two ring states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// The partition that must move.
    pub partition: u64,
    /// Owner before the change, `None` if the ring was empty.
    pub from: Option<String>,
    /// Owner after the change, `None` if the ring is now empty.
    pub to: Option<String>,
}

/// Point-in-time copy of a ring's partition table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartitionMap {
    partition_count: u64,
    owners: Vec<String>,
}

impl PartitionMap {
    pub(crate) fn new(partition_count: u64, owners: Vec<String>) -> Self {
        Self {
            partition_count,
            owners,
        }
    }

    /// Number of partitions the ring was configured with.
    pub fn partition_count(&self) -> u64 {
        self.partition_count
    }

    /// Owner identity of `partition`, or `None` if the ring was empty.
    pub fn owner(&self, partition: u64) -> Option<&str> {
        usize::try_from(partition)
            .ok()
            .and_then(|idx| self.owners.get(idx))
            .map(String::as_str)
    }

    /// Whether the snapshot was taken from an empty ring.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Partitions held per identity.
    pub fn loads(&self) -> HashMap<&str, u64> {
        let mut loads = HashMap::new();
        for owner in &self.owners {
            *loads.entry(owner.as_str()).or_insert(0) += 1;
        }
        loads
    }

    /// List every partition whose owner differs between `old` and `new`.
    pub fn diff(old: &PartitionMap, new: &PartitionMap) -> Vec<Migration> {
        let count = old.partition_count.max(new.partition_count);
        (0..count)
            .filter_map(|partition| {
                let from = old.owner(partition);
                let to = new.owner(partition);
                (from != to).then(|| Migration {
                    partition,
                    from: from.map(str::to_string),
                    to: to.map(str::to_string),
                })
            })
            .collect()
    }

    /// Fraction of partitions that change owner between `old` and `new`.
    pub fn moved_fraction(old: &PartitionMap, new: &PartitionMap) -> f64 {
        let count = old.partition_count.max(new.partition_count);
        if count == 0 {
            return 0.0;
        }
        Self::diff(old, new).len() as f64 / count as f64
    }
}
