//! Virtual-node ring.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::hasher::KeyHasher;

/// Sorted virtual-node positions on a `u64` ring.
///
/// Each member with normalized weight `w` owns `replication_factor * w`
/// positions, at `hash(identity ++ index)` for every index in that range.
/// If two positions collide exactly, the later insertion owns the slot.
#[derive(Debug, Clone)]
pub(crate) struct VirtualRing {
    /// Ring position -> member identity.
    vnodes: BTreeMap<u64, String>,
    /// Vnodes per unit of weight.
    replication_factor: u64,
}

impl VirtualRing {
    pub(crate) fn new(replication_factor: u64) -> Self {
        Self {
            vnodes: BTreeMap::new(),
            replication_factor,
        }
    }

    /// Number of vnodes a member of the given (normalized) weight owns.
    pub(crate) fn replicas(&self, weight: u64) -> u64 {
        self.replication_factor.saturating_mul(weight)
    }

    /// Place all vnodes for `identity`.
    pub(crate) fn insert(&mut self, hasher: &dyn KeyHasher, identity: &str, weight: u64) {
        let replicas = self.replicas(weight);
        for i in 0..replicas {
            let pos = hasher.hash(&vnode_key(identity, i));
            if let Some(previous) = self.vnodes.insert(pos, identity.to_string())
                && previous != identity
            {
                warn!(pos, %previous, identity, "vnode collision, slot reassigned");
            }
        }
        debug!(identity, weight, replicas, "added vnodes to ring");
    }

    /// Drop the vnodes `insert` placed for `identity` with the same weight.
    ///
    /// Positions are recomputed, so a slot taken over by a colliding member
    /// is removed as well.
    pub(crate) fn remove(&mut self, hasher: &dyn KeyHasher, identity: &str, weight: u64) {
        let replicas = self.replicas(weight);
        for i in 0..replicas {
            let pos = hasher.hash(&vnode_key(identity, i));
            self.vnodes.remove(&pos);
        }
        debug!(identity, weight, replicas, "removed vnodes from ring");
    }

    /// Walk the ring clockwise starting at the first vnode at or after `pos`,
    /// wrapping around once.
    pub(crate) fn walk_from(&self, pos: u64) -> impl Iterator<Item = (u64, &str)> {
        let after = self.vnodes.range(pos..);
        let before = self.vnodes.range(..pos);
        after.chain(before).map(|(p, id)| (*p, id.as_str()))
    }

    pub(crate) fn len(&self) -> usize {
        self.vnodes.len()
    }

    /// Vnodes currently owned by `identity`.
    pub(crate) fn owned_by(&self, identity: &str) -> usize {
        self.vnodes.values().filter(|id| *id == identity).count()
    }
}

/// Hash input for a vnode: identity bytes followed by the index as
/// little-endian `u64`.
pub(crate) fn vnode_key(identity: &str, index: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(identity.len() + 8);
    key.extend_from_slice(identity.as_bytes());
    key.extend_from_slice(&index.to_le_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Blake3Hasher;

    #[test]
    fn test_vnode_count_scales_with_weight() {
        let mut ring = VirtualRing::new(10);
        ring.insert(&Blake3Hasher, "a", 2);
        ring.insert(&Blake3Hasher, "b", 1);

        assert_eq!(ring.len(), 30);
        assert_eq!(ring.owned_by("a"), 20);
        assert_eq!(ring.owned_by("b"), 10);
    }

    #[test]
    fn test_remove_drops_exactly_its_vnodes() {
        let mut ring = VirtualRing::new(16);
        ring.insert(&Blake3Hasher, "a", 1);
        ring.insert(&Blake3Hasher, "b", 3);

        ring.remove(&Blake3Hasher, "b", 3);
        assert_eq!(ring.len(), 16);
        assert_eq!(ring.owned_by("a"), 16);
        assert_eq!(ring.owned_by("b"), 0);

        ring.remove(&Blake3Hasher, "a", 1);
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_walk_wraps_once_in_ascending_order() {
        let mut ring = VirtualRing::new(8);
        ring.insert(&Blake3Hasher, "a", 1);
        ring.insert(&Blake3Hasher, "b", 1);

        let start = u64::MAX / 2;
        let walked: Vec<u64> = ring.walk_from(start).map(|(p, _)| p).collect();
        assert_eq!(walked.len(), ring.len());

        // Positions >= start come first, in ascending order, then the wrap.
        let split = walked.iter().position(|p| *p < start).unwrap_or(walked.len());
        assert!(walked[..split].windows(2).all(|w| w[0] < w[1]));
        assert!(walked[split..].windows(2).all(|w| w[0] < w[1]));
        assert!(walked[..split].iter().all(|p| *p >= start));
    }

    #[test]
    fn test_collision_last_write_wins() {
        // Every key lands on the same position.
        let constant = |_: &[u8]| 42u64;
        let mut ring = VirtualRing::new(1);
        ring.insert(&constant, "a", 1);
        ring.insert(&constant, "b", 1);

        assert_eq!(ring.len(), 1);
        assert_eq!(ring.owned_by("b"), 1);
        assert_eq!(ring.owned_by("a"), 0);

        // Removing "a" recomputes its position and clears the shared slot.
        ring.remove(&constant, "a", 1);
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_vnode_key_layout() {
        let key = vnode_key("ab", 1);
        assert_eq!(key, vec![b'a', b'b', 1, 0, 0, 0, 0, 0, 0, 0]);
    }
}
