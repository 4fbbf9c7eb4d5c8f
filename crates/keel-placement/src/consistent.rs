//! Weighted consistent hashing ring with bounded loads.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::assign::{AssignInput, Assignment, assign_partitions, average_load};
use crate::config::PlacementConfig;
use crate::error::PlacementError;
use crate::hasher::KeyHasher;
use crate::member::{Member, normalize_weight};
use crate::migration::PartitionMap;
use crate::replica::closest_members;
use crate::ring::VirtualRing;

/// Everything a lookup reads, swapped as one unit on every membership change.
#[derive(Clone)]
struct RingState<M> {
    /// Registered members, keyed by identity.
    members: HashMap<String, M>,
    /// Normalized weight per identity.
    weights: HashMap<String, u64>,
    /// Sum of `weights`.
    total_weight: u64,
    /// Vnode positions.
    ring: VirtualRing,
    /// Partition and load tables.
    assignment: Assignment,
}

impl<M: Member + Clone> RingState<M> {
    fn new(replication_factor: u64) -> Self {
        Self {
            members: HashMap::new(),
            weights: HashMap::new(),
            total_weight: 0,
            ring: VirtualRing::new(replication_factor),
            assignment: Assignment::default(),
        }
    }

    /// Register `member` and place its vnodes. Returns `false` if the
    /// identity is already present.
    fn insert(&mut self, hasher: &dyn KeyHasher, member: M) -> bool {
        let identity = member.identity().to_string();
        if self.members.contains_key(&identity) {
            return false;
        }
        let weight = normalize_weight(member.weight());
        self.ring.insert(hasher, &identity, weight);
        self.weights.insert(identity.clone(), weight);
        self.total_weight += weight;
        self.members.insert(identity, member);
        true
    }

    /// Unregister `identity` and drop its vnodes. Returns `false` if the
    /// identity is unknown.
    fn remove(&mut self, hasher: &dyn KeyHasher, identity: &str) -> bool {
        let Some(weight) = self.weights.remove(identity) else {
            return false;
        };
        self.ring.remove(hasher, identity, weight);
        self.members.remove(identity);
        self.total_weight -= weight;
        true
    }

    /// Recompute the partition and load tables from scratch.
    fn redistribute(
        &mut self,
        config: &PlacementConfig,
        hasher: &dyn KeyHasher,
    ) -> Result<(), PlacementError> {
        if self.members.is_empty() {
            self.total_weight = 0;
            self.assignment = Assignment::default();
            return Ok(());
        }
        self.assignment = assign_partitions(&AssignInput {
            ring: &self.ring,
            weights: &self.weights,
            total_weight: self.total_weight,
            partition_count: config.partition_count,
            load: config.load,
            hasher,
        })?;
        Ok(())
    }
}

/// Builder for a [`WeightedRing`].
///
/// The hash provider is mandatory; everything else has a default.
pub struct RingBuilder<M> {
    config: PlacementConfig,
    hasher: Option<Arc<dyn KeyHasher>>,
    members: Vec<M>,
}

impl<M: Member + Clone> RingBuilder<M> {
    fn new(config: PlacementConfig) -> Self {
        Self {
            config,
            hasher: None,
            members: Vec::new(),
        }
    }

    /// Set the hash provider.
    pub fn hasher(mut self, hasher: impl KeyHasher + 'static) -> Self {
        self.hasher = Some(Arc::new(hasher));
        self
    }

    /// Set a hash provider shared with other components.
    pub fn shared_hasher(mut self, hasher: Arc<dyn KeyHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Add one initial member.
    pub fn member(mut self, member: M) -> Self {
        self.members.push(member);
        self
    }

    /// Add initial members.
    pub fn members(mut self, members: impl IntoIterator<Item = M>) -> Self {
        self.members.extend(members);
        self
    }

    /// Build the ring and, if any member was given, its partition table.
    ///
    /// Later duplicates of an identity are ignored, as with
    /// [`WeightedRing::add`].
    pub fn build(self) -> Result<WeightedRing<M>, PlacementError> {
        let hasher = self.hasher.ok_or(PlacementError::MissingHasher)?;
        let config = self.config.normalized();
        config.validate()?;

        let mut state = RingState::new(config.replication_factor);
        for member in self.members {
            state.insert(hasher.as_ref(), member);
        }
        state.redistribute(&config, hasher.as_ref())?;

        info!(
            members = state.members.len(),
            total_weight = state.total_weight,
            partitions = config.partition_count,
            replication_factor = config.replication_factor,
            load = config.load,
            "built weighted ring"
        );

        Ok(WeightedRing {
            config,
            hasher,
            state: RwLock::new(state),
        })
    }
}

/// Weighted consistent hashing ring with bounded loads.
///
/// Keys hash to one of `partition_count` partitions; partitions are owned by
/// members. Each member holds at most `ceil(avg_load * weight)` partitions,
/// where `avg_load = ceil(partition_count / total_weight * load)`.
///
/// Lookups take a shared lock. [`add`](Self::add) and
/// [`remove`](Self::remove) take the exclusive lock, rebuild the whole
/// partition table off to the side and publish it only on success, so a
/// failed mutation leaves the previous state in place.
pub struct WeightedRing<M> {
    config: PlacementConfig,
    hasher: Arc<dyn KeyHasher>,
    state: RwLock<RingState<M>>,
}

impl<M> fmt::Debug for WeightedRing<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeightedRing")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M: Member + Clone> WeightedRing<M> {
    /// Start building a ring with the given config.
    pub fn builder(config: PlacementConfig) -> RingBuilder<M> {
        RingBuilder::new(config)
    }

    /// Build a ring from `members` in one call.
    pub fn new(
        members: impl IntoIterator<Item = M>,
        config: PlacementConfig,
        hasher: impl KeyHasher + 'static,
    ) -> Result<Self, PlacementError> {
        Self::builder(config).hasher(hasher).members(members).build()
    }

    /// The effective config, with defaults applied.
    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Number of partitions keys are bucketed into.
    pub fn partition_count(&self) -> u64 {
        self.config.partition_count
    }

    /// Add a member and rebalance. Adding a known identity is a no-op.
    pub fn add(&self, member: M) -> Result<(), PlacementError> {
        let mut state = self.state.write().expect("lock poisoned");
        let identity = member.identity().to_string();
        if state.members.contains_key(&identity) {
            debug!(%identity, "member already on ring");
            return Ok(());
        }

        let mut next = state.clone();
        next.insert(self.hasher.as_ref(), member);
        next.redistribute(&self.config, self.hasher.as_ref())?;
        *state = next;

        info!(
            %identity,
            members = state.members.len(),
            total_weight = state.total_weight,
            "member added to ring"
        );
        Ok(())
    }

    /// Remove a member by identity and rebalance. Unknown identities are a
    /// no-op.
    pub fn remove(&self, identity: &str) -> Result<(), PlacementError> {
        let mut state = self.state.write().expect("lock poisoned");
        if !state.members.contains_key(identity) {
            debug!(identity, "member not on ring");
            return Ok(());
        }

        let mut next = state.clone();
        next.remove(self.hasher.as_ref(), identity);
        next.redistribute(&self.config, self.hasher.as_ref())?;
        *state = next;

        info!(
            identity,
            members = state.members.len(),
            total_weight = state.total_weight,
            "member removed from ring"
        );
        Ok(())
    }

    /// Partition a key falls into: `hash(key) % partition_count`.
    ///
    /// Takes no lock; the partition count never changes after construction.
    pub fn find_partition_id(&self, key: &[u8]) -> u64 {
        self.hasher.hash(key) % self.config.partition_count
    }

    /// Owner of `partition`, or `None` if the ring is empty.
    pub fn partition_owner(&self, partition: u64) -> Option<M> {
        let state = self.state.read().expect("lock poisoned");
        state
            .assignment
            .owner(partition)
            .and_then(|id| state.members.get(id))
            .cloned()
    }

    /// Owner of the partition `key` falls into, or `None` if the ring is
    /// empty.
    pub fn locate_key(&self, key: &[u8]) -> Option<M> {
        self.partition_owner(self.find_partition_id(key))
    }

    /// The owner of `key` followed by the next `count - 1` distinct members
    /// on the member-level ring.
    pub fn closest_n(&self, key: &[u8], count: usize) -> Result<Vec<M>, PlacementError> {
        self.closest_n_for_partition(self.find_partition_id(key), count)
    }

    /// The owner of `partition` followed by the next `count - 1` distinct
    /// members on the member-level ring.
    ///
    /// Fails with [`PlacementError::InsufficientMembers`] if `count` exceeds
    /// the number of members. A partition id outside the table has no owner
    /// and yields an empty list.
    pub fn closest_n_for_partition(
        &self,
        partition: u64,
        count: usize,
    ) -> Result<Vec<M>, PlacementError> {
        let state = self.state.read().expect("lock poisoned");
        let available = state.members.len();
        if count > available {
            return Err(PlacementError::InsufficientMembers {
                requested: count,
                available,
            });
        }

        let Some(owner) = state.assignment.owner(partition) else {
            return Ok(Vec::new());
        };
        let picked = closest_members(
            self.hasher.as_ref(),
            state.members.keys().map(String::as_str),
            owner,
            count,
        );
        Ok(picked
            .into_iter()
            .filter_map(|id| state.members.get(id).cloned())
            .collect())
    }

    /// Copy of the load table: partitions held per identity.
    pub fn load_distribution(&self) -> HashMap<String, f64> {
        let state = self.state.read().expect("lock poisoned");
        state
            .assignment
            .loads
            .iter()
            .map(|(id, load)| (id.clone(), *load as f64))
            .collect()
    }

    /// Copy of the normalized weight per identity.
    pub fn weight_distribution(&self) -> HashMap<String, u64> {
        self.state.read().expect("lock poisoned").weights.clone()
    }

    /// Current per-unit-weight load bound, `ceil(partitions / total_weight * load)`.
    pub fn average_load(&self) -> f64 {
        let state = self.state.read().expect("lock poisoned");
        average_load(
            self.config.partition_count,
            state.total_weight,
            self.config.load,
        )
    }

    /// Sum of all normalized member weights.
    pub fn total_weight(&self) -> u64 {
        self.state.read().expect("lock poisoned").total_weight
    }

    /// Copy of every registered member, in no particular order.
    pub fn members(&self) -> Vec<M> {
        let state = self.state.read().expect("lock poisoned");
        state.members.values().cloned().collect()
    }

    /// Number of registered members.
    pub fn member_count(&self) -> usize {
        self.state.read().expect("lock poisoned").members.len()
    }

    /// Whether `identity` is registered.
    pub fn contains(&self, identity: &str) -> bool {
        self.state
            .read()
            .expect("lock poisoned")
            .members
            .contains_key(identity)
    }

    /// Number of vnodes on the ring.
    pub fn vnode_count(&self) -> usize {
        self.state.read().expect("lock poisoned").ring.len()
    }

    /// Number of vnodes currently owned by `identity`.
    pub fn vnodes_of(&self, identity: &str) -> usize {
        self.state
            .read()
            .expect("lock poisoned")
            .ring
            .owned_by(identity)
    }

    /// Copy of the current partition table.
    pub fn snapshot(&self) -> PartitionMap {
        let state = self.state.read().expect("lock poisoned");
        PartitionMap::new(
            self.config.partition_count,
            state.assignment.owners.clone(),
        )
    }
}
