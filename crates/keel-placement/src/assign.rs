//! Load-bounded partition assignment.
//!
//! Every partition `p` starts at `hash(p as le u64)` on the ring and walks
//! clockwise until it meets a member whose load is still below its cap:
//!
//! ```text
//! avg_load = ceil(partition_count / total_weight * load_factor)
//! cap(m)   = avg_load * weight(m)
//! ```
//!
//! Because every member's cap is at least its weighted share of
//! `partition_count`, a walk that visits every vnode always finds room when
//! `load_factor >= 1`.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::PlacementError;
use crate::hasher::KeyHasher;
use crate::ring::VirtualRing;

/// One complete placement: the partition table and the load table, always
/// produced together.
#[derive(Debug, Clone, Default)]
pub(crate) struct Assignment {
    /// Owner identity indexed by partition id. Empty when no member exists.
    pub(crate) owners: Vec<String>,
    /// Partitions held per member identity, including members holding none.
    pub(crate) loads: HashMap<String, u64>,
}

impl Assignment {
    pub(crate) fn owner(&self, partition: u64) -> Option<&str> {
        usize::try_from(partition)
            .ok()
            .and_then(|idx| self.owners.get(idx))
            .map(String::as_str)
    }
}

/// Weight-scaled per-unit load bound, `ceil(partitions / weight * load)`.
///
/// Zero when there is no weight on the ring.
pub(crate) fn average_load(partition_count: u64, total_weight: u64, load: f64) -> f64 {
    if total_weight == 0 {
        return 0.0;
    }
    (partition_count as f64 / total_weight as f64 * load).ceil()
}

/// Inputs to a placement pass.
pub(crate) struct AssignInput<'a> {
    pub(crate) ring: &'a VirtualRing,
    pub(crate) weights: &'a HashMap<String, u64>,
    pub(crate) total_weight: u64,
    pub(crate) partition_count: u64,
    pub(crate) load: f64,
    pub(crate) hasher: &'a dyn KeyHasher,
}

/// Place every partition on the ring, respecting each member's load cap.
pub(crate) fn assign_partitions(input: &AssignInput<'_>) -> Result<Assignment, PlacementError> {
    if input.weights.is_empty() {
        return Ok(Assignment::default());
    }

    let avg_load = average_load(input.partition_count, input.total_weight, input.load);
    let mut loads: HashMap<String, u64> =
        input.weights.keys().map(|id| (id.clone(), 0)).collect();
    let mut owners = Vec::with_capacity(input.partition_count as usize);

    for partition in 0..input.partition_count {
        let pos = input.hasher.hash(&partition.to_le_bytes());
        let owner = place(input, &mut loads, avg_load, pos).ok_or(
            PlacementError::NotEnoughRoom {
                partition,
                vnodes: input.ring.len(),
            },
        )?;
        trace!(partition, pos, %owner, "placed partition");
        owners.push(owner);
    }

    debug!(
        partitions = input.partition_count,
        members = input.weights.len(),
        vnodes = input.ring.len(),
        avg_load,
        "rebuilt partition table"
    );

    Ok(Assignment { owners, loads })
}

/// Walk clockwise from `pos` and claim the first member with spare capacity.
fn place(
    input: &AssignInput<'_>,
    loads: &mut HashMap<String, u64>,
    avg_load: f64,
    pos: u64,
) -> Option<String> {
    for (_, identity) in input.ring.walk_from(pos) {
        let Some(&weight) = input.weights.get(identity) else {
            continue;
        };
        let expected = avg_load * weight as f64;
        let load = loads.entry(identity.to_string()).or_insert(0);
        if (*load + 1) as f64 <= expected {
            *load += 1;
            return Some(identity.to_string());
        }
    }
    None
}
