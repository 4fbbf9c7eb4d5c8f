//! Weighted consistent hashing with bounded loads.
//!
//! Keys are hashed into a fixed number of partitions, and partitions are
//! assigned to cluster members on a virtual-node ring. Members carry a
//! weight: a member of weight `w` gets `replication_factor * w` vnodes and a
//! load cap of `ceil(avg_load * w)` partitions, where
//! `avg_load = ceil(partition_count / total_weight * load)`. When the member
//! clockwise of a partition is full, the partition spills to the next member
//! with room, so no member is ever overloaded beyond its weighted share.
//!
//! Membership changes rebuild the whole partition table; only a small
//! fraction of partitions change owner. [`PartitionMap::diff`] lists them.
//!
//! ```
//! use keel_placement::{Blake3Hasher, Node, PlacementConfig, WeightedRing};
//!
//! let config = PlacementConfig {
//!     partition_count: 71,
//!     replication_factor: 20,
//!     load: 1.25,
//! };
//! let ring = WeightedRing::new(
//!     [Node::new("cache-1", 2), Node::new("cache-2", 1)],
//!     config,
//!     Blake3Hasher,
//! )?;
//!
//! let owner = ring.locate_key(b"user:42").expect("ring is populated");
//! let replicas = ring.closest_n(b"user:42", 2)?;
//! assert_eq!(replicas[0], owner);
//! # Ok::<(), keel_placement::PlacementError>(())
//! ```

mod assign;
mod config;
mod consistent;
mod error;
mod hasher;
mod member;
mod migration;
mod replica;
mod ring;


pub use config::{
    DEFAULT_LOAD, DEFAULT_PARTITION_COUNT, DEFAULT_REPLICATION_FACTOR, PlacementConfig,
};
pub use consistent::{RingBuilder, WeightedRing};
pub use error::PlacementError;
pub use hasher::{Blake3Hasher, Fnv1aHasher, KeyHasher};
pub use member::{Member, Node, normalize_weight};
pub use migration::{Migration, PartitionMap};
