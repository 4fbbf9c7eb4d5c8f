//! Error types for the placement crate.

/// Errors produced while building or querying a [`WeightedRing`](crate::WeightedRing).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    /// The ring was constructed without a hash provider.
    #[error("a hash provider is required to build a ring")]
    MissingHasher,

    /// The configuration cannot be used as given.
    #[error("invalid placement config: {0}")]
    InvalidConfig(String),

    /// The bounded-load walk went all the way around the ring without finding
    /// a member with spare capacity.
    ///
    /// Raise the partition count, raise the load factor, or add members.
    #[error("not enough room to place partition {partition}: walked all {vnodes} vnodes")]
    NotEnoughRoom {
        /// Partition that could not be placed.
        partition: u64,
        /// Number of ring entries visited.
        vnodes: usize,
    },

    /// More replicas were requested than there are members.
    #[error("insufficient members: requested {requested}, have {available}")]
    InsufficientMembers {
        /// Number of members requested.
        requested: usize,
        /// Number of members currently registered.
        available: usize,
    },
}
