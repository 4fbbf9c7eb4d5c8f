//! Cluster member contract.

use std::fmt;

use serde::Deserialize;

/// Something that can own partitions on a [`WeightedRing`](crate::WeightedRing).
///
/// The identity is the registry key and is hashed verbatim as the prefix of
/// every vnode key, so identities must be unique and stable for the lifetime
/// of the member.
pub trait Member {
    /// Unique, stable identity of this member.
    fn identity(&self) -> &str;

    /// Relative capacity. Values `<= 0` are treated as 1.
    fn weight(&self) -> i64;
}

/// Clamp a raw member weight to the minimum of 1.
pub fn normalize_weight(weight: i64) -> u64 {
    if weight <= 0 { 1 } else { weight as u64 }
}

/// A plain named member with a weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Node {
    /// Unique identity, e.g. `"cache-03"` or `"10.0.0.7:11211"`.
    pub id: String,
    /// Relative capacity.
    #[serde(default = "default_weight")]
    pub weight: i64,
}

fn default_weight() -> i64 {
    1
}

impl Node {
    /// Create a member with the given identity and weight.
    pub fn new(id: impl Into<String>, weight: i64) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }
}

impl Member for Node {
    fn identity(&self) -> &str {
        &self.id
    }

    fn weight(&self) -> i64 {
        self.weight
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (weight {})", self.id, self.weight)
    }
}
