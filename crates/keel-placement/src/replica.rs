//! Closest-N replica selection.
//!
//! Replicas are picked on a second, member-level ring where each member sits
//! at `hash(identity)`, independent of weight and vnodes. Starting from the
//! partition owner, the next members clockwise are its replicas.

use crate::hasher::KeyHasher;

/// Return up to `count` identities, starting with `owner` and continuing
/// clockwise around the member-level ring.
///
/// Each identity appears at most once. Members whose identity hashes collide
/// are ordered by identity.
pub(crate) fn closest_members<'a>(
    hasher: &dyn KeyHasher,
    identities: impl IntoIterator<Item = &'a str>,
    owner: &str,
    count: usize,
) -> Vec<&'a str> {
    let mut ring: Vec<(u64, &'a str)> = identities
        .into_iter()
        .map(|id| (hasher.hash(id.as_bytes()), id))
        .collect();
    ring.sort_unstable();

    let start = ring.iter().position(|(_, id)| *id == owner).unwrap_or(0);
    let take = count.min(ring.len());

    ring.iter()
        .cycle()
        .skip(start)
        .take(take)
        .map(|(_, id)| *id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Blake3Hasher;

    const IDS: [&str; 5] = ["a", "b", "c", "d", "e"];

    #[test]
    fn test_owner_comes_first() {
        for owner in IDS {
            let picked = closest_members(&Blake3Hasher, IDS, owner, 3);
            assert_eq!(picked.len(), 3);
            assert_eq!(picked[0], owner);
        }
    }

    #[test]
    fn test_all_members_distinct_when_count_equals_members() {
        let mut picked = closest_members(&Blake3Hasher, IDS, "c", IDS.len());
        picked.sort_unstable();
        assert_eq!(picked, IDS.to_vec());
    }

    #[test]
    fn test_follows_member_hash_order() {
        // Identity hash is its first byte, so the member ring is a < b < c < d < e.
        let first_byte = |data: &[u8]| data[0] as u64;
        let picked = closest_members(&first_byte, IDS, "d", 4);
        assert_eq!(picked, vec!["d", "e", "a", "b"]);
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert!(closest_members(&Blake3Hasher, IDS, "a", 0).is_empty());
    }
}
