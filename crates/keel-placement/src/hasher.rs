//! Pluggable 64-bit hash providers.
//!
//! The ring never picks a hash function on its own: callers pass one of the
//! providers below, their own [`KeyHasher`] implementation, or a plain
//! closure `Fn(&[u8]) -> u64`.

/// Maps an arbitrary byte sequence to a 64-bit position.
///
/// Implementations must be deterministic and spread inputs uniformly over
/// the `u64` space. Cryptographic strength is not required.
pub trait KeyHasher: Send + Sync {
    /// Hash `data` to a ring position.
    fn hash(&self, data: &[u8]) -> u64;
}

impl<F> KeyHasher for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    fn hash(&self, data: &[u8]) -> u64 {
        self(data)
    }
}

/// BLAKE3 truncated to its first 8 bytes, read little-endian.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl KeyHasher for Blake3Hasher {
    fn hash(&self, data: &[u8]) -> u64 {
        let hash = blake3::hash(data);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

/// FNV-1a, 64-bit variant. Fast, but weaker mixing on short keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1aHasher;

impl KeyHasher for Fnv1aHasher {
    fn hash(&self, data: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for &byte in data {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_is_deterministic() {
        let h = Blake3Hasher;
        assert_eq!(h.hash(b"node-a"), h.hash(b"node-a"));
        assert_ne!(h.hash(b"node-a"), h.hash(b"node-b"));
    }

    #[test]
    fn test_blake3_matches_truncated_digest() {
        let digest = blake3::hash(b"key");
        let expected = u64::from_le_bytes(digest.as_bytes()[..8].try_into().unwrap());
        assert_eq!(Blake3Hasher.hash(b"key"), expected);
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        // Offset basis for the empty input, published vector for "a".
        assert_eq!(Fnv1aHasher.hash(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(Fnv1aHasher.hash(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_closure_is_a_hasher() {
        let h = |data: &[u8]| data.len() as u64;
        assert_eq!(KeyHasher::hash(&h, b"four"), 4);
    }
}
