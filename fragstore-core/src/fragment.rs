/*!
The `Fragment` is the lowest level of abstraction tracked by the catalog: a
fixed-size, first-layer-encapsulated chunk of a compound, addressed by the
hash of its post-encapsulation bytes.

Fragments are raw binary blobs once unpacked; by the time a `Fragment`
record exists, its bytes have already been compressed and wrapped at the
first layer and committed into some resource. Distinct compounds that
happen to produce identical post-encapsulation bytes (same plaintext chunk,
same `fragment_size`, same first-layer codecs) share the one `Fragment`.
*/
use serde::{Deserialize, Serialize};

use std::cmp;
use std::fmt;

use crate::resource::ResourceId;

/// Content-addressed key for a `Fragment`, derived from a BLAKE3 digest of
/// its post-encapsulation bytes.
///
/// If two fragments have the same `FragmentHash`, they are assumed to be
/// identical; this is the dedup key.
#[derive(PartialEq, Eq, Copy, Clone, Serialize, Deserialize, Hash)]
pub struct FragmentHash {
    hash: [u8; 32],
}

impl FragmentHash {
    /// Hashes `data` (which should already be compressed and wrapped at the
    /// first layer) into a `FragmentHash`.
    pub fn of(data: &[u8]) -> FragmentHash {
        let digest = blake3::hash(data);
        FragmentHash {
            hash: *digest.as_bytes(),
        }
    }

    /// Builds a `FragmentHash` from a raw 32-byte digest, truncating or
    /// zero-padding input of the wrong length.
    pub fn from_bytes(input: &[u8]) -> FragmentHash {
        let mut hash = [0u8; 32];
        let n = cmp::min(32, input.len());
        hash[..n].copy_from_slice(&input[..n]);
        FragmentHash { hash }
    }

    /// Returns a reference to the raw bytes of this hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    /// The reserved all-zero hash used to key a compound's manifest-like
    /// metadata, should a backend need one outside the normal catalog path.
    pub fn zero() -> FragmentHash {
        FragmentHash { hash: [0u8; 32] }
    }
}

impl fmt::Debug for FragmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FragmentHash(")?;
        for byte in &self.hash[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "…)")
    }
}

impl fmt::Display for FragmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.hash {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Points at the bytes of a `Fragment` inside the resource that carries it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRef {
    pub resource_id: ResourceId,
    /// Byte offset into the resource's inner (decompressed, unwrapped) payload.
    pub offset: u64,
    /// Length in bytes of the fragment body at that offset.
    pub length: u64,
}

/// A catalog record describing one fragment: where its bytes live and how
/// many compound positions currently reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub hash: FragmentHash,
    pub size: u64,
    pub resource_ref: FragmentRef,
    pub refcount: u64,
}

impl Fragment {
    pub fn new(hash: FragmentHash, size: u64, resource_ref: FragmentRef) -> Fragment {
        Fragment {
            hash,
            size,
            resource_ref,
            refcount: 1,
        }
    }

    /// Increments the refcount, returning the new value.
    pub fn retain(&mut self) -> u64 {
        self.refcount += 1;
        self.refcount
    }

    /// Decrements the refcount, returning the new value. Never underflows
    /// past zero; a fragment whose refcount is already zero is a catalog
    /// bug, not a retryable condition.
    pub fn release(&mut self) -> u64 {
        self.refcount = self.refcount.saturating_sub(1);
        self.refcount
    }

    /// True once this fragment has no remaining references and is a
    /// garbage-collection candidate.
    pub fn is_dead(&self) -> bool {
        self.refcount == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_hash() {
        let data = b"the quick brown fox".to_vec();
        let a = FragmentHash::of(&data);
        let b = FragmentHash::of(&data);
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_different_hash() {
        let a = FragmentHash::of(b"the quick brown fox");
        let b = FragmentHash::of(b"the quick brown fog");
        assert_ne!(a, b);
    }

    #[test]
    fn refcount_lifecycle() {
        let hash = FragmentHash::of(b"data");
        let resource_ref = FragmentRef {
            resource_id: ResourceId::random(),
            offset: 0,
            length: 4,
        };
        let mut fragment = Fragment::new(hash, 4, resource_ref);
        assert_eq!(fragment.refcount, 1);
        assert!(!fragment.is_dead());
        fragment.retain();
        assert_eq!(fragment.refcount, 2);
        fragment.release();
        fragment.release();
        assert_eq!(fragment.refcount, 0);
        assert!(fragment.is_dead());
    }
}
