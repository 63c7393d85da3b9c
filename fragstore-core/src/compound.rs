/*!
A `Compound` is the user-visible, named byte stream recorded in the
catalog: an ordered sequence of fragment hashes plus whatever metadata is
needed to verify a reconstructed stream and to decide whether dedup will
fire against some other compound.
*/
use serde::{Deserialize, Serialize};

use crate::codec::EncapsulationSpec;
use crate::fragment::FragmentHash;

/// Digest of an entire original stream, checked on download close and used
/// by `-u`/update-mode uploads to skip unchanged files.
#[derive(Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct StreamHash([u8; 32]);

impl StreamHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for StreamHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StreamHash(")?;
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "…)")
    }
}

/// Incrementally hashes a stream with BLAKE3, the same algorithm used for
/// fragment content addressing, to produce a `StreamHash` once the whole
/// stream has passed through.
#[derive(Default)]
pub struct StreamHasher {
    hasher: blake3::Hasher,
}

impl StreamHasher {
    pub fn new() -> StreamHasher {
        StreamHasher {
            hasher: blake3::Hasher::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finish(&self) -> StreamHash {
        StreamHash(*self.hasher.finalize().as_bytes())
    }
}

/// A named, user-visible byte stream: an ordered sequence of fragment
/// hashes plus the bookkeeping needed to verify and chunk it the same way
/// on re-upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compound {
    pub name: String,
    pub total_size: u64,
    pub total_hash: StreamHash,
    /// Codecs applied at the first (fragment) layer, in order. Two
    /// compounds only dedup against each other if this, and
    /// `fragment_size`, agree.
    pub encapsulation_spec: EncapsulationSpec,
    pub fragment_size: u64,
    /// Ordered list of fragment hashes; order defines reconstruction.
    /// Duplicates are allowed and expected (repeated content within one
    /// stream dedups against itself too).
    pub fragment_sequence: Vec<FragmentHash>,
}

impl Compound {
    pub fn new(
        name: String,
        total_size: u64,
        total_hash: StreamHash,
        encapsulation_spec: EncapsulationSpec,
        fragment_size: u64,
        fragment_sequence: Vec<FragmentHash>,
    ) -> Compound {
        Compound {
            name,
            total_size,
            total_hash,
            encapsulation_spec,
            fragment_size,
            fragment_sequence,
        }
    }

    /// Number of fragment positions in this compound (distinct fragments
    /// may repeat; this counts positions, not unique hashes).
    pub fn fragment_position_count(&self) -> usize {
        self.fragment_sequence.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_hasher_matches_whole_input_hash() {
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let mut incremental = StreamHasher::new();
        for chunk in data.chunks(7) {
            incremental.update(chunk);
        }
        let whole = blake3::hash(&data);
        assert_eq!(incremental.finish().as_bytes(), whole.as_bytes());
    }
}
