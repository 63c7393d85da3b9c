//! Pending buffer between the fragment pipeline (C6) and the resource
//! assembler (C4). Holds first-layer-encapsulated fragment bodies keyed by
//! hash, deduplicating within the buffer itself, and preserves arrival
//! order so the assembler concatenates them the way the source stream
//! produced them. Flush is monotonic: once a fragment is handed to a
//! sealed resource it never returns here.

use std::collections::HashSet;

use fragstore_core::FragmentHash;

pub struct PendingFragment {
    pub hash: FragmentHash,
    pub body: Vec<u8>,
}

pub struct FragmentCache {
    order: Vec<FragmentHash>,
    bodies: std::collections::HashMap<FragmentHash, Vec<u8>>,
    seen: HashSet<FragmentHash>,
    accumulated_bytes: u64,
    target_bytes: u64,
    max_fragments: usize,
}

impl FragmentCache {
    pub fn new(target_bytes: u64, max_fragments: usize) -> FragmentCache {
        FragmentCache {
            order: Vec::new(),
            bodies: std::collections::HashMap::new(),
            seen: HashSet::new(),
            accumulated_bytes: 0,
            target_bytes,
            max_fragments,
        }
    }

    /// Buffers a new-fragment body. A hash already present in the buffer is
    /// silently ignored (it dedups against itself, per §4.7): the caller is
    /// still expected to emit its hash for the fragment sequence.
    pub fn push(&mut self, hash: FragmentHash, body: Vec<u8>) {
        if self.seen.contains(&hash) {
            return;
        }
        self.accumulated_bytes += body.len() as u64;
        self.seen.insert(hash);
        self.order.push(hash);
        self.bodies.insert(hash, body);
    }

    /// True once either threshold in §4.7(a)/(b) is met.
    pub fn should_flush(&self) -> bool {
        self.accumulated_bytes >= self.target_bytes || self.order.len() >= self.max_fragments
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Drains the whole buffer in arrival order, for handoff to a builder.
    pub fn drain(&mut self) -> Vec<PendingFragment> {
        let order = std::mem::take(&mut self.order);
        self.seen.clear();
        self.accumulated_bytes = 0;
        order
            .into_iter()
            .map(|hash| PendingFragment {
                hash,
                body: self.bodies.remove(&hash).expect("buffer invariant"),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_within_buffer() {
        let mut cache = FragmentCache::new(1024, 100);
        let hash = FragmentHash::of(b"x");
        cache.push(hash, b"x".to_vec());
        cache.push(hash, b"x".to_vec());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn preserves_arrival_order_on_drain() {
        let mut cache = FragmentCache::new(1024, 100);
        let a = FragmentHash::of(b"a");
        let b = FragmentHash::of(b"b");
        cache.push(a, b"a".to_vec());
        cache.push(b, b"b".to_vec());
        let drained = cache.drain();
        assert_eq!(drained[0].hash, a);
        assert_eq!(drained[1].hash, b);
        assert!(cache.is_empty());
    }

    #[test]
    fn flush_threshold_by_count() {
        let mut cache = FragmentCache::new(u64::MAX, 2);
        cache.push(FragmentHash::of(b"a"), b"a".to_vec());
        assert!(!cache.should_flush());
        cache.push(FragmentHash::of(b"b"), b"b".to_vec());
        assert!(cache.should_flush());
    }

    #[test]
    fn flush_threshold_by_size() {
        let mut cache = FragmentCache::new(2, 100);
        cache.push(FragmentHash::of(b"ab"), b"ab".to_vec());
        assert!(cache.should_flush());
    }
}
