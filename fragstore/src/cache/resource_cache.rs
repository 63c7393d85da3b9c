//! Bounded LRU cache of recently fetched resource bodies (post-unwrap,
//! post-decompress), so offset/length slicing during download is O(1) on
//! hit. Read-only to callers; the assembler never writes through it.
//!
//! Resources here vary wildly in size, so capacity is tracked in bytes
//! instead of entry count: `lru::LruCache` is kept at an effectively
//! unbounded entry count and this wrapper evicts least-recently-used
//! entries by hand until the tracked byte total is back under budget.

use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;

use fragstore_core::ResourceId;

pub struct ResourceCache {
    inner: Mutex<Inner>,
    capacity_bytes: u64,
}

struct Inner {
    cache: LruCache<ResourceId, Arc<Vec<u8>>>,
    used_bytes: u64,
}

impl ResourceCache {
    pub fn new(capacity_bytes: u64) -> ResourceCache {
        ResourceCache {
            inner: Mutex::new(Inner {
                cache: LruCache::unbounded(),
                used_bytes: 0,
            }),
            capacity_bytes,
        }
    }

    pub async fn get(&self, id: &ResourceId) -> Option<Arc<Vec<u8>>> {
        let mut inner = self.inner.lock().await;
        inner.cache.get(id).cloned()
    }

    /// Inserts `body` for `id`, evicting least-recently-used entries until
    /// the cache is back under `capacity_bytes`. A single body larger than
    /// the whole budget is still inserted (never refused), then immediately
    /// eligible for eviction on the next insert.
    pub async fn insert(&self, id: ResourceId, body: Arc<Vec<u8>>) {
        let mut inner = self.inner.lock().await;
        let size = body.len() as u64;
        if let Some(old) = inner.cache.put(id, body) {
            inner.used_bytes = inner.used_bytes.saturating_sub(old.len() as u64);
        }
        inner.used_bytes += size;
        while inner.used_bytes > self.capacity_bytes {
            match inner.cache.pop_lru() {
                Some((_, evicted)) => {
                    inner.used_bytes = inner.used_bytes.saturating_sub(evicted.len() as u64);
                }
                None => break,
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn evicts_lru_once_over_budget() {
        let cache = ResourceCache::new(10);
        let a = ResourceId::random();
        let b = ResourceId::random();
        let c = ResourceId::random();
        cache.insert(a, Arc::new(vec![0u8; 5])).await;
        cache.insert(b, Arc::new(vec![0u8; 5])).await;
        // Touch `a` so `b` becomes the least-recently-used entry.
        cache.get(&a).await;
        cache.insert(c, Arc::new(vec![0u8; 5])).await;
        assert!(cache.get(&b).await.is_none());
        assert!(cache.get(&a).await.is_some());
        assert!(cache.get(&c).await.is_some());
    }

    #[tokio::test]
    async fn hit_returns_same_bytes() {
        let cache = ResourceCache::new(100);
        let id = ResourceId::random();
        cache.insert(id, Arc::new(b"hello".to_vec())).await;
        assert_eq!(*cache.get(&id).await.unwrap(), b"hello".to_vec());
    }
}
