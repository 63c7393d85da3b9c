//! Non-persistent catalog backing: an in-memory reference implementation
//! of the storage-side contract, used by tests and by `Backend::Memory`
//! sessions.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Catalog, Result, Transaction};

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    rows: Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryCatalog {
    pub fn new() -> MemoryCatalog {
        MemoryCatalog::default()
    }
}

struct MemoryTransaction {
    rows: Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>,
    puts: Vec<(Vec<u8>, Vec<u8>)>,
    deletes: Vec<Vec<u8>>,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.puts.push((key, value));
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.deletes.push(key);
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut rows = self.rows.lock().await;
        for key in self.deletes {
            rows.remove(&key);
        }
        for (key, value) in self.puts {
            rows.insert(key, value);
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(MemoryTransaction {
            rows: self.rows.clone(),
            puts: Vec::new(),
            deletes: Vec::new(),
        }))
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.rows.lock().await.get(key).cloned())
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .rows
            .lock()
            .await
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let catalog = MemoryCatalog::new();
        let mut txn = catalog.begin().await.unwrap();
        txn.put(b"c/a".to_vec(), b"1".to_vec());
        assert_eq!(catalog.get(b"c/a").await.unwrap(), None);
        txn.commit().await.unwrap();
        assert_eq!(catalog.get(b"c/a").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn scan_prefix_is_scoped() {
        let catalog = MemoryCatalog::new();
        let mut txn = catalog.begin().await.unwrap();
        txn.put(b"c/a".to_vec(), b"1".to_vec());
        txn.put(b"c/b".to_vec(), b"2".to_vec());
        txn.put(b"f/a".to_vec(), b"3".to_vec());
        txn.commit().await.unwrap();
        let rows = catalog.scan_prefix(b"c/").await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
