//! RocksDB storage implementation.

use crate::{
    column_families::all_column_families,
    errors::{Result, StorageError},
    traits::{deserialize_value, serialize_key, serialize_value, Storage, Transaction},
};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::BTreeMap, path::Path, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// RocksDB storage implementation
pub struct RocksDbStorage {
    db: Arc<DB>,
    /// Held by every open transaction; transactions run one at a time.
    txn_guard: Arc<Mutex<()>>,
    /// Keeps the backing directory alive for `open_test` instances.
    _temp_dir: Option<tempfile::TempDir>,
}

impl RocksDbStorage {
    /// Open RocksDB database at the specified path
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = DB::open_cf(&opts, &path, all_column_families())
            .map_err(|e| StorageError::Database(e.to_string()))?;

        debug!("Opened RocksDB at {:?}", path.as_ref());

        Ok(Self {
            db: Arc::new(db),
            txn_guard: Arc::new(Mutex::new(())),
            _temp_dir: None,
        })
    }

    /// Open a RocksDB database in a fresh temporary directory
    ///
    /// The directory lives as long as the returned storage. This is public
    /// for use in other crates' test modules.
    pub fn open_test() -> Result<Self> {
        let temp_dir = tempfile::TempDir::new().map_err(StorageError::IoError)?;
        let mut storage = Self::open(temp_dir.path())?;
        storage._temp_dir = Some(temp_dir);
        Ok(storage)
    }

    /// Get column family handle
    fn cf_handle(&self, cf: &str) -> Result<&ColumnFamily> {
        cf_handle(&self.db, cf)
    }
}

fn cf_handle<'a>(db: &'a DB, cf: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(cf)
        .ok_or_else(|| StorageError::InvalidColumnFamily(cf.to_string()))
}

fn scan_prefix(db: &DB, cf: &ColumnFamily, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut results = Vec::new();

    // Seek to the prefix; keys are sorted so the first miss ends the range.
    let iter = db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

    for item in iter {
        let (key, value) = item.map_err(|e| StorageError::Database(e.to_string()))?;
        if !key.starts_with(prefix) {
            break;
        }
        results.push((key.to_vec(), value.to_vec()));
    }

    Ok(results)
}

#[async_trait]
impl Storage for RocksDbStorage {
    async fn get<K, V>(&self, cf: &str, key: &K) -> Result<Option<V>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned,
    {
        let cf_handle = self.cf_handle(cf)?;
        let key_bytes = serialize_key(key)?;

        let result = self
            .db
            .get_cf(cf_handle, &key_bytes)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        match result {
            Some(bytes) => {
                let value = deserialize_value(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put<K, V>(&self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize + Send + Sync,
        V: Serialize + Send + Sync,
    {
        let cf_handle = self.cf_handle(cf)?;
        let key_bytes = serialize_key(key)?;
        let value_bytes = serialize_value(value)?;

        self.db
            .put_cf(cf_handle, &key_bytes, &value_bytes)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete<K>(&self, cf: &str, key: &K) -> Result<()>
    where
        K: Serialize + Send + Sync,
    {
        let cf_handle = self.cf_handle(cf)?;
        let key_bytes = serialize_key(key)?;

        self.db
            .delete_cf(cf_handle, &key_bytes)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_by_prefix<K, V>(&self, cf: &str, prefix: &K) -> Result<Vec<(Vec<u8>, V)>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned,
    {
        let cf_handle = self.cf_handle(cf)?;
        let prefix_bytes = serialize_key(prefix)?;

        scan_prefix(&self.db, cf_handle, &prefix_bytes)?
            .into_iter()
            .map(|(key, value)| deserialize_value(&value).map(|value| (key, value)))
            .collect()
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.txn_guard).lock_owned().await;
        debug!("Transaction started");

        Ok(Box::new(RocksDbTransaction {
            db: Arc::clone(&self.db),
            writes: BTreeMap::new(),
            _guard: guard,
        }))
    }
}

/// Pending write: `Some` is a put, `None` a delete.
type PendingWrites = BTreeMap<(String, Vec<u8>), Option<Vec<u8>>>;

/// RocksDB transaction implementation
pub struct RocksDbTransaction {
    db: Arc<DB>,
    writes: PendingWrites,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl Transaction for RocksDbTransaction {
    fn get_raw(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(pending) = self.writes.get(&(cf.to_string(), key.to_vec())) {
            return Ok(pending.clone());
        }

        let cf_handle = cf_handle(&self.db, cf)?;
        self.db
            .get_cf(cf_handle, key)
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn get_by_prefix_raw(&self, cf: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf_handle = cf_handle(&self.db, cf)?;
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            scan_prefix(&self.db, cf_handle, prefix)?.into_iter().collect();

        for ((pending_cf, key), value) in &self.writes {
            if pending_cf != cf || !key.starts_with(prefix) {
                continue;
            }
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    fn put_raw(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        cf_handle(&self.db, cf)?;
        self.writes.insert((cf.to_string(), key), Some(value));
        Ok(())
    }

    fn delete_raw(&mut self, cf: &str, key: Vec<u8>) -> Result<()> {
        cf_handle(&self.db, cf)?;
        self.writes.insert((cf.to_string(), key), None);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut write_batch = WriteBatch::default();
        let write_count = self.writes.len();

        for ((cf, key), value) in &self.writes {
            let cf_handle = cf_handle(&self.db, cf)?;
            match value {
                Some(value) => write_batch.put_cf(cf_handle, key, value),
                None => write_batch.delete_cf(cf_handle, key),
            }
        }

        self.db
            .write(write_batch)
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        debug!(writes = write_count, "Transaction committed");
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!(discarded = self.writes.len(), "Transaction rolled back");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_families::*;
    use crate::traits::TransactionExt;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        id: Uuid,
        name: String,
        value: u64,
    }

    fn test_data(name: &str, value: u64) -> TestData {
        TestData {
            id: Uuid::new_v4(),
            name: name.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let storage = RocksDbStorage::open_test().unwrap();
        let data = test_data("test", 42);

        storage.put(CF_INTEGRATIONS, &data.id, &data).await.unwrap();

        let result: Option<TestData> = storage.get(CF_INTEGRATIONS, &data.id).await.unwrap();
        assert_eq!(result, Some(data));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let storage = RocksDbStorage::open_test().unwrap();
        let key = Uuid::new_v4();

        let result: Option<TestData> = storage.get(CF_INTEGRATIONS, &key).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_put_and_delete() {
        let storage = RocksDbStorage::open_test().unwrap();
        let data = test_data("test", 42);

        storage.put(CF_INTEGRATIONS, &data.id, &data).await.unwrap();
        storage.delete(CF_INTEGRATIONS, &data.id).await.unwrap();

        let result: Option<TestData> = storage.get(CF_INTEGRATIONS, &data.id).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_unknown_column_family() {
        let storage = RocksDbStorage::open_test().unwrap();
        let result: Result<Option<TestData>> = storage.get("no_such_cf", &Uuid::new_v4()).await;
        assert!(matches!(result, Err(StorageError::InvalidColumnFamily(_))));
    }

    #[tokio::test]
    async fn test_get_by_prefix() {
        let storage = RocksDbStorage::open_test().unwrap();

        let id1 = Uuid::new_v4();
        let id2 = Uuid::new_v4();

        let key1 = (id1, Uuid::new_v4());
        let key2 = (id1, Uuid::new_v4());
        let key3 = (id2, Uuid::new_v4());

        for key in [key1, key2, key3] {
            storage
                .put(CF_INTEGRATIONS_BY_AUTH, &key, &key.1)
                .await
                .unwrap();
        }

        let results: Vec<(Vec<u8>, Uuid)> = storage
            .get_by_prefix(CF_INTEGRATIONS_BY_AUTH, &id1)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, id)| *id == key1.1 || *id == key2.1));
    }

    #[tokio::test]
    async fn test_transaction_reads_own_writes() {
        let storage = RocksDbStorage::open_test().unwrap();
        let data = test_data("pending", 7);

        let mut txn = storage.begin_transaction().await.unwrap();
        txn.put(CF_INTEGRATIONS, &data.id, &data).unwrap();

        let seen: Option<TestData> = txn.get(CF_INTEGRATIONS, &data.id).unwrap();
        assert_eq!(seen, Some(data.clone()));

        // Not visible outside until commit
        let outside: Option<TestData> = storage.get(CF_INTEGRATIONS, &data.id).await.unwrap();
        assert_eq!(outside, None);

        txn.commit().await.unwrap();

        let committed: Option<TestData> = storage.get(CF_INTEGRATIONS, &data.id).await.unwrap();
        assert_eq!(committed, Some(data));
    }

    #[tokio::test]
    async fn test_transaction_prefix_overlay() {
        let storage = RocksDbStorage::open_test().unwrap();
        let auth_id = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        storage
            .put(CF_INTEGRATIONS_BY_AUTH, &(auth_id, first), &first)
            .await
            .unwrap();
        storage
            .put(CF_INTEGRATIONS_BY_AUTH, &(auth_id, second), &second)
            .await
            .unwrap();

        let mut txn = storage.begin_transaction().await.unwrap();
        txn.delete(CF_INTEGRATIONS_BY_AUTH, &(auth_id, first)).unwrap();

        let remaining: Vec<(Vec<u8>, Uuid)> =
            txn.get_by_prefix(CF_INTEGRATIONS_BY_AUTH, &auth_id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].1, second);

        txn.delete(CF_INTEGRATIONS_BY_AUTH, &(auth_id, second)).unwrap();
        let remaining: Vec<(Vec<u8>, Uuid)> =
            txn.get_by_prefix(CF_INTEGRATIONS_BY_AUTH, &auth_id).unwrap();
        assert!(remaining.is_empty());

        txn.rollback();

        let after: Vec<(Vec<u8>, Uuid)> = storage
            .get_by_prefix(CF_INTEGRATIONS_BY_AUTH, &auth_id)
            .await
            .unwrap();
        assert_eq!(after.len(), 2);
    }

    #[tokio::test]
    async fn test_transactions_are_serialized() {
        let storage = RocksDbStorage::open_test().unwrap();

        let first = storage.begin_transaction().await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), storage.begin_transaction()).await;
        assert!(blocked.is_err(), "second transaction must wait for the first");

        first.commit().await.unwrap();

        let second =
            tokio::time::timeout(Duration::from_millis(500), storage.begin_transaction()).await;
        assert!(second.is_ok());
    }
}
