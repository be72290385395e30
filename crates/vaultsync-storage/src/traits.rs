//! Storage trait definitions.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Storage interface for key-value operations
///
/// This trait abstracts the underlying storage implementation (RocksDB)
/// to enable testing with mock implementations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get a value by key from a column family
    ///
    /// # Returns
    ///
    /// `Ok(Some(value))` if key exists, `Ok(None)` if not found
    async fn get<K, V>(&self, cf: &str, key: &K) -> Result<Option<V>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned;

    /// Put a key-value pair into a column family
    async fn put<K, V>(&self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize + Send + Sync,
        V: Serialize + Send + Sync;

    /// Delete a key from a column family
    async fn delete<K>(&self, cf: &str, key: &K) -> Result<()>
    where
        K: Serialize + Send + Sync;

    /// Get multiple values by prefix (range query)
    ///
    /// Returns all key-value pairs where keys start with the given prefix.
    async fn get_by_prefix<K, V>(&self, cf: &str, prefix: &K) -> Result<Vec<(Vec<u8>, V)>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned;

    /// Begin a transaction
    ///
    /// Transactions are serialized against each other: the returned handle
    /// holds the store's transaction guard until it is committed or rolled
    /// back. Reads through the handle observe its own buffered writes.
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;
}

/// Transactional unit of work
///
/// Writes are buffered and applied as one atomic write batch on `commit`.
/// Reads are part of the unit: `get_raw` and `get_by_prefix_raw` see
/// committed data overlaid with this transaction's pending writes. Nothing
/// is visible to other readers until `commit`.
///
/// Note: This trait works with pre-serialized bytes to maintain object safety.
/// Use [`TransactionExt`] for typed keys and values.
#[async_trait]
pub trait Transaction: Send {
    /// Read a pre-serialized key
    fn get_raw(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Read all pairs whose key starts with a pre-serialized prefix
    fn get_by_prefix_raw(&self, cf: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Buffer a pre-serialized put
    fn put_raw(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Buffer a pre-serialized delete
    fn delete_raw(&mut self, cf: &str, key: Vec<u8>) -> Result<()>;

    /// Apply every buffered write atomically and release the guard
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard buffered writes and release the guard
    fn rollback(self: Box<Self>);
}

/// Extension trait providing type-safe methods for Transaction
pub trait TransactionExt: Transaction {
    /// Get a value by key (type-safe)
    fn get<K, V>(&self, cf: &str, key: &K) -> Result<Option<V>>
    where
        K: Serialize,
        V: DeserializeOwned,
    {
        let key_bytes = serialize_key(key)?;
        self.get_raw(cf, &key_bytes)?
            .map(|bytes| deserialize_value(&bytes))
            .transpose()
    }

    /// Check if a key exists (type-safe)
    fn exists<K>(&self, cf: &str, key: &K) -> Result<bool>
    where
        K: Serialize,
    {
        let key_bytes = serialize_key(key)?;
        Ok(self.get_raw(cf, &key_bytes)?.is_some())
    }

    /// Get all values under a key prefix (type-safe)
    fn get_by_prefix<K, V>(&self, cf: &str, prefix: &K) -> Result<Vec<(Vec<u8>, V)>>
    where
        K: Serialize,
        V: DeserializeOwned,
    {
        let prefix_bytes = serialize_key(prefix)?;
        self.get_by_prefix_raw(cf, &prefix_bytes)?
            .into_iter()
            .map(|(key, value)| deserialize_value(&value).map(|value| (key, value)))
            .collect()
    }

    /// Put a key-value pair (type-safe)
    fn put<K, V>(&mut self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let key_bytes = serialize_key(key)?;
        let value_bytes = serialize_value(value)?;
        self.put_raw(cf, key_bytes, value_bytes)
    }

    /// Delete a key (type-safe)
    fn delete<K>(&mut self, cf: &str, key: &K) -> Result<()>
    where
        K: Serialize,
    {
        let key_bytes = serialize_key(key)?;
        self.delete_raw(cf, key_bytes)
    }
}

impl<T: Transaction + ?Sized> TransactionExt for T {}

/// Helper function to serialize a key
pub(crate) fn serialize_key<K: Serialize + ?Sized>(key: &K) -> Result<Vec<u8>> {
    bincode::serialize(key).map_err(|e| crate::errors::StorageError::Serialization(e.to_string()))
}

/// Helper function to serialize a value
pub(crate) fn serialize_value<V: Serialize + ?Sized>(value: &V) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| crate::errors::StorageError::Serialization(e.to_string()))
}

/// Helper function to deserialize a value
pub(crate) fn deserialize_value<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    bincode::deserialize(bytes)
        .map_err(|e| crate::errors::StorageError::Deserialization(e.to_string()))
}
