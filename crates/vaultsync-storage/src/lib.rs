//! # vaultsync-storage
//!
//! Storage abstraction layer for vaultsync using RocksDB.
//!
//! Provides the key-value [`Storage`] interface and serialized
//! read-your-own-writes [`Transaction`]s, plus the RocksDB backend.

#![warn(clippy::all)]

pub mod column_families;
pub mod errors;
pub mod rocksdb_impl;
pub mod traits;

pub use column_families::*;
pub use errors::{Result, StorageError};
pub use rocksdb_impl::RocksDbStorage;
pub use traits::{Storage, Transaction, TransactionExt};
