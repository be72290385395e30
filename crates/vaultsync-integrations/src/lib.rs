//! # vaultsync-integrations
//!
//! Integration lifecycle for vaultsync.
//!
//! ## Responsibilities
//!
//! - Permission-checked create, update, delete, list and manual sync of
//!   integrations
//! - Transactional removal of integration auth records with their last
//!   referencing integration
//! - Folder resolution for (environment, secret path) scopes
//! - Deduplicating sync queue with retrying background worker

#![warn(clippy::all)]

pub mod errors;
pub mod folders;
pub mod metadata;
pub mod retry;
mod service;
pub mod store;
pub mod sync;
pub mod traits;
pub mod types;

pub use errors::{Error, Result};
pub use folders::{normalize_secret_path, FolderStore};
pub use metadata::Metadata;
pub use service::IntegrationService;
pub use store::{IntegrationAuthStore, IntegrationStore};
pub use sync::{LoggingExecutor, SyncQueue, SyncQueueConfig};
pub use traits::{FolderResolver, IntegrationLifecycle, SyncExecutor, SyncTrigger};
pub use types::*;
