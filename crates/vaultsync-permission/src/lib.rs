//! # vaultsync-permission
//!
//! Project-scoped permission gate.
//!
//! Resolves an actor's membership in a project into a [`ProjectPermission`]
//! handle that answers capability queries of the form "may this actor perform
//! action A on subject S, optionally qualified by a secret scope".

#![warn(clippy::all)]

pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod permission;
pub mod roles;
pub mod types;

pub use engine::{PermissionService, PermissionServiceImpl};
pub use errors::{PermissionError, Result};
pub use evaluator::PermissionEvaluator;
pub use permission::ProjectPermission;
pub use types::*;
