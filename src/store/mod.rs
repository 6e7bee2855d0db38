//! Repository storage layer
//!
//! Per-tenant embedded engines behind cached, connection-counted handles.
//! The cache is the only piece of shared mutable state in the crate; all
//! mutation goes through acquire, invalidate, sweep and shutdown.

mod builder;
mod cache;
mod engine;
mod handle;
mod sqlite;

pub use builder::RepositoryBuilder;
pub use cache::{CacheConfig, RepositoryCache};
pub use engine::{OpenEngine, StorageEngine, StorageError, StorageResult};
pub use handle::{
    RepositoryConnection, RepositoryHandle, RepositoryKind, RepositoryLabel, RepositoryType,
};
pub use sqlite::SqliteEngine;
