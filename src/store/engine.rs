//! Storage engine contract
//!
//! The repository layer never inspects engine internals beyond this trait:
//! initialization state, shutdown, and statement-level reads and writes.

use crate::model::{Iri, Statement};
use crate::store::handle::{RepositoryLabel, RepositoryType};
use std::path::Path;
use thiserror::Error;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Handle exists but is neither initialized nor connected — stuck
    /// mid-construction or corrupted.
    #[error("repository '{0}' is not initialized")]
    NotInitialized(RepositoryLabel),

    /// Repository type not available for the resolved authority context.
    #[error("repository type '{requested}' is not available in a {context} context")]
    InvalidRepositoryType {
        requested: RepositoryType,
        context: &'static str,
    },

    #[error("unsupported store configuration: {0}")]
    InvalidStoreConfiguration(String),

    /// The engine behind a handle has been shut down.
    #[error("storage engine is closed")]
    EngineClosed,

    /// A construction task failed to run to completion.
    #[error("storage task failed: {0}")]
    Background(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// One opened embedded storage engine.
///
/// Implementations must be thread-safe (Send + Sync); intra-tenant write
/// serialization is the engine's own business.
pub trait StorageEngine: Send + Sync {
    /// True once the schema is in place and until shutdown.
    fn is_initialized(&self) -> bool;

    /// Gracefully close the engine. Idempotent.
    fn shut_down(&self) -> StorageResult<()>;

    /// Insert statements as one atomic write. Duplicate statements are
    /// ignored — a repository holds a set, not a bag.
    fn insert_statements(&self, statements: &[Statement]) -> StorageResult<usize>;

    /// Remove exactly the given statements. Returns how many existed.
    fn remove_statements(&self, statements: &[Statement]) -> StorageResult<usize>;

    /// Every statement with the given subject.
    fn statements_about(&self, subject: &Iri) -> StorageResult<Vec<Statement>>;

    /// True if any statement has the given subject.
    fn has_subject(&self, subject: &Iri) -> StorageResult<bool>;
}

/// Extension trait for opening engines.
pub trait OpenEngine: StorageEngine + Sized {
    /// Open or create an on-disk engine at the given path.
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Open a volatile in-memory engine.
    fn open_in_memory() -> StorageResult<Self>;
}
