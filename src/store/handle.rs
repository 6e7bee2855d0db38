//! Repository handles
//!
//! A handle wraps one opened storage engine together with its label, its
//! backing kind and a live connection count. Handles are owned exclusively
//! by the repository cache; requests hold [`RepositoryConnection`] guards,
//! never the engine itself.

use super::engine::{StorageEngine, StorageError, StorageResult};
use crate::model::{Iri, Statement};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// The repository kinds a tenant can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepositoryType {
    Entities,
    Schema,
    Transactions,
    Application,
}

impl RepositoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entities => "entities",
            Self::Schema => "schema",
            Self::Transactions => "transactions",
            Self::Application => "application",
        }
    }
}

impl std::fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived cache key: `{repository_type}_{tenant_key}[_{stage}]`, always
/// lower-case. Two requests for the same tenant and type always compute
/// the same label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryLabel(String);

impl RepositoryLabel {
    pub fn new(repository_type: RepositoryType, tenant_key: &str, stage: Option<&str>) -> Self {
        let mut label = format!("{}_{}", repository_type, tenant_key);
        if let Some(stage) = stage {
            label.push('_');
            label.push_str(stage);
        }
        Self(label.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistent-on-disk vs volatile-in-memory backing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    Persistent,
    Volatile,
}

#[derive(Debug, Default)]
struct HandleState {
    connections: usize,
    /// Shutdown requested while connections were live
    close_deferred: bool,
    closed: bool,
}

/// The live, cached wrapper around one opened storage engine.
///
/// The connection count and the closed flag share one lock, so opening a
/// connection is mutually exclusive with physical shutdown: a connection
/// can never be handed out on an engine that is going away.
pub struct RepositoryHandle {
    label: RepositoryLabel,
    kind: RepositoryKind,
    engine: Arc<dyn StorageEngine>,
    state: Mutex<HandleState>,
}

impl RepositoryHandle {
    pub fn new(
        label: RepositoryLabel,
        kind: RepositoryKind,
        engine: Arc<dyn StorageEngine>,
    ) -> Self {
        Self {
            label,
            kind,
            engine,
            state: Mutex::new(HandleState::default()),
        }
    }

    pub fn label(&self) -> &RepositoryLabel {
        &self.label
    }

    pub fn kind(&self) -> RepositoryKind {
        self.kind
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_initialized()
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    /// Open a logical connection. Fails once shutdown has begun.
    pub fn connect(self: &Arc<Self>) -> StorageResult<RepositoryConnection> {
        let mut state = self.state.lock().unwrap();
        if state.closed || state.close_deferred {
            return Err(StorageError::EngineClosed);
        }
        state.connections += 1;
        Ok(RepositoryConnection {
            handle: Arc::clone(self),
        })
    }

    /// Gracefully shut down the engine.
    ///
    /// With live connections the physical close is deferred; the last
    /// connection guard performs it on drop. Idempotent.
    pub fn shut_down(&self) -> StorageResult<()> {
        {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return Ok(());
            }
            if state.connections > 0 {
                debug!(
                    label = %self.label,
                    connections = state.connections,
                    "deferring engine shutdown until connections drain"
                );
                state.close_deferred = true;
                return Ok(());
            }
            state.closed = true;
        }
        self.engine.shut_down()
    }

    fn release_connection(&self) {
        let close_now = {
            let mut state = self.state.lock().unwrap();
            state.connections -= 1;
            if state.close_deferred && state.connections == 0 && !state.closed {
                state.closed = true;
                true
            } else {
                false
            }
        };
        if close_now {
            if let Err(e) = self.engine.shut_down() {
                warn!(label = %self.label, error = %e, "deferred engine shutdown failed");
            }
        }
    }
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("initialized", &self.is_initialized())
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// RAII guard for one logical use of a repository handle.
///
/// Storage operations go through the guard; dropping it decrements the
/// handle's connection count and performs any deferred shutdown.
pub struct RepositoryConnection {
    handle: Arc<RepositoryHandle>,
}

impl RepositoryConnection {
    pub fn handle(&self) -> &RepositoryHandle {
        &self.handle
    }

    pub fn insert_statements(&self, statements: &[Statement]) -> StorageResult<usize> {
        self.handle.engine.insert_statements(statements)
    }

    pub fn remove_statements(&self, statements: &[Statement]) -> StorageResult<usize> {
        self.handle.engine.remove_statements(statements)
    }

    pub fn statements_about(&self, subject: &Iri) -> StorageResult<Vec<Statement>> {
        self.handle.engine.statements_about(subject)
    }

    pub fn has_subject(&self, subject: &Iri) -> StorageResult<bool> {
        self.handle.engine.has_subject(subject)
    }
}

impl Drop for RepositoryConnection {
    fn drop(&mut self) {
        self.handle.release_connection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::engine::OpenEngine;
    use crate::store::sqlite::SqliteEngine;

    fn handle() -> Arc<RepositoryHandle> {
        let engine = Arc::new(SqliteEngine::open_in_memory().unwrap());
        Arc::new(RepositoryHandle::new(
            RepositoryLabel::new(RepositoryType::Entities, "t-1", None),
            RepositoryKind::Volatile,
            engine,
        ))
    }

    // === Scenario: labels are lower-case and deterministic ===
    #[test]
    fn label_format() {
        let label = RepositoryLabel::new(RepositoryType::Entities, "Acme-Key", None);
        assert_eq!(label.as_str(), "entities_acme-key");

        let staged = RepositoryLabel::new(RepositoryType::Transactions, "t1", Some("Dev"));
        assert_eq!(staged.as_str(), "transactions_t1_dev");

        assert_eq!(
            RepositoryLabel::new(RepositoryType::Entities, "t1", None),
            RepositoryLabel::new(RepositoryType::Entities, "t1", None)
        );
    }

    // === Scenario: connection guards track the live count ===
    #[test]
    fn connection_count_follows_guards() {
        let handle = handle();
        assert_eq!(handle.connection_count(), 0);

        let a = handle.connect().unwrap();
        let b = handle.connect().unwrap();
        assert_eq!(handle.connection_count(), 2);

        drop(a);
        assert_eq!(handle.connection_count(), 1);
        drop(b);
        assert_eq!(handle.connection_count(), 0);
    }

    // === Scenario: shutdown with live connections is deferred ===
    #[test]
    fn shutdown_defers_until_connections_drain() {
        let handle = handle();
        let conn = handle.connect().unwrap();

        handle.shut_down().unwrap();
        // still usable through the existing connection
        assert!(handle.is_initialized());
        assert!(conn.has_subject(&Iri::new("s")).is_ok());
        // but no new connections
        assert!(matches!(handle.connect(), Err(StorageError::EngineClosed)));

        drop(conn);
        assert!(!handle.is_initialized());
    }

    // === Scenario: shutdown without connections closes immediately ===
    #[test]
    fn shutdown_is_immediate_when_idle() {
        let handle = handle();
        handle.shut_down().unwrap();
        assert!(!handle.is_initialized());
        assert!(matches!(handle.connect(), Err(StorageError::EngineClosed)));
        // idempotent
        handle.shut_down().unwrap();
    }
}
