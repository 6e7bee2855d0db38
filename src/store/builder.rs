//! Repository construction
//!
//! Builds handles for the cache: persistent handles live under
//! `<base>/<tenant_key>/<repository_type>`, volatile handles are purely
//! in-memory. A persistent open that fails degrades to a volatile handle
//! so the tenant stays available; only the volatile fallback itself
//! failing is surfaced.

use super::engine::{OpenEngine, StorageResult};
use super::handle::{RepositoryHandle, RepositoryKind, RepositoryLabel, RepositoryType};
use super::sqlite::SqliteEngine;
use crate::model::Tenant;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

const DATABASE_FILE: &str = "graph.db";

/// Builds repository handles for tenants.
#[derive(Debug, Clone)]
pub struct RepositoryBuilder {
    base_path: Option<PathBuf>,
}

impl RepositoryBuilder {
    /// `base_path` is the root directory for persistent repositories.
    /// Without one, every tenant gets volatile handles.
    pub fn new(base_path: Option<PathBuf>) -> Self {
        Self { base_path }
    }

    /// Build the handle for one tenant repository.
    pub fn build(
        &self,
        repository_type: RepositoryType,
        tenant: &Tenant,
        stage: Option<&str>,
    ) -> StorageResult<RepositoryHandle> {
        let label = RepositoryLabel::new(repository_type, &tenant.key, stage);

        if tenant.flags.persistent {
            match &self.base_path {
                Some(base) => {
                    let path = base.join(&tenant.key).join(repository_type.as_str());
                    return self.build_persistent(label, path);
                }
                None => {
                    warn!(
                        label = %label,
                        "no storage directory configured for persistent tenant, using volatile handle"
                    );
                }
            }
        }

        self.build_volatile(label)
    }

    fn build_persistent(
        &self,
        label: RepositoryLabel,
        path: PathBuf,
    ) -> StorageResult<RepositoryHandle> {
        debug!(label = %label, path = %path.display(), "initializing persistent repository");

        match std::fs::create_dir_all(&path)
            .map_err(Into::into)
            .and_then(|_| SqliteEngine::open(path.join(DATABASE_FILE)))
        {
            Ok(engine) => Ok(RepositoryHandle::new(
                label,
                RepositoryKind::Persistent,
                Arc::new(engine),
            )),
            Err(e) => {
                warn!(
                    label = %label,
                    path = %path.display(),
                    error = %e,
                    "failed to initialize persistent repository, falling back to volatile"
                );
                self.build_volatile(label)
            }
        }
    }

    fn build_volatile(&self, label: RepositoryLabel) -> StorageResult<RepositoryHandle> {
        debug!(label = %label, "initializing volatile repository");
        let engine = SqliteEngine::open_in_memory()?;
        Ok(RepositoryHandle::new(
            label,
            RepositoryKind::Volatile,
            Arc::new(engine),
        ))
    }
}
