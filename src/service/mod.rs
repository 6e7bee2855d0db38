//! Entity service
//!
//! The consumer the rest of the crate exists to serve: takes a resolved
//! authority and an inbound fragment, runs the ingestion pipeline, picks
//! the right tenant repository through the cache, and performs the write
//! or read. Every operation produces either a result or a typed error;
//! missing grants answer with a uniform `Unauthorized`, never with a
//! tenant-existence signal.

use crate::model::{GraphFragment, Iri, ObjectTerm, Statement, Tenant, TenantFlags, Transaction};
use crate::pipeline::{IngestPipeline, PipelineError};
use crate::security::{Authority, ResolvedAuthority, SecurityError};
use crate::store::{
    RepositoryBuilder, RepositoryCache, RepositoryHandle, RepositoryLabel, RepositoryType,
    StorageError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors from service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("entity '{0}' not found")]
    EntityNotFound(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Entity-level operations against tenant repositories.
pub struct EntityService {
    cache: Arc<RepositoryCache>,
    builder: Arc<RepositoryBuilder>,
    pipeline: Arc<IngestPipeline>,
    entity_namespace: String,
}

impl EntityService {
    pub fn new(
        cache: Arc<RepositoryCache>,
        builder: Arc<RepositoryBuilder>,
        pipeline: Arc<IngestPipeline>,
        entity_namespace: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            builder,
            pipeline,
            entity_namespace: entity_namespace.into(),
        }
    }

    /// Validate, transform and store an inbound fragment.
    pub async fn create_entity(
        &self,
        auth: &ResolvedAuthority,
        fragment: GraphFragment,
    ) -> ServiceResult<Transaction> {
        self.require(auth, Authority::Application)?;
        debug!(statements = fragment.len(), "creating entity from fragment");

        let fragment = self.pipeline.apply(fragment).await?;
        let handle = self.repository(auth, RepositoryType::Entities).await?;
        let connection = handle.connect()?;
        connection.insert_statements(fragment.statements())?;

        Ok(Transaction::inserted(fragment.statements().to_vec()))
    }

    /// Read an entity by its generated key.
    pub async fn read_entity(
        &self,
        auth: &ResolvedAuthority,
        key: &str,
    ) -> ServiceResult<GraphFragment> {
        self.require(auth, Authority::Reader)?;

        let handle = self.repository(auth, RepositoryType::Entities).await?;
        let connection = handle.connect()?;

        let subject = self.entity_identifier(key);
        let statements = connection.statements_about(&subject)?;
        if statements.is_empty() {
            return Err(ServiceError::EntityNotFound(key.to_string()));
        }
        Ok(GraphFragment::from_statements(subject, statements))
    }

    /// Remove an entity and every statement about it.
    pub async fn remove_entity(
        &self,
        auth: &ResolvedAuthority,
        key: &str,
    ) -> ServiceResult<Transaction> {
        self.require(auth, Authority::Application)?;

        let handle = self.repository(auth, RepositoryType::Entities).await?;
        let connection = handle.connect()?;

        let subject = self.entity_identifier(key);
        let statements = connection.statements_about(&subject)?;
        if statements.is_empty() {
            return Err(ServiceError::EntityNotFound(key.to_string()));
        }
        connection.remove_statements(&statements)?;

        Ok(Transaction::removed(statements))
    }

    /// Attach one statement to an existing entity. Fails if no entity
    /// exists under the given key.
    pub async fn add_statement(
        &self,
        auth: &ResolvedAuthority,
        key: &str,
        predicate: Iri,
        object: ObjectTerm,
    ) -> ServiceResult<Transaction> {
        self.require(auth, Authority::Application)?;

        let handle = self.repository(auth, RepositoryType::Entities).await?;
        let connection = handle.connect()?;

        let subject = self.entity_identifier(key);
        if !connection.has_subject(&subject)? {
            return Err(ServiceError::EntityNotFound(key.to_string()));
        }

        let statement = Statement::new(subject, predicate, object);
        connection.insert_statements(std::slice::from_ref(&statement))?;
        Ok(Transaction::inserted(vec![statement]))
    }

    /// Resolve the repository handle the authority may address.
    ///
    /// A system context only reaches the shared `application` and `schema`
    /// repositories; a tenant-bound context reaches its own `entities`,
    /// `transactions` and `schema` repositories.
    async fn repository(
        &self,
        auth: &ResolvedAuthority,
        repository_type: RepositoryType,
    ) -> ServiceResult<Arc<RepositoryHandle>> {
        let tenant = match auth.authority() {
            Authority::System => match auth.tenant() {
                // a scoped system request acts within the tenant
                Some(tenant) => {
                    Self::check_tenant_repository_type(repository_type)?;
                    tenant.clone()
                }
                None => {
                    if !matches!(
                        repository_type,
                        RepositoryType::Application | RepositoryType::Schema
                    ) {
                        return Err(StorageError::InvalidRepositoryType {
                            requested: repository_type,
                            context: "system",
                        }
                        .into());
                    }
                    system_tenant()
                }
            },
            Authority::Application | Authority::Reader => {
                Self::check_tenant_repository_type(repository_type)?;
                auth.tenant()
                    .ok_or(SecurityError::Unauthorized {
                        required: Authority::Reader,
                    })?
                    .clone()
            }
            Authority::None => {
                return Err(SecurityError::Unauthorized {
                    required: Authority::Reader,
                }
                .into())
            }
        };

        let label = RepositoryLabel::new(repository_type, &tenant.key, None);
        let builder = Arc::clone(&self.builder);
        let handle = self
            .cache
            .acquire(&label, move || builder.build(repository_type, &tenant, None))
            .await?;
        self.cache.validate(&handle)?;
        Ok(handle)
    }

    fn check_tenant_repository_type(repository_type: RepositoryType) -> Result<(), StorageError> {
        if matches!(
            repository_type,
            RepositoryType::Entities | RepositoryType::Transactions | RepositoryType::Schema
        ) {
            Ok(())
        } else {
            Err(StorageError::InvalidRepositoryType {
                requested: repository_type,
                context: "tenant",
            })
        }
    }

    fn require(&self, auth: &ResolvedAuthority, required: Authority) -> Result<(), SecurityError> {
        if auth.satisfies(required) {
            Ok(())
        } else {
            Err(SecurityError::Unauthorized { required })
        }
    }

    fn entity_identifier(&self, key: &str) -> Iri {
        Iri::new(format!("{}{}", self.entity_namespace, key))
    }
}

/// The tenant-less system scope backing the shared repositories.
fn system_tenant() -> Tenant {
    Tenant::new(
        "system",
        "system",
        TenantFlags {
            persistent: true,
            public: false,
            active: true,
        },
    )
}
