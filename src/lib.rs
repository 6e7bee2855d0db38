//! Warren: Multi-Tenant Graph Storage Front
//!
//! Warren fronts an embedded graph-statement engine with multi-tenant
//! isolation: every tenant gets its own storage instance, requests are
//! resolved to the correct tenant and authority level before touching
//! data, and inbound graph fragments pass through a validation and
//! transformation pipeline before they are persisted.
//!
//! # Core Concepts
//!
//! - **Tenants**: isolated owners of one storage instance each, resolved
//!   from request scope and subscription keys
//! - **Repository cache**: single-flight, weight-bounded lifecycle manager
//!   for the per-tenant engine handles
//! - **Entity keys**: deterministic, content-derived identifiers stable
//!   across tenants
//! - **Ingest pipeline**: ordered, togglable validators and transformers
//!   in front of every write
//!
//! # Example
//!
//! ```
//! use warren::{AuthorityResolver, InMemoryRegistry};
//! use std::sync::Arc;
//!
//! let resolver = AuthorityResolver::new(Arc::new(InMemoryRegistry::new()));
//! // Resolver is ready for use
//! ```

pub mod config;
pub mod ident;
mod model;
pub mod pipeline;
mod registry;
pub mod security;
pub mod service;
pub mod store;

pub use config::{CacheSettings, Config, PipelineConfig, StorageConfig};
pub use ident::{EntityKey, KEY_LENGTH};
pub use model::{
    vocab, Activity, GraphFragment, Iri, ObjectTerm, Statement, Subscription, Tenant, TenantFlags,
    Transaction,
};
pub use pipeline::{IngestPipeline, PipelineError};
pub use registry::{InMemoryRegistry, TenantRegistry};
pub use security::{
    Authority, AuthorityResolver, InboundAuth, ResolvedAuthority, SecurityError,
    SUBSCRIPTION_KEY_HEADER,
};
pub use service::{EntityService, ServiceError, ServiceResult};
pub use store::{
    CacheConfig, OpenEngine, RepositoryBuilder, RepositoryCache, RepositoryConnection,
    RepositoryHandle, RepositoryKind, RepositoryLabel, RepositoryType, SqliteEngine,
    StorageEngine, StorageError, StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
