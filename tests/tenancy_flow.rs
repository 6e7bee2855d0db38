//! End-to-end tenancy flows: resolve → acquire → ingest → store.

use std::sync::Arc;
use warren::{
    vocab, Authority, AuthorityResolver, Config, EntityService, GraphFragment, InMemoryRegistry,
    InboundAuth, IngestPipeline, Iri, ObjectTerm, RepositoryBuilder, RepositoryCache,
    RepositoryKind, RepositoryLabel, RepositoryType, ResolvedAuthority, SecurityError,
    ServiceError, Statement, Subscription, Tenant, TenantFlags, TenantRegistry,
};

struct Harness {
    resolver: AuthorityResolver,
    service: EntityService,
    cache: Arc<RepositoryCache>,
    registry: Arc<InMemoryRegistry>,
}

fn tenant(label: &str, public: bool, persistent: bool) -> Tenant {
    Tenant::new(
        label,
        format!("key-{label}"),
        TenantFlags {
            persistent,
            public,
            active: true,
        },
    )
}

fn harness(storage_path: Option<std::path::PathBuf>) -> Harness {
    let registry = Arc::new(InMemoryRegistry::new());
    registry.insert_tenant(tenant("acme", false, storage_path.is_some()));
    registry.insert_tenant(tenant("pub-demo", true, false));
    registry.insert_tenant(tenant("priv-demo", false, false));
    registry.insert_subscription(Subscription::new(
        "K1",
        tenant("acme", false, storage_path.is_some()),
        true,
    ));

    let config = Config::default();
    let cache = Arc::new(RepositoryCache::new(config.cache.to_cache_config()));
    let builder = Arc::new(RepositoryBuilder::new(storage_path));
    let pipeline = Arc::new(IngestPipeline::from_config(
        &config.pipeline,
        &config.storage.entity_namespace,
    ));

    Harness {
        resolver: AuthorityResolver::new(registry.clone() as Arc<dyn TenantRegistry>),
        service: EntityService::new(
            Arc::clone(&cache),
            builder,
            pipeline,
            config.storage.entity_namespace.clone(),
        ),
        cache,
        registry,
    }
}

fn widget_fragment(subject: &str) -> GraphFragment {
    let subject = Iri::new(subject);
    GraphFragment::new(subject.clone())
        .with_statement(Statement::new(
            subject.clone(),
            Iri::new(vocab::TYPE),
            ObjectTerm::iri("http://example.org/vocab/Widget"),
        ))
        .with_statement(Statement::new(
            subject,
            Iri::new("http://example.org/vocab/label"),
            ObjectTerm::literal_with_language("das Dings", "de"),
        ))
        .with_namespace("ex", "http://example.org/vocab/")
}

async fn resolve(harness: &Harness, key: &str, path: &str) -> ResolvedAuthority {
    harness
        .resolver
        .resolve(InboundAuth::api_key(key), path)
        .await
        .expect("resolution should not fail")
}

// === Scenario: key K1 against its own tenant scope writes and reads ===
#[tokio::test]
async fn own_tenant_scope_full_flow() {
    let harness = harness(None);

    let auth = resolve(&harness, "K1", "/sc/acme/entities/x").await;
    assert_eq!(auth.authority(), Authority::Application);

    let tx = harness
        .service
        .create_entity(&auth, widget_fragment("http://example.org/widgets/w1"))
        .await
        .unwrap();
    let subject = tx.affected_subjects().into_iter().next().unwrap().clone();
    let key = subject
        .as_str()
        .strip_prefix("urn:warren:entities:")
        .unwrap();

    let entity = harness.service.read_entity(&auth, key).await.unwrap();
    assert_eq!(entity.len(), 2);

    // the handle landed in the cache under the derived label
    let label = RepositoryLabel::new(RepositoryType::Entities, "key-acme", None);
    assert!(harness.cache.contains(&label));
}

// === Scenario: the same key against a foreign public tenant reads only ===
#[tokio::test]
async fn foreign_public_tenant_is_read_only() {
    let harness = harness(None);

    let auth = resolve(&harness, "K1", "/sc/pub-demo/entities/x").await;
    assert_eq!(auth.authority(), Authority::Reader);
    assert!(auth.is_authenticated());

    // reading an absent entity is a not-found, not a permission error
    assert!(matches!(
        harness.service.read_entity(&auth, "absentkey12").await,
        Err(ServiceError::EntityNotFound(_))
    ));

    // writing is rejected
    assert!(matches!(
        harness
            .service
            .create_entity(&auth, widget_fragment("http://example.org/widgets/w1"))
            .await,
        Err(ServiceError::Security(SecurityError::Unauthorized { .. }))
    ));
}

// === Scenario: the same key against a foreign private tenant gets nothing ===
#[tokio::test]
async fn foreign_private_tenant_rejects_uniformly() {
    let harness = harness(None);

    let auth = resolve(&harness, "K1", "/sc/priv-demo/entities/x").await;
    assert_eq!(auth.authority(), Authority::None);
    assert!(!auth.is_authenticated());

    // the rejection does not reveal whether anything exists
    assert!(matches!(
        harness.service.read_entity(&auth, "absentkey12").await,
        Err(ServiceError::Security(SecurityError::Unauthorized { .. }))
    ));
}

// === Scenario: a malformed scope path fails resolution ===
#[tokio::test]
async fn malformed_scope_path_is_invalid() {
    let harness = harness(None);
    let result = harness
        .resolver
        .resolve(InboundAuth::api_key("K1"), "/api/sc")
        .await;
    assert!(matches!(result, Err(SecurityError::InvalidRequest(_))));
}

// === Scenario: sequential acquires share one handle and count uses ===
#[tokio::test]
async fn sequential_acquires_share_handle() {
    let harness = harness(None);
    let auth = resolve(&harness, "K1", "/sc/acme/entities").await;

    // two sequential logical uses of the same tenant repository
    harness
        .service
        .create_entity(&auth, widget_fragment("http://example.org/widgets/w1"))
        .await
        .unwrap();
    harness
        .service
        .create_entity(&auth, widget_fragment("http://example.org/widgets/w2"))
        .await
        .unwrap();

    let label = RepositoryLabel::new(RepositoryType::Entities, "key-acme", None);
    assert!(harness.cache.contains(&label));
    assert_eq!(harness.cache.len(), 1);
}

// === Scenario: persistent tenants keep data across invalidation ===
#[tokio::test]
async fn persistent_tenant_survives_invalidation() {
    let dir = tempfile::tempdir().unwrap();
    let harness = harness(Some(dir.path().to_path_buf()));

    let auth = resolve(&harness, "K1", "/sc/acme/entities").await;
    let tx = harness
        .service
        .create_entity(&auth, widget_fragment("http://example.org/widgets/w1"))
        .await
        .unwrap();
    let subject = tx.affected_subjects().into_iter().next().unwrap().clone();
    let key = subject
        .as_str()
        .strip_prefix("urn:warren:entities:")
        .unwrap();

    // drop the tenant's handle; the next access reopens from disk
    let label = RepositoryLabel::new(RepositoryType::Entities, "key-acme", None);
    harness.cache.invalidate(&label);
    assert!(!harness.cache.contains(&label));

    let entity = harness.service.read_entity(&auth, key).await.unwrap();
    assert_eq!(entity.len(), 2);
}

// === Scenario: registry changes take effect on the next resolution ===
#[tokio::test]
async fn deactivated_subscription_downgrades() {
    let harness = harness(None);

    // same key, now inactive; its own tenant is private
    harness
        .registry
        .insert_subscription(Subscription::new("K1", tenant("acme", false, false), false));

    let auth = resolve(&harness, "K1", "/sc/acme/entities").await;
    assert_eq!(auth.authority(), Authority::None);
    assert!(!auth.is_authenticated());
}

// === Scenario: anonymous requests pass through and are rejected downstream ===
#[tokio::test]
async fn anonymous_flow() {
    let harness = harness(None);
    let auth = harness
        .resolver
        .resolve(InboundAuth::Anonymous, "/sc/pub-demo/entities")
        .await
        .unwrap();

    assert_eq!(auth.authority(), Authority::None);
    assert!(matches!(
        harness.service.read_entity(&auth, "anykey12345").await,
        Err(ServiceError::Security(SecurityError::Unauthorized { .. }))
    ));
}

// === Scenario: volatile handles really are volatile ===
#[tokio::test]
async fn volatile_tenant_loses_data_on_invalidation() {
    let harness = harness(None);
    let auth = resolve(&harness, "K1", "/sc/acme/entities").await;

    let tx = harness
        .service
        .create_entity(&auth, widget_fragment("http://example.org/widgets/w1"))
        .await
        .unwrap();
    let subject = tx.affected_subjects().into_iter().next().unwrap().clone();
    let key = subject
        .as_str()
        .strip_prefix("urn:warren:entities:")
        .unwrap();

    let label = RepositoryLabel::new(RepositoryType::Entities, "key-acme", None);
    harness.cache.invalidate(&label);

    // a fresh in-memory engine has no trace of the entity
    assert!(matches!(
        harness.service.read_entity(&auth, key).await,
        Err(ServiceError::EntityNotFound(_))
    ));
}

// === Scenario: the builder's fallback is observable end to end ===
#[tokio::test]
async fn unwritable_storage_degrades_to_volatile() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("base");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let builder = RepositoryBuilder::new(Some(blocker));
    let handle = builder
        .build(
            RepositoryType::Entities,
            &tenant("acme", false, true),
            None,
        )
        .unwrap();
    assert_eq!(handle.kind(), RepositoryKind::Volatile);
}

// === Scenario: full teardown closes every tenant's engine ===
#[tokio::test]
async fn shutdown_closes_all_tenants() {
    let harness = harness(None);

    for path in ["/sc/acme/entities", "/sc/pub-demo/entities"] {
        let auth = resolve(&harness, "K1", path).await;
        // pub-demo only grants read; reading is enough to open the handle
        let _ = harness.service.read_entity(&auth, "warmupkey12").await;
    }
    assert!(harness.cache.len() >= 1);

    harness.cache.shutdown();
    assert!(harness.cache.is_empty());
}
