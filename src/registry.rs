//! Tenant registry collaborator
//!
//! The registry resolves tenant labels and subscription keys to records.
//! It is read-only from this crate's perspective: administrative creation
//! and mutation happen elsewhere. Lookups are async because production
//! registries sit behind storage of their own.

use crate::model::{Subscription, Tenant};
use async_trait::async_trait;
use dashmap::DashMap;

/// Read contract against the tenant registry.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Resolve a tenant by its label (case-insensitive).
    async fn find_tenant_by_label(&self, label: &str) -> Option<Tenant>;

    /// Resolve a subscription by its opaque API key.
    async fn find_subscription_by_key(&self, key: &str) -> Option<Subscription>;

    /// All known tenants, for background maintenance.
    async fn list_tenants(&self) -> Vec<Tenant>;
}

/// In-process registry, used for wiring and tests.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    /// Tenants keyed by lower-cased label
    tenants: DashMap<String, Tenant>,
    subscriptions: DashMap<String, Subscription>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tenant(&self, tenant: Tenant) {
        self.tenants.insert(tenant.label.to_lowercase(), tenant);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.subscriptions
            .insert(subscription.key.clone(), subscription);
    }
}

#[async_trait]
impl TenantRegistry for InMemoryRegistry {
    async fn find_tenant_by_label(&self, label: &str) -> Option<Tenant> {
        self.tenants
            .get(&label.to_lowercase())
            .map(|t| t.value().clone())
    }

    async fn find_subscription_by_key(&self, key: &str) -> Option<Subscription> {
        self.subscriptions.get(key).map(|s| s.value().clone())
    }

    async fn list_tenants(&self) -> Vec<Tenant> {
        self.tenants.iter().map(|t| t.value().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TenantFlags;

    fn tenant(label: &str) -> Tenant {
        Tenant::new(
            label,
            format!("key-{}", label.to_lowercase()),
            TenantFlags {
                persistent: false,
                public: false,
                active: true,
            },
        )
    }

    // === Scenario: label lookup is case-insensitive ===
    #[tokio::test]
    async fn find_tenant_ignores_label_case() {
        let registry = InMemoryRegistry::new();
        registry.insert_tenant(tenant("Acme"));

        assert!(registry.find_tenant_by_label("acme").await.is_some());
        assert!(registry.find_tenant_by_label("ACME").await.is_some());
        assert!(registry.find_tenant_by_label("other").await.is_none());
    }

    // === Scenario: subscriptions resolve by exact key ===
    #[tokio::test]
    async fn find_subscription_by_exact_key() {
        let registry = InMemoryRegistry::new();
        registry.insert_subscription(Subscription::new("k1", tenant("acme"), true));

        assert!(registry.find_subscription_by_key("k1").await.is_some());
        assert!(registry.find_subscription_by_key("K1").await.is_none());
    }

    // === Scenario: list covers every registered tenant ===
    #[tokio::test]
    async fn list_tenants_is_complete() {
        let registry = InMemoryRegistry::new();
        registry.insert_tenant(tenant("a"));
        registry.insert_tenant(tenant("b"));

        assert_eq!(registry.list_tenants().await.len(), 2);
    }
}
