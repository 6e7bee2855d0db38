//! Tenant and subscription records
//!
//! Loaded from the tenant registry and immutable for the duration of a
//! request. Administrative creation and mutation live outside this crate.

use serde::{Deserialize, Serialize};

/// Visibility and storage flags attached to a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TenantFlags {
    /// Tenant data survives restarts (on-disk engine) when set.
    pub persistent: bool,
    /// Read access may be granted to holders of foreign subscriptions.
    pub public: bool,
    /// Inactive tenants resolve like private ones.
    pub active: bool,
}

/// An isolated logical owner of one storage instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique label, compared case-insensitively
    pub label: String,
    /// Stable internal id, feeds repository labels and storage paths
    pub key: String,
    pub flags: TenantFlags,
}

impl Tenant {
    pub fn new(label: impl Into<String>, key: impl Into<String>, flags: TenantFlags) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
            flags,
        }
    }

    /// Label comparison is case-insensitive everywhere.
    pub fn matches_label(&self, label: &str) -> bool {
        self.label.eq_ignore_ascii_case(label)
    }
}

/// An API key bound to exactly one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// The opaque API key presented in the request header
    pub key: String,
    /// The owning tenant
    pub tenant: Tenant,
    pub active: bool,
}

impl Subscription {
    pub fn new(key: impl Into<String>, tenant: Tenant, active: bool) -> Self {
        Self {
            key: key.into(),
            tenant,
            active,
        }
    }
}
