//! Authorities and resolved authentications
//!
//! A request enters with an inbound authentication and leaves resolution
//! with an immutable [`ResolvedAuthority`]: the tenant binding (if any),
//! the matched subscription (if any) and the granted authority level.
//! Resolution constructs a new value per step; nothing is mutated in place.

use crate::model::{Subscription, Tenant};

/// Granted access level, ordered from nothing to full trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Authority {
    None,
    Reader,
    Application,
    System,
}

impl Authority {
    /// True if this level covers the required one.
    pub fn satisfies(self, required: Authority) -> bool {
        self >= required
    }
}

/// The authentication a request arrives with, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAuth {
    /// No credentials at all
    Anonymous,
    /// An opaque subscription key from the request header
    ApiKey(String),
    /// Pre-verified system/admin credentials
    System,
}

impl InboundAuth {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(key.into())
    }
}

/// The outcome of tenant/authority resolution for one request.
#[derive(Debug, Clone)]
pub struct ResolvedAuthority {
    inbound: InboundAuth,
    tenant: Option<Tenant>,
    subscription: Option<Subscription>,
    authority: Authority,
    authenticated: bool,
}

impl ResolvedAuthority {
    /// Carry the inbound authentication through unchanged: system keeps
    /// full trust, everyone else stays ungranted and unauthenticated.
    pub fn passthrough(inbound: InboundAuth) -> Self {
        let (authority, authenticated) = match inbound {
            InboundAuth::System => (Authority::System, true),
            _ => (Authority::None, false),
        };
        Self {
            inbound,
            tenant: None,
            subscription: None,
            authority,
            authenticated,
        }
    }

    /// A system authentication bound to an explicitly requested tenant,
    /// with no downgrade.
    pub fn system_scoped(tenant: Tenant) -> Self {
        Self {
            inbound: InboundAuth::System,
            tenant: Some(tenant),
            subscription: None,
            authority: Authority::System,
            authenticated: true,
        }
    }

    /// A subscription granted the given authority against a target tenant.
    pub fn granted(
        inbound: InboundAuth,
        subscription: Subscription,
        tenant: Tenant,
        authority: Authority,
        authenticated: bool,
    ) -> Self {
        Self {
            inbound,
            tenant: Some(tenant),
            subscription: Some(subscription),
            authority,
            authenticated,
        }
    }

    /// A known subscription stripped of all authority.
    pub fn purged(inbound: InboundAuth, subscription: Subscription, tenant: Tenant) -> Self {
        Self {
            inbound,
            tenant: Some(tenant),
            subscription: Some(subscription),
            authority: Authority::None,
            authenticated: false,
        }
    }

    pub fn inbound(&self) -> &InboundAuth {
        &self.inbound
    }

    pub fn tenant(&self) -> Option<&Tenant> {
        self.tenant.as_ref()
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn satisfies(&self, required: Authority) -> bool {
        self.authority.satisfies(required)
    }
}
