//! Tenant/authority resolution
//!
//! Per request, determines which tenant's storage applies and what access
//! level the inbound credentials support. Pure with respect to process
//! state except for reads against the tenant registry; never escalates an
//! anonymous caller, never grants more than the evidence supports.

use super::authority::{Authority, InboundAuth, ResolvedAuthority};
use crate::model::{Subscription, Tenant};
use crate::registry::TenantRegistry;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Request header carrying the subscription key. Transport extraction is
/// the caller's job; the constant lives here so every edge agrees on it.
pub const SUBSCRIPTION_KEY_HEADER: &str = "X-SUBSCRIPTION-KEY";

/// Reserved path segment announcing an explicit tenant scope.
const SCOPE_MARKER: &str = "sc";

/// Errors surfaced by the security layer.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Malformed scope path (marker present, label missing)
    #[error("invalid request path '{0}': missing scope label")]
    InvalidRequest(String),

    /// Authenticated but without a grant for the requested operation.
    /// The message is deliberately uniform so private tenants are
    /// indistinguishable from absent ones.
    #[error("forbidden")]
    Unauthorized { required: Authority },
}

/// Resolves inbound authentications against the tenant registry.
pub struct AuthorityResolver {
    registry: Arc<dyn TenantRegistry>,
}

impl AuthorityResolver {
    pub fn new(registry: Arc<dyn TenantRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the inbound authentication for a request path.
    ///
    /// Returns a new immutable [`ResolvedAuthority`]; neither the inputs
    /// nor the registry are mutated.
    pub async fn resolve(
        &self,
        inbound: InboundAuth,
        path: &str,
    ) -> Result<ResolvedAuthority, SecurityError> {
        let requested_label = scope_from_path(path)?;

        match requested_label {
            Some(label) => {
                let Some(requested) = self.registry.find_tenant_by_label(&label).await else {
                    // Unknown labels resolve like private tenants: no
                    // binding, no escalation, nothing revealed.
                    debug!(%label, "requested tenant scope is unknown");
                    return Ok(ResolvedAuthority::passthrough(inbound));
                };

                match inbound {
                    InboundAuth::System => {
                        trace!(tenant = %requested.label, "system authority with explicit scope");
                        Ok(ResolvedAuthority::system_scoped(requested))
                    }
                    InboundAuth::ApiKey(key) => self.resolve_key_for_tenant(key, requested).await,
                    InboundAuth::Anonymous => Ok(ResolvedAuthority::passthrough(inbound)),
                }
            }
            None => match inbound {
                InboundAuth::System => {
                    trace!("system authority without tenant scope");
                    Ok(ResolvedAuthority::passthrough(inbound))
                }
                InboundAuth::ApiKey(key) => self.resolve_key(key).await,
                InboundAuth::Anonymous => {
                    trace!("anonymous access without tenant scope");
                    Ok(ResolvedAuthority::passthrough(inbound))
                }
            },
        }
    }

    /// No explicit scope: the subscription's own tenant is the target.
    async fn resolve_key(&self, key: String) -> Result<ResolvedAuthority, SecurityError> {
        match self.registry.find_subscription_by_key(&key).await {
            Some(subscription) => {
                let target = subscription.tenant.clone();
                Ok(grant(InboundAuth::ApiKey(key), subscription, target))
            }
            None => {
                trace!("unknown subscription key, passing through unauthenticated");
                Ok(ResolvedAuthority::passthrough(InboundAuth::ApiKey(key)))
            }
        }
    }

    /// Explicit scope: the requested tenant is the target; a foreign
    /// subscription only reaches it if the tenant is public.
    async fn resolve_key_for_tenant(
        &self,
        key: String,
        requested: Tenant,
    ) -> Result<ResolvedAuthority, SecurityError> {
        let Some(subscription) = self.registry.find_subscription_by_key(&key).await else {
            trace!("unknown subscription key, passing through unauthenticated");
            return Ok(ResolvedAuthority::passthrough(InboundAuth::ApiKey(key)));
        };

        let inbound = InboundAuth::ApiKey(key);
        if requested.matches_label(&subscription.tenant.label) {
            Ok(grant(inbound, subscription, requested))
        } else if requested.flags.public {
            trace!(
                subscription_tenant = %subscription.tenant.label,
                requested_tenant = %requested.label,
                "foreign key against public tenant, granting read access"
            );
            Ok(ResolvedAuthority::granted(
                inbound,
                subscription,
                requested,
                Authority::Reader,
                true,
            ))
        } else {
            debug!(
                subscription_tenant = %subscription.tenant.label,
                requested_tenant = %requested.label,
                "foreign key against private tenant, purging authorities"
            );
            Ok(ResolvedAuthority::purged(inbound, subscription, requested))
        }
    }
}

/// The active/public grant rule, applied whenever a subscription and a
/// target tenant are both known.
fn grant(inbound: InboundAuth, subscription: Subscription, target: Tenant) -> ResolvedAuthority {
    if subscription.active {
        trace!(tenant = %target.label, "active subscription, granting application authority");
        ResolvedAuthority::granted(inbound, subscription, target, Authority::Application, true)
    } else if target.flags.public {
        debug!(tenant = %target.label, "inactive subscription for public tenant, read-only");
        ResolvedAuthority::granted(inbound, subscription, target, Authority::Reader, true)
    } else {
        warn!(tenant = %target.label, "inactive subscription for private tenant");
        ResolvedAuthority::purged(inbound, subscription, target)
    }
}

/// Extract the tenant label following the reserved scope marker.
///
/// The marker as final segment is a malformed request; absence of the
/// marker means no explicit tenant was requested.
fn scope_from_path(path: &str) -> Result<Option<String>, SecurityError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for (i, segment) in segments.iter().enumerate() {
        if segment.eq_ignore_ascii_case(SCOPE_MARKER) {
            return match segments.get(i + 1) {
                Some(label) => Ok(Some((*label).to_string())),
                None => Err(SecurityError::InvalidRequest(path.to_string())),
            };
        }
    }
    Ok(None)
}
