//! Tenant/authority resolution layer
//!
//! Maps inbound request credentials plus the request path to an immutable
//! per-request [`ResolvedAuthority`].

mod authority;
mod resolver;

pub use authority::{Authority, InboundAuth, ResolvedAuthority};
pub use resolver::{AuthorityResolver, SecurityError, SUBSCRIPTION_KEY_HEADER};
