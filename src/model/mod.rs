//! Shared data model
//!
//! Value types passed between the resolver, the repository layer and the
//! ingestion pipeline. Everything here is immutable once constructed.

mod fragment;
mod tenant;
mod transaction;

pub use fragment::{vocab, GraphFragment, Iri, ObjectTerm, Statement};
pub use tenant::{Subscription, Tenant, TenantFlags};
pub use transaction::{Activity, Transaction};
