//! Pipeline stage contracts
//!
//! A stage is either a validator (inspects, never mutates) or a
//! transformer (produces a new fragment, idempotent on its own output).
//! Stages are assembled once from configuration at startup.

use crate::model::{GraphFragment, Iri};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Typed validation/transformation failures. These are caller-correctable
/// conditions and surface unmodified.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A subject carries no type statement
    #[error("missing type definition for subject '{0}'")]
    MissingType(Iri),

    /// A stage failed for a reason of its own
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}

/// Inspects a fragment and either lets it pass or fails with a typed
/// validation error. Must not mutate its input.
#[async_trait]
pub trait FragmentValidator: Send + Sync {
    /// Stable identifier, used in logs and stage listings.
    fn id(&self) -> &str;

    async fn validate(&self, fragment: &GraphFragment) -> Result<(), PipelineError>;
}

/// Produces a rewritten or enriched fragment.
///
/// Transformers must be idempotent: re-running one on its own output
/// yields that output again.
#[async_trait]
pub trait FragmentTransformer: Send + Sync {
    /// Stable identifier, used in logs and stage listings.
    fn id(&self) -> &str;

    async fn transform(&self, fragment: GraphFragment) -> Result<GraphFragment, PipelineError>;
}

/// One configured pipeline stage.
#[derive(Clone)]
pub enum Stage {
    Validate(Arc<dyn FragmentValidator>),
    Transform(Arc<dyn FragmentTransformer>),
}

impl Stage {
    pub fn id(&self) -> &str {
        match self {
            Self::Validate(v) => v.id(),
            Self::Transform(t) => t.id(),
        }
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validate(v) => write!(f, "Validate({})", v.id()),
            Self::Transform(t) => write!(f, "Transform({})", t.id()),
        }
    }
}
