//! Identifier-assigning transformer
//!
//! Rewrites externally supplied subject identifiers to stable generated
//! keys under the local entity namespace, so entities keep the same name
//! no matter which alias they were submitted under. Subjects already in
//! the local namespace are left alone, which makes the rewrite idempotent.

use super::stage::{FragmentTransformer, PipelineError};
use crate::ident::EntityKey;
use crate::model::{GraphFragment, Iri};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::trace;

pub struct AssignIdentifiers {
    namespace: String,
}

impl AssignIdentifiers {
    /// `namespace` is the local entity namespace generated keys live under.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn local_identifier(&self, external: &Iri) -> Iri {
        let (namespace, local_name) = external.split();
        let key = EntityKey::from_identifier(namespace, local_name);
        Iri::new(format!("{}{}", self.namespace, key))
    }
}

#[async_trait]
impl FragmentTransformer for AssignIdentifiers {
    fn id(&self) -> &str {
        "assign-identifiers"
    }

    async fn transform(&self, fragment: GraphFragment) -> Result<GraphFragment, PipelineError> {
        let mapping: HashMap<Iri, Iri> = fragment
            .subjects()
            .into_iter()
            .filter(|subject| !subject.in_namespace(&self.namespace))
            .map(|subject| (subject.clone(), self.local_identifier(subject)))
            .collect();

        if mapping.is_empty() {
            return Ok(fragment);
        }

        trace!(rewritten = mapping.len(), "assigning local entity identifiers");
        Ok(fragment.rewrite_subjects(&mapping))
    }
}
