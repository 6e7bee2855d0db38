//! Ingest pipeline
//!
//! An ordered sequence of independently togglable stages. Stages run
//! strictly sequentially; the first failure short-circuits the rest and
//! surfaces to the caller. If every stage passes, the final fragment is
//! what storage receives.

use super::assign_identifiers::AssignIdentifiers;
use super::require_type::RequireType;
use super::stage::{PipelineError, Stage};
use crate::config::PipelineConfig;
use crate::model::GraphFragment;
use std::sync::Arc;
use tracing::trace;

/// The configured validation/transformation pipeline.
#[derive(Debug, Clone, Default)]
pub struct IngestPipeline {
    stages: Vec<Stage>,
}

impl IngestPipeline {
    /// An empty pipeline: every fragment passes unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Assemble the stage list once from configuration.
    pub fn from_config(cfg: &PipelineConfig, entity_namespace: &str) -> Self {
        let mut pipeline = Self::new();
        if cfg.check_required_type {
            pipeline = pipeline.with_stage(Stage::Validate(Arc::new(RequireType)));
        }
        if cfg.assign_identifiers {
            pipeline = pipeline.with_stage(Stage::Transform(Arc::new(AssignIdentifiers::new(
                entity_namespace,
            ))));
        }
        pipeline
    }

    /// Run the fragment through every stage in configured order.
    pub async fn apply(&self, mut fragment: GraphFragment) -> Result<GraphFragment, PipelineError> {
        for stage in &self.stages {
            trace!(stage = stage.id(), "running pipeline stage");
            match stage {
                Stage::Validate(validator) => validator.validate(&fragment).await?,
                Stage::Transform(transformer) => {
                    fragment = transformer.transform(fragment).await?;
                }
            }
        }
        Ok(fragment)
    }

    pub fn stage_ids(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::id).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
