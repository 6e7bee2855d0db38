//! Required-type validator
//!
//! Every subject in an inbound fragment must declare a type; fragments
//! describing typeless subjects are rejected before they reach storage.

use super::stage::{FragmentValidator, PipelineError};
use crate::model::GraphFragment;
use async_trait::async_trait;
use tracing::{error, trace};

pub struct RequireType;

#[async_trait]
impl FragmentValidator for RequireType {
    fn id(&self) -> &str {
        "require-type"
    }

    async fn validate(&self, fragment: &GraphFragment) -> Result<(), PipelineError> {
        trace!("checking that every subject declares a type");
        for subject in fragment.subjects() {
            if !fragment.has_type(subject) {
                error!(subject = %subject, "subject is missing a type statement");
                return Err(PipelineError::MissingType(subject.clone()));
            }
        }
        Ok(())
    }
}
