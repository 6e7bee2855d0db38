//! Ingestion pipeline
//!
//! Inbound graph fragments pass through an ordered list of validators and
//! transformers before they are persisted. The stage list is built once
//! from configuration at startup.

mod assign_identifiers;
mod ingest;
mod require_type;
mod stage;

pub use assign_identifiers::AssignIdentifiers;
pub use ingest::IngestPipeline;
pub use require_type::RequireType;
pub use stage::{FragmentTransformer, FragmentValidator, PipelineError, Stage};
