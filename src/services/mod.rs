//! Service layer for the pipeline handler.
//!
//! - Change event classification (`EventClassifier`)
//! - Pipeline descriptor assembly (`PipelineDefinitionBuilder`)

mod classifier;
mod definition;

pub use classifier::{Decision, EventClassifier, IgnoreReason, NoOpReason, Outcome, decide};
pub use definition::PipelineDefinitionBuilder;
