// src/lambda/mod.rs

//! AWS Lambda glue for the pipeline handler.
//!
//! The classifier (and the CodePipeline client inside it) is built once per
//! cold start and shared by every invocation of the warm container.

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::Result;
use crate::handler::{HandlerResponse, process_event};
use crate::models::Config;
use crate::registry::{CodePipelineRegistry, PipelineRegistry};
use crate::services::EventClassifier;

/// Build the classifier from the process environment.
pub async fn build_classifier() -> Result<EventClassifier<CodePipelineRegistry>> {
    let config = Config::from_env()?;
    let registry = CodePipelineRegistry::from_env().await;
    Ok(EventClassifier::new(registry, &config))
}

/// Main Lambda handler function.
#[instrument(skip_all, fields(request_id = %event.context.request_id))]
pub async fn handler<R: PipelineRegistry>(
    classifier: &EventClassifier<R>,
    event: LambdaEvent<Value>,
) -> std::result::Result<HandlerResponse, LambdaError> {
    let (payload, _context) = event.into_parts();
    info!("Handling event: {}", payload);

    Ok(process_event(classifier, payload).await)
}
