// src/handler.rs

//! Trigger payload processing.
//!
//! Parses a raw CodeCommit trigger payload, runs every reference of every
//! record through the classifier independently, and summarizes the result.
//! Independent of the Lambda runtime so the CLI and tests can drive it.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::models::{CodeCommitEvent, CodeCommitRecord};
use crate::registry::PipelineRegistry;
use crate::services::{EventClassifier, Outcome};

/// Summary returned to the invoker.
#[derive(Debug, Default, Serialize)]
pub struct HandlerResponse {
    /// False when the payload could not be parsed or any outcome is an error
    pub success: bool,

    /// Number of references classified
    pub processed: usize,

    /// Per-reference outcomes, in delivery order
    pub outcomes: Vec<Outcome>,

    /// Records that could not be processed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl HandlerResponse {
    pub fn mutations(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_mutation()).count()
    }
}

/// Process one trigger payload.
pub async fn process_event<R: PipelineRegistry>(
    classifier: &EventClassifier<R>,
    payload: Value,
) -> HandlerResponse {
    let start = Instant::now();

    let event = match CodeCommitEvent::from_value(payload) {
        Ok(event) => event,
        Err(e) => {
            error!("Rejecting payload: {}", e);
            return HandlerResponse {
                success: false,
                errors: vec![e.to_string()],
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            };
        }
    };

    if event.records.is_empty() {
        warn!("Payload carries no records");
    }

    let mut response = HandlerResponse::default();
    for (index, raw) in event.records.into_iter().enumerate() {
        let record = match CodeCommitRecord::from_value(raw) {
            Ok(record) => record,
            Err(e) => {
                error!("Skipping record {}: {}", index, e);
                response.errors.push(format!("record {}: {}", index, e));
                continue;
            }
        };

        let changes = match record.change_events() {
            Ok(changes) => changes,
            Err(e) => {
                error!("Skipping record {}: {}", index, e);
                response.errors.push(format!("record {}: {}", index, e));
                continue;
            }
        };

        info!(
            "Record {} [{}] from trigger {} in {}: {} on {} ({} references)",
            index,
            record.event_id.as_deref().unwrap_or("-"),
            record.event_trigger_name.as_deref().unwrap_or("-"),
            record.aws_region.as_deref().unwrap_or("-"),
            record.event_name,
            record.event_source_arn,
            changes.len()
        );

        for change in &changes {
            let outcome = classifier.classify_and_act(change).await;
            response.processed += 1;
            response.outcomes.push(outcome);
        }
    }

    response.success =
        response.errors.is_empty() && !response.outcomes.iter().any(Outcome::is_error);
    response.execution_time_ms = start.elapsed().as_millis() as u64;

    info!(
        "Processed {} references, {} mutations in {}ms",
        response.processed,
        response.mutations(),
        response.execution_time_ms
    );
    response
}
