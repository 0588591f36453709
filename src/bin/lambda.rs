//! AWS Lambda entry point for the branch pipeline handler.
//!
//! Deploy with `cargo lambda build --release --features lambda`
//! and subscribe the function to the repository's CodeCommit trigger.

use lambda_runtime::{Error as LambdaError, service_fn};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use branch_pipelines::lambda::{build_classifier, handler};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Branch pipeline handler starting...");

    let classifier = build_classifier().await?;
    let classifier = &classifier;

    lambda_runtime::run(service_fn(move |event| async move {
        handler(classifier, event).await
    }))
    .await
}
