//! Branch pipeline CLI
//!
//! Local tooling for previewing pipeline names and descriptors and for
//! replaying trigger payloads. For AWS Lambda, use `branch-pipelines-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use branch_pipelines::{
    error::{AppError, Result},
    handler::process_event,
    models::{Config, RefName},
    registry::{InMemoryRegistry, RegistryCall},
    services::{EventClassifier, PipelineDefinitionBuilder},
};

/// Per-branch CodePipeline manager
#[derive(Parser, Debug)]
#[command(
    name = "branch-pipelines",
    version,
    about = "Creates and tears down per-branch pipelines"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "branch-pipelines.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the pipeline name a reference maps to
    Name {
        /// Repository name or CodeCommit repository ARN
        #[arg(long)]
        repository: String,

        /// Full reference path, e.g. refs/heads/feature/login
        #[arg(long = "ref")]
        reference: String,
    },

    /// Print the pipeline descriptor that would be created for a branch
    Definition {
        /// Repository name or CodeCommit repository ARN
        #[arg(long)]
        repository: String,

        #[arg(long)]
        branch: String,
    },

    /// Replay a trigger payload against an in-memory registry
    Plan {
        /// Path to a CodeCommit trigger payload (JSON)
        #[arg(long)]
        event: PathBuf,

        /// Pipelines assumed to exist already (repeatable)
        #[arg(long)]
        existing: Vec<String>,
    },

    /// Process a trigger payload against the live CodePipeline API
    #[cfg(feature = "aws")]
    Apply {
        /// Path to a CodeCommit trigger payload (JSON)
        #[arg(long)]
        event: PathBuf,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Repository name from either a bare name or an ARN.
fn repository_name(value: &str) -> &str {
    value.rsplit(':').next().unwrap_or(value)
}

async fn read_payload(path: &PathBuf) -> Result<Value> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env_overrides()?;

    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Name {
            repository,
            reference,
        } => {
            let repository = repository_name(&repository);
            match RefName::parse(&reference) {
                RefName::Branch(branch) if config.branches.is_protected(&branch) => {
                    log::warn!("`{}` is protected and never managed", branch);
                }
                RefName::Branch(branch) => {
                    let classifier = EventClassifier::new(InMemoryRegistry::new(), &config);
                    println!("{}", classifier.pipeline_name(repository, &branch));
                }
                other => {
                    log::warn!("`{}` is not a branch reference", other);
                }
            }
        }

        Command::Definition { repository, branch } => {
            config.validate()?;

            let repository = repository_name(&repository);
            let classifier = EventClassifier::new(InMemoryRegistry::new(), &config);
            let name = classifier.pipeline_name(repository, &branch);
            let definition =
                PipelineDefinitionBuilder::new(config.pipeline.clone()).build(&branch, repository, &name);

            println!("{}", serde_json::to_string_pretty(&definition)?);
        }

        Command::Plan { event, existing } => {
            config.validate()?;

            let payload = read_payload(&event).await?;
            let classifier =
                EventClassifier::new(InMemoryRegistry::with_pipelines(existing), &config);
            let response = process_event(&classifier, payload).await;

            println!("{}", serde_json::to_string_pretty(&response)?);

            for call in classifier.registry().mutations() {
                match call {
                    RegistryCall::Create(definition) => {
                        log::info!("Would create pipeline {}", definition.name);
                        log::debug!("{}", serde_json::to_string_pretty(&definition)?);
                    }
                    RegistryCall::Delete(name) => log::info!("Would delete pipeline {}", name),
                    RegistryCall::List => {}
                }
            }

            if !response.success {
                return Err(AppError::validation("payload did not process cleanly"));
            }
        }

        #[cfg(feature = "aws")]
        Command::Apply { event } => {
            config.validate()?;

            let payload = read_payload(&event).await?;
            let registry = branch_pipelines::registry::CodePipelineRegistry::from_env().await;
            let classifier = EventClassifier::new(registry, &config);
            let response = process_event(&classifier, payload).await;

            println!("{}", serde_json::to_string_pretty(&response)?);

            if !response.success {
                return Err(AppError::validation("payload did not process cleanly"));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK (protected branches: {:?})",
                config.branches.protected
            );
        }
    }

    Ok(())
}
