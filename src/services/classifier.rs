//! Change event classifier.
//!
//! Maps one reference change to at most one pipeline service mutation:
//!
//! | reference                   | pipeline exists | action  |
//! |-----------------------------|-----------------|---------|
//! | tag / non-branch / protected | -              | ignore  |
//! | branch deleted              | yes             | delete  |
//! | branch deleted              | no              | none    |
//! | `ReferenceChanges`          | no              | create  |
//! | `ReferenceChanges`          | yes             | none    |
//!
//! Existence is always taken from a fresh registry listing, so replaying an
//! event after its first delivery took effect makes no further calls.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{error, info};

use crate::models::{BranchConfig, ChangeEvent, Config, EventKind, RefName};
use crate::naming::{AbbreviatedNamer, PipelineNamer};
use crate::registry::PipelineRegistry;
use crate::services::PipelineDefinitionBuilder;

/// Why an event was ignored before the registry was consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    Tag,
    NotABranch,
    ProtectedBranch,
}

/// Why no mutation was needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// Branch deleted but it never had a pipeline
    PipelineAbsent,
    /// Creation event for a branch whose pipeline already exists
    PipelineExists,
    /// Neither a deletion nor a reference change
    UnhandledEvent,
}

/// Pipeline service mutation selected for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create,
    Delete,
    NoOp(NoOpReason),
}

/// Decide what to do for `event` given whether its pipeline exists.
///
/// Deletion wins when a reference is both deleted and reported as changed.
pub fn decide(event: &ChangeEvent, pipeline_exists: bool) -> Decision {
    if event.deleted {
        if pipeline_exists {
            Decision::Delete
        } else {
            Decision::NoOp(NoOpReason::PipelineAbsent)
        }
    } else if event.kind == EventKind::ReferenceChanges {
        if pipeline_exists {
            Decision::NoOp(NoOpReason::PipelineExists)
        } else {
            Decision::Create
        }
    } else {
        Decision::NoOp(NoOpReason::UnhandledEvent)
    }
}

/// Result of classifying and acting on one change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Ignored {
        reference: String,
        reason: IgnoreReason,
    },
    Created {
        pipeline: String,
        branch: String,
    },
    Deleted {
        pipeline: String,
        branch: String,
    },
    Unchanged {
        pipeline: String,
        branch: String,
        reason: NoOpReason,
    },
    /// The live pipeline listing could not be retrieved; nothing was changed.
    RegistryUnavailable {
        pipeline: String,
        branch: String,
        error: String,
    },
    /// The selected mutation was rejected by the pipeline service.
    Failed {
        pipeline: String,
        branch: String,
        operation: String,
        error: String,
    },
}

impl Outcome {
    /// Whether a pipeline was created or deleted.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::Deleted { .. })
    }

    /// Whether this outcome should be surfaced as an error.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable { .. } | Self::Failed { .. }
        )
    }
}

/// Classifies change events and applies the resulting pipeline mutation.
///
/// Owns the registry handle and every piece of configuration it needs, so
/// one instance can be built at start-up and reused across invocations.
pub struct EventClassifier<R> {
    registry: R,
    branches: BranchConfig,
    namer: Box<dyn PipelineNamer>,
    definitions: PipelineDefinitionBuilder,
}

impl<R: PipelineRegistry> EventClassifier<R> {
    pub fn new(registry: R, config: &Config) -> Self {
        Self {
            registry,
            branches: config.branches.clone(),
            namer: Box::new(AbbreviatedNamer::new(config.naming.separator)),
            definitions: PipelineDefinitionBuilder::new(config.pipeline.clone()),
        }
    }

    /// Replace the naming convention.
    pub fn with_namer(mut self, namer: impl PipelineNamer + 'static) -> Self {
        self.namer = Box::new(namer);
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Pipeline name for `branch` of `repository` under the active convention.
    pub fn pipeline_name(&self, repository: &str, branch: &str) -> String {
        self.namer.pipeline_name(repository, branch)
    }

    /// Check an event against the filters that need no registry access.
    ///
    /// Returns the branch name when the event concerns a managed branch.
    pub fn managed_branch<'a>(&self, event: &'a ChangeEvent) -> Result<&'a str, IgnoreReason> {
        match &event.reference {
            RefName::Tag(_) => Err(IgnoreReason::Tag),
            RefName::Other(_) => Err(IgnoreReason::NotABranch),
            RefName::Branch(name) if self.branches.is_protected(name) => {
                Err(IgnoreReason::ProtectedBranch)
            }
            RefName::Branch(name) => Ok(name.as_str()),
        }
    }

    /// Classify one change event and perform at most one mutation.
    ///
    /// Never fails: service errors are logged and reported in the outcome.
    pub async fn classify_and_act(&self, event: &ChangeEvent) -> Outcome {
        let branch = match self.managed_branch(event) {
            Ok(branch) => branch,
            Err(reason) => {
                info!("Ignoring {} ({:?})", event.reference, reason);
                return Outcome::Ignored {
                    reference: event.reference.to_string(),
                    reason,
                };
            }
        };

        let pipeline = self.pipeline_name(&event.repository, branch);

        let existing: BTreeSet<String> = match self.registry.list_pipelines().await {
            Ok(existing) => existing,
            Err(e) => {
                error!("Error listing pipelines, skipping `{}`: {}", branch, e);
                return Outcome::RegistryUnavailable {
                    pipeline,
                    branch: branch.to_string(),
                    error: e.to_string(),
                };
            }
        };

        let pipeline_exists = existing.contains(&pipeline);
        if pipeline_exists {
            info!("Pipeline `{}` exists", pipeline);
        }

        match decide(event, pipeline_exists) {
            Decision::Delete => {
                info!(
                    "Branch `{}` deleted (last commit {}), deleting pipeline `{}`",
                    branch,
                    event.commit.as_deref().unwrap_or("unknown"),
                    pipeline
                );
                self.delete(pipeline, branch).await
            }
            Decision::Create => {
                info!(
                    "New commit {} on branch `{}`, creating pipeline `{}`",
                    event.commit.as_deref().unwrap_or("unknown"),
                    branch,
                    pipeline
                );
                self.create(pipeline, branch, &event.repository).await
            }
            Decision::NoOp(reason) => {
                info!("No change for pipeline `{}` ({:?})", pipeline, reason);
                Outcome::Unchanged {
                    pipeline,
                    branch: branch.to_string(),
                    reason,
                }
            }
        }
    }

    async fn create(&self, pipeline: String, branch: &str, repository: &str) -> Outcome {
        let definition = self.definitions.build(branch, repository, &pipeline);

        match self.registry.create_pipeline(&definition).await {
            Ok(()) => Outcome::Created {
                pipeline,
                branch: branch.to_string(),
            },
            Err(e) => {
                error!("Error creating pipeline `{}`: {}", pipeline, e);
                Outcome::Failed {
                    pipeline,
                    branch: branch.to_string(),
                    operation: "CreatePipeline".to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    async fn delete(&self, pipeline: String, branch: &str) -> Outcome {
        match self.registry.delete_pipeline(&pipeline).await {
            Ok(()) => Outcome::Deleted {
                pipeline,
                branch: branch.to_string(),
            },
            Err(e) => {
                error!("Error deleting pipeline `{}`: {}", pipeline, e);
                Outcome::Failed {
                    pipeline,
                    branch: branch.to_string(),
                    operation: "DeletePipeline".to_string(),
                    error: e.to_string(),
                }
            }
        }
    }
}
