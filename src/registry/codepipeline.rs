//! AWS CodePipeline registry implementation.
//!
//! Translates `PipelineDefinition` into the SDK's declaration types and maps
//! every SDK failure to `AppError::Upstream` tagged with the API operation.

use std::collections::BTreeSet;

use async_trait::async_trait;
use aws_sdk_codepipeline::Client;
use aws_sdk_codepipeline::error::{BuildError, DisplayErrorContext};
use aws_sdk_codepipeline::types::{
    ActionCategory as SdkActionCategory, ActionDeclaration, ActionOwner as SdkActionOwner,
    ActionTypeId as SdkActionTypeId, ArtifactStore as SdkArtifactStore,
    ArtifactStoreType as SdkArtifactStoreType, InputArtifact, OutputArtifact,
    PipelineDeclaration, StageDeclaration,
};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{
    Action, ActionCategory, ActionOwner, ActionTypeId, ArtifactStore, ArtifactStoreType,
    PipelineDefinition, Stage,
};
use crate::registry::{PipelineRegistry, collect_pages};

/// Pipeline registry backed by the CodePipeline API.
#[derive(Debug, Clone)]
pub struct CodePipelineRegistry {
    client: Client,
}

impl CodePipelineRegistry {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a registry from the default AWS environment configuration.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl PipelineRegistry for CodePipelineRegistry {
    async fn list_pipelines(&self) -> Result<BTreeSet<String>> {
        let names = collect_pages(|next_token| async move {
            self.client
                .list_pipelines()
                .set_next_token(next_token)
                .send()
                .await
                .map(|output| {
                    let page: Vec<String> = output
                        .pipelines()
                        .iter()
                        .filter_map(|summary| summary.name().map(str::to_string))
                        .collect();
                    (page, output.next_token().map(str::to_string))
                })
                .map_err(|e| AppError::upstream("ListPipelines", DisplayErrorContext(e)))
        })
        .await?;

        debug!("Listed {} pipelines", names.len());
        Ok(names)
    }

    async fn create_pipeline(&self, definition: &PipelineDefinition) -> Result<()> {
        let declaration = to_declaration(definition)
            .map_err(|e| AppError::validation(format!("invalid pipeline declaration: {e}")))?;

        self.client
            .create_pipeline()
            .pipeline(declaration)
            .send()
            .await
            .map_err(|e| AppError::upstream("CreatePipeline", DisplayErrorContext(e)))?;

        info!("Created pipeline {}", definition.name);
        Ok(())
    }

    async fn delete_pipeline(&self, name: &str) -> Result<()> {
        self.client
            .delete_pipeline()
            .name(name)
            .send()
            .await
            .map_err(|e| AppError::upstream("DeletePipeline", DisplayErrorContext(e)))?;

        info!("Deleted pipeline {}", name);
        Ok(())
    }
}

// --- SDK conversions ---

fn to_declaration(definition: &PipelineDefinition) -> std::result::Result<PipelineDeclaration, BuildError> {
    let stages = definition
        .stages
        .iter()
        .map(to_stage)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    PipelineDeclaration::builder()
        .name(&definition.name)
        .role_arn(&definition.role_arn)
        .artifact_store(to_artifact_store(&definition.artifact_store)?)
        .set_stages(Some(stages))
        .build()
}

fn to_artifact_store(store: &ArtifactStore) -> std::result::Result<SdkArtifactStore, BuildError> {
    let store_type = match store.store_type {
        ArtifactStoreType::S3 => SdkArtifactStoreType::S3,
    };
    SdkArtifactStore::builder()
        .r#type(store_type)
        .location(&store.location)
        .build()
}

fn to_stage(stage: &Stage) -> std::result::Result<StageDeclaration, BuildError> {
    let actions = stage
        .actions
        .iter()
        .map(to_action)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    StageDeclaration::builder()
        .name(&stage.name)
        .set_actions(Some(actions))
        .build()
}

fn to_action(action: &Action) -> std::result::Result<ActionDeclaration, BuildError> {
    let mut builder = ActionDeclaration::builder()
        .name(&action.name)
        .action_type_id(to_action_type_id(&action.action_type_id)?);

    for artifact in &action.input_artifacts {
        builder = builder.input_artifacts(InputArtifact::builder().name(&artifact.name).build()?);
    }
    for artifact in &action.output_artifacts {
        builder = builder.output_artifacts(OutputArtifact::builder().name(&artifact.name).build()?);
    }
    for (key, value) in &action.configuration {
        builder = builder.configuration(key, value);
    }

    builder.build()
}

fn to_action_type_id(id: &ActionTypeId) -> std::result::Result<SdkActionTypeId, BuildError> {
    let category = match id.category {
        ActionCategory::Source => SdkActionCategory::Source,
        ActionCategory::Build => SdkActionCategory::Build,
    };
    let owner = match id.owner {
        ActionOwner::Aws => SdkActionOwner::Aws,
    };

    SdkActionTypeId::builder()
        .category(category)
        .owner(owner)
        .provider(&id.provider)
        .version(&id.version)
        .build()
}
