//! Pipeline descriptor builder.
//!
//! Produces the two-stage pipeline created for every managed branch:
//!
//! 1. Source: pull the branch from CodeCommit into the source artifact.
//! 2. Build: run the pre-configured CodeBuild project (a Terraform plan)
//!    against that artifact.

use std::collections::BTreeMap;

use crate::models::{
    Action, ActionCategory, ActionOwner, ActionTypeId, Artifact, ArtifactStore,
    ArtifactStoreType, PipelineDefinition, PipelineSettings, Stage,
};

const ACTION_VERSION: &str = "1";

/// Builds pipeline descriptors from configured settings. Performs no I/O.
#[derive(Debug, Clone)]
pub struct PipelineDefinitionBuilder {
    settings: PipelineSettings,
}

impl PipelineDefinitionBuilder {
    pub fn new(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    /// Build the descriptor for `pipeline_name` tracking `branch` of `repository`.
    pub fn build(&self, branch: &str, repository: &str, pipeline_name: &str) -> PipelineDefinition {
        PipelineDefinition {
            name: pipeline_name.to_string(),
            role_arn: self.settings.role_arn.clone(),
            artifact_store: ArtifactStore {
                store_type: ArtifactStoreType::S3,
                location: self.settings.artifact_bucket.clone(),
            },
            stages: vec![
                self.source_stage(branch, repository),
                self.build_stage(),
            ],
        }
    }

    fn source_stage(&self, branch: &str, repository: &str) -> Stage {
        let name = &self.settings.source_stage_name;
        Stage {
            name: name.clone(),
            actions: vec![Action {
                name: name.clone(),
                action_type_id: ActionTypeId {
                    category: ActionCategory::Source,
                    owner: ActionOwner::Aws,
                    provider: "CodeCommit".to_string(),
                    version: ACTION_VERSION.to_string(),
                },
                input_artifacts: Vec::new(),
                output_artifacts: vec![Artifact::named(&self.settings.source_artifact_name)],
                configuration: BTreeMap::from([
                    ("RepositoryName".to_string(), repository.to_string()),
                    ("BranchName".to_string(), branch.to_string()),
                ]),
            }],
        }
    }

    fn build_stage(&self) -> Stage {
        let name = &self.settings.build_stage_name;
        Stage {
            name: name.clone(),
            actions: vec![Action {
                name: name.clone(),
                action_type_id: ActionTypeId {
                    category: ActionCategory::Build,
                    owner: ActionOwner::Aws,
                    provider: "CodeBuild".to_string(),
                    version: ACTION_VERSION.to_string(),
                },
                input_artifacts: vec![Artifact::named(&self.settings.source_artifact_name)],
                output_artifacts: Vec::new(),
                configuration: BTreeMap::from([(
                    "ProjectName".to_string(),
                    self.settings.build_project.clone(),
                )]),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PipelineSettings {
        PipelineSettings {
            artifact_bucket: "artifacts".to_string(),
            role_arn: "arn:aws:iam::123456789012:role/pipelines".to_string(),
            build_project: "terraform-plan".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn descriptor_has_source_then_build() {
        let definition = PipelineDefinitionBuilder::new(settings()).build(
            "feature/login",
            "my-repo",
            "Repo_feature_login",
        );

        assert_eq!(definition.name, "Repo_feature_login");
        let names: Vec<_> = definition.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Source", "Terraform_Plan"]);

        let source = &definition.stages[0].actions[0];
        assert_eq!(source.action_type_id.category, ActionCategory::Source);
        assert_eq!(source.configuration["BranchName"], "feature/login");
        assert_eq!(source.configuration["RepositoryName"], "my-repo");

        let build = &definition.stages[1].actions[0];
        assert_eq!(build.action_type_id.provider, "CodeBuild");
        assert_eq!(build.configuration["ProjectName"], "terraform-plan");
        assert!(build.output_artifacts.is_empty());
    }

    #[test]
    fn source_output_feeds_build_input() {
        let definition =
            PipelineDefinitionBuilder::new(settings()).build("dev", "my-repo", "Repo_dev");

        let produced = &definition.stages[0].actions[0].output_artifacts;
        let consumed = &definition.stages[1].actions[0].input_artifacts;
        assert_eq!(produced, consumed);
        assert_eq!(produced[0].name, "SourceArtifact");
    }

    #[test]
    fn role_and_store_come_from_settings() {
        let definition =
            PipelineDefinitionBuilder::new(settings()).build("dev", "my-repo", "Repo_dev");

        assert_eq!(definition.role_arn, "arn:aws:iam::123456789012:role/pipelines");
        assert_eq!(definition.artifact_store.store_type, ArtifactStoreType::S3);
        assert_eq!(definition.artifact_store.location, "artifacts");
    }

    #[test]
    fn serializes_in_codepipeline_shape() {
        let definition =
            PipelineDefinitionBuilder::new(settings()).build("dev", "my-repo", "Repo_dev");
        let json = serde_json::to_value(&definition).unwrap();

        assert_eq!(json["roleArn"], "arn:aws:iam::123456789012:role/pipelines");
        assert_eq!(json["artifactStore"]["type"], "S3");
        assert_eq!(json["stages"][0]["actions"][0]["actionTypeId"]["owner"], "AWS");
        assert_eq!(
            json["stages"][0]["actions"][0]["outputArtifacts"][0]["name"],
            "SourceArtifact"
        );
        assert!(json["stages"][0]["actions"][0].get("inputArtifacts").is_none());
    }
}
