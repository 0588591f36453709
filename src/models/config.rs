//! Application configuration structures.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::naming::is_valid_name_char;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Values stamped into every created pipeline
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Branch management rules
    #[serde(default)]
    pub branches: BranchConfig,

    /// Pipeline naming convention
    #[serde(default)]
    pub naming: NamingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;
        if pipeline.artifact_bucket.trim().is_empty() {
            return Err(AppError::validation("pipeline.artifact_bucket is empty"));
        }
        if pipeline.role_arn.trim().is_empty() {
            return Err(AppError::validation("pipeline.role_arn is empty"));
        }
        if pipeline.build_project.trim().is_empty() {
            return Err(AppError::validation("pipeline.build_project is empty"));
        }
        if pipeline.source_stage_name.trim().is_empty()
            || pipeline.build_stage_name.trim().is_empty()
        {
            return Err(AppError::validation("stage names must not be empty"));
        }
        if pipeline.source_stage_name == pipeline.build_stage_name {
            return Err(AppError::validation(
                "pipeline.source_stage_name and pipeline.build_stage_name must differ",
            ));
        }
        if pipeline.source_artifact_name.trim().is_empty() {
            return Err(AppError::validation(
                "pipeline.source_artifact_name is empty",
            ));
        }
        if !is_valid_name_char(self.naming.separator) {
            return Err(AppError::validation(format!(
                "naming.separator '{}' is not allowed in pipeline names",
                self.naming.separator
            )));
        }
        Ok(())
    }
}

/// Settings supplied to every pipeline this handler creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// S3 bucket holding pipeline artifacts
    #[serde(default)]
    pub artifact_bucket: String,

    /// IAM role assumed by CodePipeline
    #[serde(default)]
    pub role_arn: String,

    /// Pre-configured CodeBuild project run by the build stage
    #[serde(default)]
    pub build_project: String,

    #[serde(default = "defaults::source_stage_name")]
    pub source_stage_name: String,

    #[serde(default = "defaults::build_stage_name")]
    pub build_stage_name: String,

    /// Artifact handed from the source stage to the build stage
    #[serde(default = "defaults::source_artifact_name")]
    pub source_artifact_name: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            artifact_bucket: String::new(),
            role_arn: String::new(),
            build_project: String::new(),
            source_stage_name: defaults::source_stage_name(),
            build_stage_name: defaults::build_stage_name(),
            source_artifact_name: defaults::source_artifact_name(),
        }
    }
}

/// Branch management rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Branches whose pipelines are provisioned out-of-band
    #[serde(default = "defaults::protected_branches")]
    pub protected: BTreeSet<String>,
}

impl BranchConfig {
    pub fn is_protected(&self, branch: &str) -> bool {
        self.protected.contains(branch)
    }
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            protected: defaults::protected_branches(),
        }
    }
}

/// Pipeline naming convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Replaces characters CodePipeline rejects and joins repository and branch
    #[serde(default = "defaults::separator")]
    pub separator: char,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            separator: defaults::separator(),
        }
    }
}

mod defaults {
    use std::collections::BTreeSet;

    pub fn source_stage_name() -> String {
        "Source".into()
    }
    pub fn build_stage_name() -> String {
        "Terraform_Plan".into()
    }
    pub fn source_artifact_name() -> String {
        "SourceArtifact".into()
    }
    pub fn protected_branches() -> BTreeSet<String> {
        BTreeSet::from(["master".to_string()])
    }
    pub fn separator() -> char {
        '_'
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn complete_config() -> Config {
        let mut config = Config::default();
        config.pipeline.artifact_bucket = "artifacts".to_string();
        config.pipeline.role_arn = "arn:aws:iam::123456789012:role/pipelines".to_string();
        config.pipeline.build_project = "terraform-plan".to_string();
        config
    }

    #[test]
    fn default_config_protects_master() {
        let config = Config::default();
        assert!(config.branches.is_protected("master"));
        assert!(!config.branches.is_protected("feature/login"));
        assert_eq!(config.naming.separator, '_');
    }

    #[test]
    fn validate_rejects_missing_pipeline_values() {
        assert!(Config::default().validate().is_err());
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_identical_stage_names() {
        let mut config = complete_config();
        config.pipeline.build_stage_name = "Source".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_separator_outside_name_alphabet() {
        let mut config = complete_config();
        config.naming.separator = '/';
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_toml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[pipeline]
artifact_bucket = "artifacts"
role_arn = "arn:aws:iam::123456789012:role/pipelines"
build_project = "terraform-plan"

[branches]
protected = ["main", "develop"]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.pipeline.build_project, "terraform-plan");
        assert_eq!(config.pipeline.build_stage_name, "Terraform_Plan");
        assert!(config.branches.is_protected("develop"));
        assert!(!config.branches.is_protected("master"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml"));
        assert!(config.branches.is_protected("master"));
    }
}
