// src/config.rs

//! Configuration loading utilities.
//!
//! Lambda deployments configure the handler through environment variables;
//! the CLI reads a TOML file and then applies the same overrides.
//!
//! ## Environment Variables
//!
//! - `artifact_bucket_name`: S3 bucket for pipeline artifacts (required)
//! - `codepipeline_iam_role_arn`: role assumed by created pipelines (required)
//! - `codebuild_project_name`: build project run by the build stage (required)
//! - `PROTECTED_BRANCHES`: comma separated branches never managed (default: `master`)
//! - `PIPELINE_NAME_SEPARATOR`: single character used in pipeline names (default: `_`)

use std::collections::BTreeSet;

use tracing::info;

use crate::error::{AppError, Result};
use crate::models::Config;

pub const ARTIFACT_BUCKET_VAR: &str = "artifact_bucket_name";
pub const ROLE_ARN_VAR: &str = "codepipeline_iam_role_arn";
pub const BUILD_PROJECT_VAR: &str = "codebuild_project_name";
pub const PROTECTED_BRANCHES_VAR: &str = "PROTECTED_BRANCHES";
pub const SEPARATOR_VAR: &str = "PIPELINE_NAME_SEPARATOR";

impl Config {
    /// Build configuration from the process environment and validate it.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        info!(
            "Loaded configuration: bucket={}, project={}, protected={:?}",
            config.pipeline.artifact_bucket,
            config.pipeline.build_project,
            config.branches.protected
        );
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(bucket) = lookup(ARTIFACT_BUCKET_VAR) {
            self.pipeline.artifact_bucket = bucket;
        }
        if let Some(role) = lookup(ROLE_ARN_VAR) {
            self.pipeline.role_arn = role;
        }
        if let Some(project) = lookup(BUILD_PROJECT_VAR) {
            self.pipeline.build_project = project;
        }

        if let Some(branches) = lookup(PROTECTED_BRANCHES_VAR) {
            self.branches.protected = parse_branch_list(&branches);
        }

        if let Some(separator) = lookup(SEPARATOR_VAR) {
            let mut chars = separator.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.naming.separator = c,
                _ => {
                    return Err(AppError::config(format!(
                        "{} must be a single character, got '{}'",
                        SEPARATOR_VAR, separator
                    )));
                }
            }
        }

        Ok(())
    }
}

fn parse_branch_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|branch| !branch.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn overrides_fill_required_values() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                (ARTIFACT_BUCKET_VAR, "artifacts"),
                (ROLE_ARN_VAR, "arn:aws:iam::123456789012:role/pipelines"),
                (BUILD_PROJECT_VAR, "terraform-plan"),
            ]))
            .unwrap();

        assert_eq!(config.pipeline.artifact_bucket, "artifacts");
        assert_eq!(config.pipeline.build_project, "terraform-plan");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_required_values_fail_validation() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[(ARTIFACT_BUCKET_VAR, "artifacts")]))
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn protected_branches_are_comma_separated() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[(PROTECTED_BRANCHES_VAR, "main, develop,,")]))
            .unwrap();

        assert_eq!(
            config.branches.protected,
            BTreeSet::from(["develop".to_string(), "main".to_string()])
        );
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[(PROTECTED_BRANCHES_VAR, "  ")]))
            .unwrap();
        assert!(config.branches.is_protected("master"));
    }

    #[test]
    fn separator_must_be_one_character() {
        let mut config = Config::default();
        assert!(
            config
                .apply_overrides(lookup(&[(SEPARATOR_VAR, "--")]))
                .is_err()
        );

        config
            .apply_overrides(lookup(&[(SEPARATOR_VAR, "-")]))
            .unwrap();
        assert_eq!(config.naming.separator, '-');
    }
}
