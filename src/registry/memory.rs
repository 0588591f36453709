//! In-memory pipeline registry.
//!
//! Behaves like the pipeline service for a single process: names are unique,
//! creating an existing name or deleting a missing one fails. Every call is
//! recorded, and individual operations can be made to fail, which lets the
//! CLI dry-run a payload and tests assert exactly which calls were made.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::PipelineDefinition;
use crate::registry::PipelineRegistry;

/// A call observed by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    List,
    Create(PipelineDefinition),
    Delete(String),
}

#[derive(Debug, Default)]
struct State {
    pipelines: BTreeSet<String>,
    calls: Vec<RegistryCall>,
    fail_list: bool,
    fail_create: bool,
    fail_delete: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with existing pipeline names.
    pub fn with_pipelines<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        registry.lock().pipelines = names.into_iter().map(Into::into).collect();
        registry
    }

    pub fn fail_list(self) -> Self {
        self.lock().fail_list = true;
        self
    }

    pub fn fail_create(self) -> Self {
        self.lock().fail_create = true;
        self
    }

    pub fn fail_delete(self) -> Self {
        self.lock().fail_delete = true;
        self
    }

    /// Current pipeline names.
    pub fn pipelines(&self) -> BTreeSet<String> {
        self.lock().pipelines.clone()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.lock().calls.clone()
    }

    /// Create and delete calls only.
    pub fn mutations(&self) -> Vec<RegistryCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| !matches!(call, RegistryCall::List))
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every mutation leaves the state consistent, so poisoning is recoverable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PipelineRegistry for InMemoryRegistry {
    async fn list_pipelines(&self) -> Result<BTreeSet<String>> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::List);
        if state.fail_list {
            return Err(AppError::upstream("ListPipelines", "injected failure"));
        }
        Ok(state.pipelines.clone())
    }

    async fn create_pipeline(&self, definition: &PipelineDefinition) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::Create(definition.clone()));
        if state.fail_create {
            return Err(AppError::upstream("CreatePipeline", "injected failure"));
        }
        if !state.pipelines.insert(definition.name.clone()) {
            return Err(AppError::upstream(
                "CreatePipeline",
                format!("pipeline '{}' already exists", definition.name),
            ));
        }
        Ok(())
    }

    async fn delete_pipeline(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(RegistryCall::Delete(name.to_string()));
        if state.fail_delete {
            return Err(AppError::upstream("DeletePipeline", "injected failure"));
        }
        if !state.pipelines.remove(name) {
            return Err(AppError::upstream(
                "DeletePipeline",
                format!("pipeline '{}' does not exist", name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PipelineSettings;
    use crate::services::PipelineDefinitionBuilder;

    fn definition(name: &str) -> PipelineDefinition {
        PipelineDefinitionBuilder::new(PipelineSettings::default()).build("dev", "my-repo", name)
    }

    #[tokio::test]
    async fn create_then_list() {
        let registry = InMemoryRegistry::new();
        registry.create_pipeline(&definition("Repo_dev")).await.unwrap();

        let names = registry.list_pipelines().await.unwrap();
        assert!(names.contains("Repo_dev"));
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let registry = InMemoryRegistry::with_pipelines(["Repo_dev"]);
        let err = registry
            .create_pipeline(&definition("Repo_dev"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
    }

    #[tokio::test]
    async fn delete_removes_pipeline() {
        let registry = InMemoryRegistry::with_pipelines(["Repo_dev", "Repo_main"]);
        registry.delete_pipeline("Repo_dev").await.unwrap();

        assert_eq!(registry.pipelines(), BTreeSet::from(["Repo_main".to_string()]));
        assert!(registry.delete_pipeline("Repo_dev").await.is_err());
    }

    #[tokio::test]
    async fn records_calls_in_order() {
        let registry = InMemoryRegistry::with_pipelines(["Repo_dev"]);
        registry.list_pipelines().await.unwrap();
        registry.delete_pipeline("Repo_dev").await.unwrap();

        assert_eq!(
            registry.calls(),
            vec![RegistryCall::List, RegistryCall::Delete("Repo_dev".to_string())]
        );
        assert_eq!(registry.mutations().len(), 1);
    }

    #[tokio::test]
    async fn injected_list_failure() {
        let registry = InMemoryRegistry::new().fail_list();
        assert!(registry.list_pipelines().await.is_err());
    }
}
