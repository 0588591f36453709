//! Pipeline registry abstractions.
//!
//! The registry is the live set of pipelines owned by the pipeline service.
//! The handler never caches it: every decision starts from a fresh listing.
//!
//! - `CodePipelineRegistry`: AWS CodePipeline (requires the `aws` feature)
//! - `InMemoryRegistry`: local dry runs and tests

#[cfg(feature = "aws")]
pub mod codepipeline;
pub mod memory;

use std::collections::BTreeSet;
use std::future::Future;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::PipelineDefinition;

// Re-export for convenience
#[cfg(feature = "aws")]
pub use codepipeline::CodePipelineRegistry;
pub use memory::{InMemoryRegistry, RegistryCall};

/// Operations the handler needs from the pipeline service.
#[async_trait]
pub trait PipelineRegistry: Send + Sync {
    /// Names of every pipeline that currently exists.
    async fn list_pipelines(&self) -> Result<BTreeSet<String>>;

    /// Create a pipeline from a descriptor.
    ///
    /// Fails if a pipeline with the same name already exists.
    async fn create_pipeline(&self, definition: &PipelineDefinition) -> Result<()>;

    /// Delete the named pipeline.
    async fn delete_pipeline(&self, name: &str) -> Result<()>;
}

/// Drain a paginated listing.
///
/// `fetch_page` receives the continuation token (`None` for the first page)
/// and returns that page's names plus the next token. Listing stops at a
/// missing or empty token; the first failing page aborts the whole listing.
pub(crate) async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<BTreeSet<String>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<String>, Option<String>)>>,
{
    let mut names = BTreeSet::new();
    let mut next_token = None;

    loop {
        let (page, token) = fetch_page(next_token.take()).await?;
        names.extend(page);

        match token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::AppError;

    fn page(names: &[&str], token: Option<&str>) -> Result<(Vec<String>, Option<String>)> {
        Ok((
            names.iter().map(|n| n.to_string()).collect(),
            token.map(str::to_string),
        ))
    }

    #[tokio::test]
    async fn follows_tokens_until_exhausted() {
        let seen = Mutex::new(Vec::new());

        let names = collect_pages(|token: Option<String>| {
            seen.lock().unwrap().push(token.clone());
            let result = match token.as_deref() {
                None => page(&["Repo_a", "Repo_b"], Some("t1")),
                Some("t1") => page(&["Repo_c"], Some("t2")),
                Some("t2") => page(&["Repo_d"], None),
                Some(other) => panic!("unexpected token {other}"),
            };
            async move { result }
        })
        .await
        .unwrap();

        assert_eq!(
            names,
            BTreeSet::from(["Repo_a", "Repo_b", "Repo_c", "Repo_d"].map(String::from))
        );
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
    }

    #[tokio::test]
    async fn empty_token_ends_listing() {
        let mut calls = 0;

        let names = collect_pages(|_| {
            calls += 1;
            async { page(&["Repo_a"], Some("")) }
        })
        .await
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn failing_page_aborts_listing() {
        let err = collect_pages(|token: Option<String>| async move {
            match token {
                None => page(&["Repo_a"], Some("t1")),
                Some(_) => Err(AppError::upstream("ListPipelines", "throttled")),
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Upstream { .. }));
    }
}
