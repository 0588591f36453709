// src/naming.rs

//! Pipeline name derivation.
//!
//! A pipeline name is a pure function of the repository and branch names.
//! The default convention abbreviates the repository to its trailing
//! `-`-separated segment, capitalizes it, and appends the branch:
//!
//! ```text
//! my-repo + feature/login  ->  Repo_feature_login
//! ```
//!
//! Names longer than CodePipeline's limit are truncated and suffixed with a
//! short digest of the full name, so long branches still map to distinct,
//! stable names.

use sha2::{Digest, Sha256};

/// Longest pipeline name CodePipeline accepts.
pub const MAX_NAME_LEN: usize = 100;

/// Hex digits of the digest kept when a name is shortened.
const DIGEST_LEN: usize = 8;

/// Derives the pipeline identifier for a (repository, branch) pair.
pub trait PipelineNamer: Send + Sync {
    fn pipeline_name(&self, repository: &str, branch: &str) -> String;
}

/// Whether CodePipeline accepts `c` in a pipeline name.
pub fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '@' | '-' | '_')
}

/// Default naming convention: `<RepoAbbrev><sep><branch>`.
///
/// Every character CodePipeline rejects (including `/`) is replaced by the
/// separator, so `feature/login` becomes `feature_login`. Results longer than
/// [`MAX_NAME_LEN`] keep their first characters and end in
/// `<sep><first 8 hex digits of SHA-256 of the full name>`.
#[derive(Debug, Clone)]
pub struct AbbreviatedNamer {
    separator: char,
}

impl AbbreviatedNamer {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    /// Trailing `-` segment of the repository name, first letter upper-cased
    /// and the rest lower-cased.
    fn abbreviate(repository: &str) -> String {
        let segment = repository.rsplit('-').next().unwrap_or(repository);
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        }
    }

    fn sanitize(&self, raw: &str) -> String {
        raw.chars()
            .map(|c| if is_valid_name_char(c) { c } else { self.separator })
            .collect()
    }

    fn shorten(&self, name: String) -> String {
        if name.chars().count() <= MAX_NAME_LEN {
            return name;
        }

        let digest = hex::encode(Sha256::digest(name.as_bytes()));
        let head: String = name.chars().take(MAX_NAME_LEN - DIGEST_LEN - 1).collect();
        format!("{}{}{}", head, self.separator, &digest[..DIGEST_LEN])
    }
}

impl Default for AbbreviatedNamer {
    fn default() -> Self {
        Self::new('_')
    }
}

impl PipelineNamer for AbbreviatedNamer {
    fn pipeline_name(&self, repository: &str, branch: &str) -> String {
        let raw = format!("{}{}{}", Self::abbreviate(repository), self.separator, branch);
        self.shorten(self.sanitize(&raw))
    }
}
