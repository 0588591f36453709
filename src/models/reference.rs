//! Git reference classification.

use std::fmt;

const BRANCH_PREFIX: &str = "refs/heads/";
const TAG_PREFIX: &str = "refs/tags/";

/// A git reference path, classified once at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefName {
    /// `refs/heads/<name>`; the name may itself contain `/`
    Branch(String),
    /// `refs/tags/<name>`
    Tag(String),
    /// Any other reference path
    Other(String),
}

impl RefName {
    pub fn parse(path: &str) -> Self {
        if let Some(name) = path.strip_prefix(BRANCH_PREFIX) {
            Self::Branch(name.to_string())
        } else if let Some(name) = path.strip_prefix(TAG_PREFIX) {
            Self::Tag(name.to_string())
        } else {
            Self::Other(path.to_string())
        }
    }

    /// Branch name, if this reference is a branch.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Branch(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "{BRANCH_PREFIX}{name}"),
            Self::Tag(name) => write!(f, "{TAG_PREFIX}{name}"),
            Self::Other(path) => f.write_str(path),
        }
    }
}
