//! CodeCommit trigger payload and the per-reference change event derived from it.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::RefName;

/// Event name CodeCommit uses for pushes, branch creation and deletion.
pub const REFERENCE_CHANGES: &str = "ReferenceChanges";

/// Raw trigger payload delivered to the handler.
///
/// Records stay untyped until processed so that one malformed record cannot
/// keep the rest of the batch from being parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeCommitEvent {
    #[serde(rename = "Records")]
    pub records: Vec<serde_json::Value>,
}

/// One notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeCommitRecord {
    pub event_name: String,

    /// `arn:aws:codecommit:<region>:<account>:<repository>`
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,

    pub codecommit: CodeCommitDetail,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_trigger_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeCommitDetail {
    #[serde(default)]
    pub references: Vec<CodeCommitReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeCommitReference {
    #[serde(rename = "ref")]
    pub ref_path: String,

    #[serde(default)]
    pub deleted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// Kind of change a record reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ReferenceChanges,
    Other(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        if name == REFERENCE_CHANGES {
            Self::ReferenceChanges
        } else {
            Self::Other(name.to_string())
        }
    }
}

/// A single reference change, ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub repository: String,
    pub reference: RefName,
    pub deleted: bool,
    pub commit: Option<String>,
}

impl CodeCommitEvent {
    /// Parse a raw payload.
    pub fn from_value(payload: serde_json::Value) -> Result<Self> {
        serde_json::from_value(payload).map_err(|e| AppError::malformed(e.to_string()))
    }
}

impl CodeCommitRecord {
    /// Parse one raw record.
    pub fn from_value(record: serde_json::Value) -> Result<Self> {
        serde_json::from_value(record).map_err(|e| AppError::malformed(e.to_string()))
    }

    /// Repository name: the trailing `:` segment of the source ARN.
    pub fn repository_name(&self) -> Result<&str> {
        match self.event_source_arn.rsplit(':').next() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(AppError::malformed(format!(
                "eventSourceARN '{}' does not name a repository",
                self.event_source_arn
            ))),
        }
    }

    /// One change event per reference in this record.
    pub fn change_events(&self) -> Result<Vec<ChangeEvent>> {
        let repository = self.repository_name()?;

        if self.codecommit.references.is_empty() {
            return Err(AppError::malformed(format!(
                "record for '{}' carries no references",
                repository
            )));
        }

        let kind = EventKind::from_name(&self.event_name);
        Ok(self
            .codecommit
            .references
            .iter()
            .map(|reference| ChangeEvent {
                kind: kind.clone(),
                repository: repository.to_string(),
                reference: RefName::parse(&reference.ref_path),
                deleted: reference.deleted,
                commit: reference.commit.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_payload() -> serde_json::Value {
        json!({
            "Records": [{
                "awsRegion": "eu-west-1",
                "eventId": "5a824061-17ca-46a9-bbf9-114edeadbeef",
                "eventName": "ReferenceChanges",
                "eventSourceARN": "arn:aws:codecommit:eu-west-1:123456789012:my-repo",
                "eventTriggerName": "branch-pipelines",
                "codecommit": {
                    "references": [
                        { "commit": "5c4ef1049f1d27deadbeeff313e0730018be182b", "ref": "refs/heads/feature/login" },
                        { "ref": "refs/heads/old", "deleted": true }
                    ]
                }
            }]
        })
    }

    #[test]
    fn parses_trigger_payload() {
        let event = CodeCommitEvent::from_value(sample_payload()).unwrap();
        assert_eq!(event.records.len(), 1);

        let record = CodeCommitRecord::from_value(event.records[0].clone()).unwrap();
        assert_eq!(record.repository_name().unwrap(), "my-repo");
        assert_eq!(record.event_trigger_name.as_deref(), Some("branch-pipelines"));

        let references = &record.codecommit.references;
        assert!(!references[0].deleted);
        assert!(references[1].deleted);
    }

    #[test]
    fn change_events_cover_every_reference() {
        let event = CodeCommitEvent::from_value(sample_payload()).unwrap();
        let record = CodeCommitRecord::from_value(event.records[0].clone()).unwrap();
        let changes = record.change_events().unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, EventKind::ReferenceChanges);
        assert_eq!(changes[0].repository, "my-repo");
        assert_eq!(
            changes[0].reference,
            RefName::Branch("feature/login".to_string())
        );
        assert!(changes[1].deleted);
    }

    #[test]
    fn missing_records_is_malformed() {
        let err = CodeCommitEvent::from_value(json!({ "detail": {} })).unwrap_err();
        assert!(matches!(err, AppError::MalformedEvent(_)));
    }

    #[test]
    fn empty_references_is_malformed() {
        let payload = json!({
            "Records": [{
                "eventName": "ReferenceChanges",
                "eventSourceARN": "arn:aws:codecommit:eu-west-1:123456789012:my-repo",
                "codecommit": { "references": [] }
            }]
        });
        let event = CodeCommitEvent::from_value(payload).unwrap();
        let record = CodeCommitRecord::from_value(event.records[0].clone()).unwrap();
        let err = record.change_events().unwrap_err();
        assert!(matches!(err, AppError::MalformedEvent(_)));
    }

    #[test]
    fn arn_without_repository_is_malformed() {
        let payload = json!({
            "Records": [{
                "eventName": "ReferenceChanges",
                "eventSourceARN": "arn:aws:codecommit:eu-west-1:123456789012:",
                "codecommit": { "references": [{ "ref": "refs/heads/dev" }] }
            }]
        });
        let event = CodeCommitEvent::from_value(payload).unwrap();
        let record = CodeCommitRecord::from_value(event.records[0].clone()).unwrap();
        assert!(record.repository_name().is_err());
    }

    #[test]
    fn record_missing_fields_is_malformed() {
        let err = CodeCommitRecord::from_value(json!({
            "eventName": "ReferenceChanges",
            "codecommit": { "references": [{ "ref": "refs/heads/dev" }] }
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::MalformedEvent(_)));

        let err = CodeCommitRecord::from_value(json!({
            "eventName": "ReferenceChanges",
            "eventSourceARN": "arn:aws:codecommit:eu-west-1:123456789012:my-repo",
            "codecommit": { "references": [{ "deleted": true }] }
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::MalformedEvent(_)));
    }

    #[test]
    fn other_event_names_are_preserved() {
        assert_eq!(
            EventKind::from_name("CreateRepository"),
            EventKind::Other("CreateRepository".to_string())
        );
    }
}
