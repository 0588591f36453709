// src/models/mod.rs

//! Domain models for the pipeline handler.
//!
//! Inbound trigger payloads, the classified reference they carry, the
//! pipeline descriptor built on create, and configuration.

mod config;
mod event;
mod pipeline;
mod reference;

// Re-export all public types
pub use config::{BranchConfig, Config, NamingConfig, PipelineSettings};
pub use event::{
    ChangeEvent, CodeCommitDetail, CodeCommitEvent, CodeCommitRecord, CodeCommitReference,
    EventKind, REFERENCE_CHANGES,
};
pub use pipeline::{
    Action, ActionCategory, ActionOwner, ActionTypeId, Artifact, ArtifactStore,
    ArtifactStoreType, PipelineDefinition, Stage,
};
pub use reference::RefName;
