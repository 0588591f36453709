// src/lib.rs

//! Branch pipeline handler library.
//!
//! Keeps one CodePipeline pipeline per CodeCommit branch: created on the
//! first push to a branch, deleted with the branch.

pub mod config;
pub mod error;
pub mod handler;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod naming;
pub mod registry;
pub mod services;
