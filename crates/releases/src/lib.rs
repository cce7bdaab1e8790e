//! Release orchestration service.
//!
//! This crate provides:
//! - [`ReleaseOrchestrator`], which turns a [`ReleaseRequest`] into a merged
//!   change request, a tagged release, a version record and a notification
//! - [`MergeabilityPoller`] with a configurable [`PollPolicy`]
//! - The [`RepositoryStore`] seam with memory and JSON file adapters
//! - An axum router exposing release and repository endpoints
//!
//! Provider access goes through the `scm` crate and notifications through the
//! `notify` crate.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod poller;
pub mod request;
pub mod server;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{Config, LogFormat};
pub use error::{ErrorKind, ReleaseError, StatusMapping};
pub use orchestrator::{ProviderFactory, ReleaseOrchestrator, ScmProviderFactory};
pub use outcome::OrchestrationOutcome;
pub use poller::{Backoff, MergeabilityPoller, PollError, PollPolicy};
pub use request::{ReleaseRequest, RepositoryKey};
pub use server::{build_router, AppState};
pub use state::Step;
pub use store::{
    FileRepositoryStore, MemoryRepositoryStore, RepositoryRecord, RepositoryStore, StoreError,
};
