//! # ReportForge
//!
//! Receives report requests from IFS Connect, renders them on a Crystal
//! Reports server and delivers the resulting PDF to IFS Cloud through the
//! External Reports Gateway (temporary lob -> blob data -> Upload action).
//!
//! Modules:
//! - `cache`: the service account's bearer token and its renewal
//! - `identity`: password-grant exchange against IFS IAM
//! - `platform`: the three IFS Cloud upload calls
//! - `orchestrator`: the upload state machine
//! - `renderer`: Crystal Reports Server client
//! - `api` / `server`: axum routes, API key check, health probes

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod identity;
pub mod observability;
pub mod orchestrator;
pub mod platform;
pub mod renderer;
pub mod resilience;
pub mod server;
pub mod utils;

#[cfg(test)]
pub mod tests;

pub use crate::config::upstreams::ServiceConfig;
pub use crate::error::{UploadError, UploadStep};
pub use crate::orchestrator::orchestrator::UploadOrchestrator;
pub use crate::orchestrator::state::{UploadReceipt, UploadRequest, UploadResult, UploadState};
