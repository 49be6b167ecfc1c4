//! Typed error hierarchy for the ContextPilot client.
//!
//! Three top-level enums cover the three subsystems:
//! - `ClientError` — HTTP access to the backend
//! - `ApprovalError` — the approval/apply/commit flow
//! - `DashboardError` — the workspace-management REST layer

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the backend API client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to reach backend at {url} after {attempts} attempts: {source}")]
    ConnectFailed {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to connect: backend at {url} answered {status} after {attempts} attempts")]
    ConnectRejected {
        url: String,
        attempts: u32,
        status: u16,
    },

    #[error("Backend returned {status} for {operation}")]
    Backend { operation: String, status: u16 },

    #[error("Request to {operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors from the proposal approval flow.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("No workspace root is open or selected")]
    NoWorkspace,

    #[error("Proposal {id} not found on the backend")]
    ProposalNotFound { id: String },

    #[error("Backend rejected approval of proposal {id}: {source}")]
    RejectedByBackend {
        id: String,
        #[source]
        source: ClientError,
    },

    #[error("Proposed path {path:?} escapes the workspace root")]
    PathEscapesWorkspace { path: String },

    #[error("Failed to apply change to {path}: {source}")]
    ApplyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to commit applied changes: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the workspace dashboard layer.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Workspace {id} not found")]
    WorkspaceNotFound { id: String },

    #[error("Dashboard backend returned {status} for {operation}")]
    Backend { operation: String, status: u16 },

    #[error("Request to {operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid role '{0}' on member row")]
    InvalidRole(String),
}
