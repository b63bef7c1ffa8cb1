use std::time::Duration;

use thiserror::Error;

use crate::models::{Stage, TaskStatus};

/// Classification of a language-model backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Missing or rejected credentials (401, 403)
    Auth,
    /// Provider rate limit or quota (429)
    RateLimit,
    /// The call did not finish in time
    Timeout,
    /// The provider rejected the request shape (other 4xx)
    MalformedRequest,
    /// Provider-side failure (5xx)
    Server,
    /// Connection-level failure before any response
    Transport,
    /// A response arrived but carried no usable text
    InvalidResponse,
}

impl BackendErrorKind {
    /// Map an HTTP status code to a failure class
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            408 | 504 => Self::Timeout,
            400..=499 => Self::MalformedRequest,
            _ => Self::Server,
        }
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Auth => "auth",
            Self::RateLimit => "rate-limit",
            Self::Timeout => "timeout",
            Self::MalformedRequest => "malformed-request",
            Self::Server => "server",
            Self::Transport => "transport",
            Self::InvalidResponse => "invalid-response",
        };
        f.write_str(label)
    }
}

/// Failure returned by a `TextBackend`
#[derive(Debug, Clone, Error)]
#[error("backend error ({kind}): {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            BackendErrorKind::Timeout,
            format!("no response after {:?}", after),
        )
    }
}

/// Datastore failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("version conflict on {id}: expected {expected:?}, found {found:?}")]
    VersionConflict {
        id: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("record already exists: {0}")]
    AlreadyExists(String),
}

/// Failure to publish a task notification; logged, never surfaced
#[derive(Debug, Clone, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Errors surfaced by the orchestrator to its caller
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid stage: requested stage {requested}, task is at stage {current}")]
    InvalidStage { requested: u8, current: u8 },

    #[error("invalid state for {operation} on task {task_id}: status is {status}")]
    InvalidState {
        task_id: String,
        status: TaskStatus,
        operation: &'static str,
    },

    #[error("validation failed on `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Backend(BackendError),

    #[error("backend timed out: {message}")]
    BackendTimeout { message: String },

    #[error("persistence failure: {0}")]
    Persistence(StoreError),

    #[error("task {task_id} was modified concurrently")]
    Conflict { task_id: String },

    #[error("task {task_id} is corrupt: {detail}")]
    CorruptState { task_id: String, detail: String },
}

impl OrchestratorError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn invalid_stage(requested: Stage, current: Stage) -> Self {
        Self::InvalidStage {
            requested: requested.number(),
            current: current.number(),
        }
    }

    /// Whether the caller may safely retry the same call unchanged
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::BackendTimeout { .. } | Self::Conflict { .. }
        )
    }
}

impl From<BackendError> for OrchestratorError {
    fn from(err: BackendError) -> Self {
        match err.kind {
            BackendErrorKind::Timeout => Self::BackendTimeout {
                message: err.message,
            },
            _ => Self::Backend(err),
        }
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { id, .. } => Self::Conflict { task_id: id },
            other => Self::Persistence(other),
        }
    }
}

pub type Result<T, E = OrchestratorError> = std::result::Result<T, E>;
