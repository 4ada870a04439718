//! Workflow error taxonomy.

use thiserror::Error;

use crate::normalize::ErrorInfo;
use crate::transport::TransportError;

/// Why a workflow operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// No response was obtained.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-2xx reply, a 2xx reply reporting failure, or a malformed success body.
    #[error("{0}")]
    Protocol(ErrorInfo),

    /// A required client-supplied field is missing.
    #[error("{0}")]
    Validation(String),

    /// The operation is not legal in the current state.
    #[error(transparent)]
    State(#[from] StateError),

    /// The service reported success without a complete wallet bundle.
    #[error("incomplete artifacts: missing {}", .missing.join(", "))]
    IncompleteArtifacts { http_status: u16, missing: Vec<String> },
}

impl ClaimError {
    /// User-visible description of the failure.
    pub fn info(&self) -> ErrorInfo {
        match self {
            ClaimError::Protocol(info) => info.clone(),
            ClaimError::IncompleteArtifacts { http_status, .. } => {
                ErrorInfo::new(Some(*http_status), self.to_string())
            }
            other => ErrorInfo::new(None, other.to_string()),
        }
    }

    /// Short category name, used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimError::Transport(_) => "transport",
            ClaimError::Protocol(_) => "protocol",
            ClaimError::Validation(_) => "validation",
            ClaimError::State(_) => "state",
            ClaimError::IncompleteArtifacts { .. } => "incomplete_artifacts",
        }
    }

    pub fn is_state_error(&self) -> bool {
        matches!(self, ClaimError::State(_))
    }
}

/// Illegal phase invocation. Returned without touching workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("claim requires a verified claim (current state: {state})")]
    NotVerified { state: &'static str },

    #[error("a {phase} request is already in flight")]
    InFlight { phase: &'static str },

    #[error("the claim has already been redeemed in this session")]
    AlreadyClaimed,

    #[error("a different identity is already bound to this session; reset first")]
    IdentityLocked,

    #[error("no claim identity has been supplied")]
    NoIdentity,

    #[error("artifacts are only available after a successful claim (current state: {state})")]
    NotClaimed { state: &'static str },

    #[error("transition {event} is not valid from state {state}")]
    InvalidTransition {
        event: &'static str,
        state: &'static str,
    },
}
