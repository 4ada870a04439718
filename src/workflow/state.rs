//! Workflow states and the transition function.
//!
//! # State Transitions
//! ```text
//! Unverified ─BeginVerify→ Verifying ─VerifySucceeded→ Verified ─BeginClaim→ Claiming ─ClaimSucceeded→ Claimed
//!                              │                          │                      │
//!                              └──────PhaseFailed──→ Failed ←──PhaseFailed───────┘
//!
//! Verified | Failed ─BeginVerify→ Verifying   (re-verification)
//! any state except Verifying/Claiming ─Reset→ Unverified
//! ```
//!
//! `Claimed` is terminal until reset. No transition skips a phase.

use serde::Serialize;

use crate::session::{ClaimArtifacts, VerificationResult};
use crate::workflow::error::{ClaimError, StateError};

/// The two network phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Verify,
    Claim,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Verify => "verify",
            Phase::Claim => "claim",
        }
    }

    /// Message used when the service gives no usable error text.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Phase::Verify => "Failed to verify claim",
            Phase::Claim => "Failed to process claim",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed phase and its cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub phase: Phase,
    pub cause: ClaimError,
}

/// Where a redemption session stands.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Unverified,
    Verifying,
    Verified(VerificationResult),
    Claiming,
    Claimed(ClaimArtifacts),
    Failed(Failure),
}

/// Inputs to [`WorkflowState::apply`].
#[derive(Debug, Clone)]
pub enum Event {
    BeginVerify,
    VerifySucceeded(VerificationResult),
    BeginClaim,
    ClaimSucceeded(ClaimArtifacts),
    PhaseFailed(Failure),
    Reset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::BeginVerify => "begin_verify",
            Event::VerifySucceeded(_) => "verify_succeeded",
            Event::BeginClaim => "begin_claim",
            Event::ClaimSucceeded(_) => "claim_succeeded",
            Event::PhaseFailed(_) => "phase_failed",
            Event::Reset => "reset",
        }
    }
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Unverified => "unverified",
            WorkflowState::Verifying => "verifying",
            WorkflowState::Verified(_) => "verified",
            WorkflowState::Claiming => "claiming",
            WorkflowState::Claimed(_) => "claimed",
            WorkflowState::Failed(_) => "failed",
        }
    }

    /// A phase request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight_phase().is_some()
    }

    pub fn in_flight_phase(&self) -> Option<Phase> {
        match self {
            WorkflowState::Verifying => Some(Phase::Verify),
            WorkflowState::Claiming => Some(Phase::Claim),
            _ => None,
        }
    }

    /// Check whether `event` is legal here without consuming the state.
    pub fn check(&self, event: &Event) -> Result<(), StateError> {
        use WorkflowState::*;

        if let Some(phase) = self.in_flight_phase() {
            let completes_phase = match event {
                Event::VerifySucceeded(_) => phase == Phase::Verify,
                Event::ClaimSucceeded(_) => phase == Phase::Claim,
                Event::PhaseFailed(failure) => failure.phase == phase,
                _ => false,
            };
            return if completes_phase {
                Ok(())
            } else {
                Err(StateError::InFlight {
                    phase: phase.as_str(),
                })
            };
        }

        match (self, event) {
            (Unverified | Verified(_) | Failed(_), Event::BeginVerify) => Ok(()),
            (Claimed(_), Event::BeginVerify | Event::BeginClaim) => Err(StateError::AlreadyClaimed),
            (Verified(_), Event::BeginClaim) => Ok(()),
            (state, Event::BeginClaim) => Err(StateError::NotVerified { state: state.name() }),
            // Verify-phase validation rejects before any request is sent.
            (Unverified | Verified(_) | Failed(_), Event::PhaseFailed(failure))
                if failure.phase == Phase::Verify =>
            {
                Ok(())
            }
            (_, Event::Reset) => Ok(()),
            (state, event) => Err(StateError::InvalidTransition {
                event: event.name(),
                state: state.name(),
            }),
        }
    }

    /// The transition function. Every state change goes through here.
    pub fn apply(self, event: Event) -> Result<WorkflowState, (WorkflowState, StateError)> {
        if let Err(e) = self.check(&event) {
            return Err((self, e));
        }
        Ok(match event {
            Event::BeginVerify => WorkflowState::Verifying,
            Event::VerifySucceeded(result) => WorkflowState::Verified(result),
            Event::BeginClaim => WorkflowState::Claiming,
            Event::ClaimSucceeded(artifacts) => WorkflowState::Claimed(artifacts),
            Event::PhaseFailed(failure) => WorkflowState::Failed(failure),
            Event::Reset => WorkflowState::Unverified,
        })
    }
}
