//! Per-session workflow context.

use uuid::Uuid;

use crate::session::artifacts::{ClaimArtifacts, VerificationResult};
use crate::session::identity::ClaimIdentity;
use crate::workflow::state::WorkflowState;

/// Everything one redemption session knows: who is claiming, what each phase
/// produced, and where the workflow stands.
///
/// Volatile by construction; dropping the context discards every artifact.
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: Uuid,
    identity: Option<ClaimIdentity>,
    verification: Option<VerificationResult>,
    state: WorkflowState,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            identity: None,
            verification: None,
            state: WorkflowState::Unverified,
        }
    }

    /// Correlation id written to every audit entry of this session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> Option<&ClaimIdentity> {
        self.identity.as_ref()
    }

    /// Latest verification result. Survives the claim phase so order details
    /// remain available next to the artifacts.
    pub fn verification(&self) -> Option<&VerificationResult> {
        self.verification.as_ref()
    }

    /// Artifacts, present only once the workflow reached `Claimed`.
    pub fn artifacts(&self) -> Option<&ClaimArtifacts> {
        match &self.state {
            WorkflowState::Claimed(artifacts) => Some(artifacts),
            _ => None,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub(crate) fn set_identity(&mut self, identity: ClaimIdentity) {
        self.identity = Some(identity);
    }

    pub(crate) fn set_verification(&mut self, verification: Option<VerificationResult>) {
        self.verification = verification;
    }

    pub(crate) fn replace_state(&mut self, state: WorkflowState) -> WorkflowState {
        std::mem::replace(&mut self.state, state)
    }

    /// Forget identity and every phase product.
    pub(crate) fn clear(&mut self) {
        self.identity = None;
        self.verification = None;
        self.state = WorkflowState::Unverified;
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
