//! Phase-specific interpretation of issuance-service replies.

use crate::normalize::extract::{required_artifact_fields, success_flag};
use crate::normalize::{
    extract_artifacts, extract_verification, normalize, payload_message, verify_verdict,
    ArtifactExtraction, ErrorInfo, NormalizedResult, Verdict,
};
use crate::session::{ClaimArtifacts, VerificationResult};
use crate::transport::RawResponse;
use crate::workflow::error::ClaimError;
use crate::workflow::state::Phase;

/// Turn a verify reply into a verification result or a protocol error.
pub fn interpret_verify(raw: &RawResponse) -> Result<VerificationResult, ClaimError> {
    let fallback = Phase::Verify.fallback_message();
    let (status, payload) = match normalize(raw, fallback) {
        NormalizedResult::Success { status, payload } => (status, payload),
        NormalizedResult::Failure(info) => return Err(ClaimError::Protocol(info)),
    };

    match verify_verdict(&payload) {
        Verdict::Accepted { by } => {
            tracing::debug!(signal = by, "Verify reply accepted");
            Ok(extract_verification(&payload))
        }
        Verdict::Rejected { by } => {
            tracing::debug!(signal = by, "Verify reply rejected");
            Err(ClaimError::Protocol(ErrorInfo::new(
                Some(status),
                payload_message(&payload, fallback),
            )))
        }
        Verdict::Undetermined => Err(ClaimError::Protocol(ErrorInfo::new(
            Some(status),
            payload_message(&payload, "Verification response carried no eligibility signal"),
        ))),
    }
}

/// Turn a claim reply into a complete artifact bundle or an error.
pub fn interpret_claim(raw: &RawResponse) -> Result<ClaimArtifacts, ClaimError> {
    let fallback = Phase::Claim.fallback_message();
    let (status, payload) = match normalize(raw, fallback) {
        NormalizedResult::Success { status, payload } => (status, payload),
        NormalizedResult::Failure(info) => return Err(ClaimError::Protocol(info)),
    };

    match success_flag(&payload) {
        Some(signal) if signal.positive => {}
        Some(_) => {
            return Err(ClaimError::Protocol(ErrorInfo::new(
                Some(status),
                payload_message(&payload, fallback),
            )))
        }
        None => {
            return Err(ClaimError::Protocol(ErrorInfo::new(
                Some(status),
                payload_message(&payload, "Claim response did not report success"),
            )))
        }
    }

    match extract_artifacts(&payload) {
        ArtifactExtraction::Complete(artifacts) => Ok(artifacts),
        ArtifactExtraction::Incomplete { shape, missing } => {
            tracing::warn!(shape, missing = ?missing, "Claim reported success with incomplete wallet");
            Err(ClaimError::IncompleteArtifacts {
                http_status: status,
                missing,
            })
        }
        ArtifactExtraction::Absent => Err(ClaimError::IncompleteArtifacts {
            http_status: status,
            missing: required_artifact_fields(),
        }),
    }
}
