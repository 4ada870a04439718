//! The claim-redemption state machine.
//!
//! # Responsibilities
//! - Validate the identity before any request is sent
//! - Serialize phases: check-and-transition happens under one lock, the lock
//!   is never held across the transport await
//! - Route every transition and every rejected operation through the audit log
//! - Expose artifacts only once, through explicit copy/export collaborators

use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::PortalConfig;
use crate::export::{ArtifactExporter, Clipboard, ExportError};
use crate::observability::{metrics, AuditLog};
use crate::session::{ArtifactField, ClaimArtifacts, ClaimIdentity, SessionContext, VerificationResult};
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::workflow::error::{ClaimError, StateError};
use crate::workflow::interpret::{interpret_claim, interpret_verify};
use crate::workflow::state::{Event, Failure, Phase, WorkflowState};

/// One redemption session against the issuance service.
///
/// `Send + Sync`; share it behind an `Arc` when a UI and a worker both need it.
pub struct ClaimWorkflow<T> {
    transport: T,
    verify_url: String,
    claim_url: String,
    allow_email_only: bool,
    audit: AuditLog,
    session: Mutex<SessionContext>,
}

impl ClaimWorkflow<HttpTransport> {
    /// Build a workflow talking HTTP to the configured service.
    pub fn from_config(config: &PortalConfig) -> Result<Self, TransportError> {
        let audit = AuditLog::with_redaction(config.audit.redact_secrets);
        let transport = HttpTransport::new(&config.service, &config.timeouts, audit.clone())?;
        Ok(Self::new(transport, config, audit))
    }
}

impl<T> ClaimWorkflow<T> {
    /// Build a workflow over any transport. `audit` should be the log the
    /// transport records into, so wire traffic and transitions interleave.
    pub fn new(transport: T, config: &PortalConfig, audit: AuditLog) -> Self {
        let session = SessionContext::new();
        audit.record(
            "Session started",
            json!({
                "sessionId": session.id().to_string(),
                "verifyUrl": config.service.verify_url(),
                "claimUrl": config.service.claim_url(),
                "allowEmailOnly": config.workflow.allow_email_only,
            }),
        );

        Self {
            transport,
            verify_url: config.service.verify_url(),
            claim_url: config.service.claim_url(),
            allow_email_only: config.workflow.allow_email_only,
            audit,
            session: Mutex::new(session),
        }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn session_id(&self) -> Uuid {
        self.lock().id()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> WorkflowState {
        self.lock().state().clone()
    }

    /// True while a verify or claim request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.lock().state().is_in_flight()
    }

    pub fn identity(&self) -> Option<ClaimIdentity> {
        self.lock().identity().cloned()
    }

    pub fn verification(&self) -> Option<VerificationResult> {
        self.lock().verification().cloned()
    }

    pub fn artifacts(&self) -> Option<ClaimArtifacts> {
        self.lock().artifacts().cloned()
    }

    /// Return to `Unverified`, discarding identity, verification result and
    /// artifacts. Rejected while a request is in flight.
    pub fn reset(&self) -> Result<(), ClaimError> {
        let mut session = self.lock();
        self.transition(&mut session, Event::Reset)?;
        session.clear();
        Ok(())
    }

    /// Copy one artifact field through the UI's clipboard.
    pub fn copy_field(
        &self,
        field: ArtifactField,
        clipboard: &dyn Clipboard,
    ) -> Result<(), ExportError> {
        let value = {
            let session = self.lock();
            let artifacts = session.artifacts().ok_or(StateError::NotClaimed {
                state: session.state().name(),
            })?;
            artifacts
                .field(field)
                .map(str::to_owned)
                .ok_or(ExportError::FieldAbsent(field.label()))?
        };

        clipboard.copy(&value)?;
        self.audit.record(
            "Artifact field copied",
            json!({ "field": field.label(), "secret": field.is_secret() }),
        );
        Ok(())
    }

    /// Hand the artifact bundle to a user-selected exporter.
    pub fn export_artifacts(&self, exporter: &dyn ArtifactExporter) -> Result<String, ExportError> {
        let artifacts = {
            let session = self.lock();
            session.artifacts().cloned().ok_or(StateError::NotClaimed {
                state: session.state().name(),
            })?
        };

        let location = exporter.export_artifacts(&artifacts)?;
        self.audit.record(
            "Artifacts exported",
            json!({ "location": location, "walletAddress": artifacts.wallet_address }),
        );
        tracing::info!(location = %location, "Artifacts exported");
        Ok(location)
    }

    fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `event` and record the transition. On rejection the state is
    /// left untouched and the rejection is recorded instead.
    fn transition(&self, session: &mut SessionContext, event: Event) -> Result<(), StateError> {
        let event_name = event.name();
        let current = session.replace_state(WorkflowState::Unverified);
        let from = current.name();

        match current.apply(event) {
            Ok(next) => {
                let to = next.name();
                tracing::info!(
                    session_id = %session.id(),
                    from,
                    to,
                    event = event_name,
                    "State transition"
                );
                self.audit.record(
                    "State transition",
                    json!({
                        "sessionId": session.id().to_string(),
                        "event": event_name,
                        "from": from,
                        "to": to,
                        "detail": transition_detail(&next),
                    }),
                );
                match &next {
                    WorkflowState::Verifying => session.set_verification(None),
                    WorkflowState::Verified(result) => session.set_verification(Some(result.clone())),
                    _ => {}
                }
                session.replace_state(next);
                Ok(())
            }
            Err((current, e)) => {
                session.replace_state(current);
                tracing::warn!(session_id = %session.id(), event = event_name, error = %e, "Operation rejected");
                self.audit.record(
                    "Operation rejected",
                    json!({
                        "sessionId": session.id().to_string(),
                        "event": event_name,
                        "state": from,
                        "error": e.to_string(),
                    }),
                );
                Err(e)
            }
        }
    }

    /// Settle an in-flight phase with its outcome.
    fn complete<O: Clone>(
        &self,
        phase: Phase,
        outcome: Result<O, ClaimError>,
        on_success: fn(O) -> Event,
    ) -> Result<O, ClaimError> {
        let mut session = self.lock();
        match outcome {
            Ok(output) => {
                self.transition(&mut session, on_success(output.clone()))?;
                metrics::record_phase(phase.as_str(), "success");
                Ok(output)
            }
            Err(cause) => Err(self.fail(&mut session, phase, cause)),
        }
    }

    /// Move to `Failed` for `phase`, returning the cause for the caller.
    fn fail(&self, session: &mut SessionContext, phase: Phase, cause: ClaimError) -> ClaimError {
        let event = Event::PhaseFailed(Failure {
            phase,
            cause: cause.clone(),
        });
        if let Err(e) = self.transition(session, event) {
            return ClaimError::State(e);
        }
        metrics::record_phase(phase.as_str(), cause.kind());
        tracing::warn!(phase = phase.as_str(), error = %cause, "Phase failed");
        cause
    }
}

impl<T: Transport> ClaimWorkflow<T> {
    /// Check eligibility of `identity`.
    ///
    /// Legal from `Unverified`, `Verified` and `Failed`. Once a request has
    /// been sent for an identity, a different identity needs [`reset`](Self::reset).
    pub async fn verify(&self, identity: ClaimIdentity) -> Result<VerificationResult, ClaimError> {
        let identity = identity.normalized();
        {
            let mut session = self.lock();
            if let Err(e) = session.state().check(&Event::BeginVerify) {
                return Err(self.reject(&session, "verify", e));
            }
            if let Some(bound) = session.identity() {
                if bound != &identity && !identity_replaceable(session.state()) {
                    return Err(self.reject(&session, "verify", StateError::IdentityLocked));
                }
            }

            session.set_identity(identity.clone());
            if let Err(cause) = self.validate(&identity) {
                return Err(self.fail(&mut session, Phase::Verify, cause));
            }
            self.transition(&mut session, Event::BeginVerify)?;
        }

        let payload = request_payload(&identity);
        let guard = InFlightGuard::arm(self, Phase::Verify, &self.verify_url);
        let outcome = match self.transport.send(&self.verify_url, &payload).await {
            Ok(raw) => interpret_verify(&raw),
            Err(e) => Err(ClaimError::Transport(e)),
        };
        guard.disarm();

        self.complete(Phase::Verify, outcome, Event::VerifySucceeded)
    }

    /// Re-run verify for the identity already bound to this session.
    pub async fn reverify(&self) -> Result<VerificationResult, ClaimError> {
        let identity = {
            let session = self.lock();
            match session.identity() {
                Some(identity) => identity.clone(),
                None => return Err(self.reject(&session, "verify", StateError::NoIdentity)),
            }
        };
        self.verify(identity).await
    }

    /// Redeem the verified claim for a wallet and NFT mint.
    ///
    /// Only legal from `Verified`. Anything else fails with a
    /// [`StateError`] before a request is sent.
    pub async fn claim(&self) -> Result<ClaimArtifacts, ClaimError> {
        let identity = {
            let mut session = self.lock();
            if let Err(e) = session.state().check(&Event::BeginClaim) {
                return Err(self.reject(&session, "claim", e));
            }
            let Some(identity) = session.identity().cloned() else {
                return Err(self.reject(&session, "claim", StateError::NoIdentity));
            };
            self.transition(&mut session, Event::BeginClaim)?;
            identity
        };

        let payload = request_payload(&identity);
        let guard = InFlightGuard::arm(self, Phase::Claim, &self.claim_url);
        let outcome = match self.transport.send(&self.claim_url, &payload).await {
            Ok(raw) => interpret_claim(&raw),
            Err(e) => Err(ClaimError::Transport(e)),
        };
        guard.disarm();

        let artifacts = self.complete(Phase::Claim, outcome, Event::ClaimSucceeded)?;
        tracing::info!(wallet_address = %artifacts.wallet_address, "Claim redeemed");
        Ok(artifacts)
    }

    fn validate(&self, identity: &ClaimIdentity) -> Result<(), ClaimError> {
        if identity.email.trim().is_empty() {
            return Err(ClaimError::Validation("Email is required".to_string()));
        }
        if !identity.has_token() && !self.allow_email_only {
            return Err(ClaimError::Validation(
                "Claim token is required".to_string(),
            ));
        }
        Ok(())
    }

    fn reject(&self, session: &SessionContext, operation: &'static str, e: StateError) -> ClaimError {
        tracing::warn!(session_id = %session.id(), operation, error = %e, "Operation rejected");
        self.audit.record(
            "Operation rejected",
            json!({
                "sessionId": session.id().to_string(),
                "operation": operation,
                "state": session.state().name(),
                "error": e.to_string(),
            }),
        );
        ClaimError::State(e)
    }
}

/// Fails the in-flight phase if its future is dropped before completion, so
/// the session cannot stay stuck in `Verifying`/`Claiming`.
struct InFlightGuard<'a, T> {
    workflow: &'a ClaimWorkflow<T>,
    phase: Phase,
    url: &'a str,
    armed: bool,
}

impl<'a, T> InFlightGuard<'a, T> {
    fn arm(workflow: &'a ClaimWorkflow<T>, phase: Phase, url: &'a str) -> Self {
        Self {
            workflow,
            phase,
            url,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let cause = ClaimError::Transport(TransportError::Request {
            url: self.url.to_string(),
            cause: "request cancelled before a response arrived".to_string(),
        });
        let mut session = self.workflow.lock();
        if session.state().in_flight_phase() == Some(self.phase) {
            let _ = self.workflow.transition(
                &mut session,
                Event::PhaseFailed(Failure {
                    phase: self.phase,
                    cause,
                }),
            );
        }
    }
}

/// An identity may be swapped before any request was sent for it.
fn identity_replaceable(state: &WorkflowState) -> bool {
    match state {
        WorkflowState::Unverified => true,
        WorkflowState::Failed(failure) => matches!(failure.cause, ClaimError::Validation(_)),
        _ => false,
    }
}

fn request_payload(identity: &ClaimIdentity) -> Value {
    let mut payload = json!({ "email": identity.email });
    if let Some(token) = &identity.claim_token {
        payload["claimToken"] = Value::String(token.clone());
    }
    payload
}

fn transition_detail(state: &WorkflowState) -> Value {
    match state {
        WorkflowState::Verified(result) => json!({
            "orderReference": result.order_reference,
            "issuedAt": result.issued_at,
        }),
        WorkflowState::Claimed(artifacts) => json!({
            "walletAddress": artifacts.wallet_address,
            "nftTokenId": artifacts.nft_token_id,
            "transactionHash": artifacts.transaction_hash,
        }),
        WorkflowState::Failed(failure) => {
            let info = failure.cause.info();
            json!({
                "phase": failure.phase,
                "kind": failure.cause.kind(),
                "httpStatus": info.http_status,
                "message": info.message,
            })
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ErrorInfo;
    use crate::transport::RawResponse;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    type Reply = Result<RawResponse, TransportError>;

    /// Transport that replays canned replies and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: StdMutex<VecDeque<Reply>>,
        calls: StdMutex<Vec<(String, Value)>>,
        delay: Option<Duration>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: StdMutex::new(replies.into()),
                ..Default::default()
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(&self, endpoint: &str, payload: &Value) -> Result<RawResponse, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), payload.clone()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self.replies.lock().unwrap().pop_front();
            reply.unwrap_or_else(|| {
                Err(TransportError::Request {
                    url: endpoint.to_string(),
                    cause: "no scripted reply".to_string(),
                })
            })
        }
    }

    fn ok(status: u16, body: &str) -> Reply {
        Ok(RawResponse::new(status, body))
    }

    fn config(allow_email_only: bool) -> PortalConfig {
        let mut config = PortalConfig::default();
        config.service.base_url = "http://issuer.test".to_string();
        config.workflow.allow_email_only = allow_email_only;
        config
    }

    fn workflow(replies: Vec<Reply>) -> ClaimWorkflow<ScriptedTransport> {
        ClaimWorkflow::new(ScriptedTransport::new(replies), &config(false), AuditLog::new())
    }

    fn identity() -> ClaimIdentity {
        ClaimIdentity::with_token("a@b.com", "T1")
    }

    const VERIFIED: &str = r#"{"success":true,"orderId":"O1"}"#;
    const CLAIMED: &str =
        r#"{"success":true,"walletDetails":{"address":"0xA","privateKey":"K","mnemonic":"M"}}"#;

    fn failure(state: WorkflowState) -> Failure {
        match state {
            WorkflowState::Failed(failure) => failure,
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_redemption() {
        let wf = workflow(vec![ok(200, VERIFIED), ok(200, CLAIMED)]);

        let result = wf.verify(identity()).await.unwrap();
        assert_eq!(result.order_reference.as_deref(), Some("O1"));
        assert!(matches!(wf.state(), WorkflowState::Verified(_)));

        let artifacts = wf.claim().await.unwrap();
        assert_eq!(artifacts.wallet_address, "0xA");
        assert_eq!(artifacts.wallet_private_key, "K");
        assert_eq!(artifacts.wallet_recovery_phrase, "M");
        assert_eq!(wf.state(), WorkflowState::Claimed(artifacts.clone()));
        assert_eq!(wf.artifacts(), Some(artifacts));
        assert_eq!(wf.verification().unwrap().order_reference.as_deref(), Some("O1"));

        let calls = wf.transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "http://issuer.test/api/claim/verify");
        assert_eq!(calls[0].1, json!({"email": "a@b.com", "claimToken": "T1"}));
        assert_eq!(calls[1].0, "http://issuer.test/api/claim/process");
        assert_eq!(calls[1].1, json!({"email": "a@b.com", "claimToken": "T1"}));

        let transitions: Vec<String> = wf
            .audit()
            .entries()
            .into_iter()
            .filter(|e| e.message == "State transition")
            .map(|e| e.data["to"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(transitions, ["verifying", "verified", "claiming", "claimed"]);
    }

    #[tokio::test]
    async fn test_plain_text_404() {
        let wf = workflow(vec![ok(404, "Not Found")]);

        let err = wf.verify(identity()).await.unwrap_err();
        assert_eq!(err, ClaimError::Protocol(ErrorInfo::new(Some(404), "Not Found")));

        let failure = failure(wf.state());
        assert_eq!(failure.phase, Phase::Verify);
        assert_eq!(failure.cause.info(), ErrorInfo::new(Some(404), "Not Found"));
        assert_eq!(wf.identity(), Some(identity()));
    }

    #[tokio::test]
    async fn test_success_conventions() {
        let cases = [
            (r#"{"success":true}"#, true),
            (r#"{"success":false}"#, false),
            (r#"{"valid":true,"metadata":{"sku":"R-1"}}"#, true),
            (r#"{"valid":false,"message":"Invalid token"}"#, false),
            (r#"{"eligible":true}"#, true),
            (r#"{"eligible":false}"#, false),
            (r#"{"claimId":"C1"}"#, true),
            (r#"{"status":"pending"}"#, false),
        ];
        for (body, accepted) in cases {
            let wf = workflow(vec![ok(200, body)]);
            let result = wf.verify(identity()).await;
            assert_eq!(result.is_ok(), accepted, "body {}", body);
            assert_eq!(
                matches!(wf.state(), WorkflowState::Verified(_)),
                accepted,
                "body {}",
                body
            );
        }
    }

    #[tokio::test]
    async fn test_claim_before_verify_sends_nothing() {
        let wf = workflow(vec![ok(200, CLAIMED)]);

        let err = wf.claim().await.unwrap_err();
        assert_eq!(
            err,
            ClaimError::State(StateError::NotVerified { state: "unverified" })
        );
        assert_eq!(wf.state(), WorkflowState::Unverified);
        assert!(wf.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reset_discards_verification() {
        let wf = workflow(vec![ok(200, VERIFIED), ok(200, CLAIMED)]);
        wf.verify(identity()).await.unwrap();

        wf.reset().unwrap();
        assert_eq!(wf.state(), WorkflowState::Unverified);
        assert_eq!(wf.verification(), None);
        assert_eq!(wf.identity(), None);

        let err = wf.claim().await.unwrap_err();
        assert!(err.is_state_error());
        assert_eq!(wf.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_after_claim_discards_artifacts() {
        let wf = workflow(vec![ok(200, VERIFIED), ok(200, CLAIMED)]);
        wf.verify(identity()).await.unwrap();
        wf.claim().await.unwrap();

        wf.reset().unwrap();
        assert_eq!(wf.artifacts(), None);
        assert!(wf.claim().await.unwrap_err().is_state_error());
    }

    #[tokio::test]
    async fn test_incomplete_artifacts_then_reverify() {
        let wf = workflow(vec![
            ok(200, VERIFIED),
            ok(200, r#"{"success":true,"walletDetails":{"privateKey":"K","mnemonic":"M"}}"#),
            ok(200, VERIFIED),
            ok(200, CLAIMED),
        ]);
        wf.verify(identity()).await.unwrap();

        let err = wf.claim().await.unwrap_err();
        assert_eq!(
            err,
            ClaimError::IncompleteArtifacts {
                http_status: 200,
                missing: vec!["walletDetails.address".to_string()],
            }
        );
        let failed = failure(wf.state());
        assert_eq!(failed.phase, Phase::Claim);

        // No blind retry of claim from Failed.
        let err = wf.claim().await.unwrap_err();
        assert_eq!(err, ClaimError::State(StateError::NotVerified { state: "failed" }));
        assert_eq!(wf.transport.calls().len(), 2);

        wf.reverify().await.unwrap();
        let artifacts = wf.claim().await.unwrap();
        assert_eq!(artifacts.wallet_address, "0xA");
    }

    #[tokio::test]
    async fn test_validation_failures_send_nothing() {
        let wf = workflow(vec![]);

        let err = wf.verify(ClaimIdentity::with_token("  ", "T1")).await.unwrap_err();
        assert!(matches!(err, ClaimError::Validation(_)));
        assert_eq!(failure(wf.state()).phase, Phase::Verify);

        // A rejected identity can be corrected without a reset.
        let err = wf.verify(ClaimIdentity::email_only("a@b.com")).await.unwrap_err();
        assert_eq!(err, ClaimError::Validation("Claim token is required".to_string()));
        assert!(wf.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unnormalized_identity_is_validated() {
        let wf = workflow(vec![ok(200, VERIFIED), ok(200, VERIFIED)]);

        let blank: ClaimIdentity =
            serde_json::from_value(json!({"email": "   ", "claimToken": ""})).unwrap();
        let err = wf.verify(blank).await.unwrap_err();
        assert_eq!(err, ClaimError::Validation("Email is required".to_string()));

        let padded = ClaimIdentity {
            email: " a@b.com ".to_string(),
            claim_token: Some("   ".to_string()),
        };
        let err = wf.verify(padded).await.unwrap_err();
        assert_eq!(err, ClaimError::Validation("Claim token is required".to_string()));

        assert!(wf.transport.calls().is_empty());
        assert_eq!(failure(wf.state()).phase, Phase::Verify);
    }

    #[tokio::test]
    async fn test_padded_identity_is_sent_trimmed() {
        let wf = workflow(vec![ok(200, VERIFIED)]);
        let padded = ClaimIdentity {
            email: " a@b.com ".to_string(),
            claim_token: Some(" T1 ".to_string()),
        };

        wf.verify(padded).await.unwrap();
        assert_eq!(
            wf.transport.calls()[0].1,
            json!({"email": "a@b.com", "claimToken": "T1"})
        );
        assert_eq!(wf.identity(), Some(identity()));
    }

    #[tokio::test]
    async fn test_email_only_when_permitted() {
        let wf = ClaimWorkflow::new(
            ScriptedTransport::new(vec![ok(200, r#"{"eligible":true}"#)]),
            &config(true),
            AuditLog::new(),
        );

        wf.verify(ClaimIdentity::email_only("a@b.com")).await.unwrap();
        assert_eq!(wf.transport.calls()[0].1, json!({"email": "a@b.com"}));
    }

    #[tokio::test]
    async fn test_transport_error_preserves_identity() {
        let wf = workflow(vec![
            Err(TransportError::Connect {
                url: "http://issuer.test/api/claim/verify".into(),
                cause: "connection refused".into(),
            }),
            ok(200, VERIFIED),
        ]);

        let err = wf.verify(identity()).await.unwrap_err();
        assert!(matches!(err, ClaimError::Transport(TransportError::Connect { .. })));
        assert_eq!(err.info().http_status, None);
        assert_eq!(wf.identity(), Some(identity()));

        wf.reverify().await.unwrap();
        assert!(matches!(wf.state(), WorkflowState::Verified(_)));
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let wf = ClaimWorkflow::new(
            ScriptedTransport::new(vec![ok(200, VERIFIED)]).delayed(Duration::from_millis(200)),
            &config(false),
            AuditLog::new(),
        );

        let second = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(wf.is_in_flight());
            let verify = wf.verify(identity()).await;
            let claim = wf.claim().await;
            let reset = wf.reset();
            (verify, claim, reset)
        };
        let (first, (verify, claim, reset)) = tokio::join!(wf.verify(identity()), second);

        assert!(first.is_ok());
        let in_flight = ClaimError::State(StateError::InFlight { phase: "verify" });
        assert_eq!(verify.unwrap_err(), in_flight);
        assert_eq!(claim.unwrap_err(), in_flight);
        assert_eq!(reset.unwrap_err(), in_flight);
        assert_eq!(wf.transport.calls().len(), 1);
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_cancelled_request_fails_phase() {
        let wf = ClaimWorkflow::new(
            ScriptedTransport::new(vec![ok(200, VERIFIED), ok(200, VERIFIED)])
                .delayed(Duration::from_millis(300)),
            &config(false),
            AuditLog::new(),
        );

        let timed_out = tokio::time::timeout(Duration::from_millis(20), wf.verify(identity())).await;
        assert!(timed_out.is_err());

        let failed = failure(wf.state());
        assert_eq!(failed.phase, Phase::Verify);
        assert!(matches!(failed.cause, ClaimError::Transport(_)));
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_identity_locked_until_reset() {
        let wf = workflow(vec![ok(200, VERIFIED), ok(200, VERIFIED)]);
        wf.verify(identity()).await.unwrap();

        let other = ClaimIdentity::with_token("c@d.com", "T2");
        let err = wf.verify(other.clone()).await.unwrap_err();
        assert_eq!(err, ClaimError::State(StateError::IdentityLocked));
        assert!(matches!(wf.state(), WorkflowState::Verified(_)));

        wf.reset().unwrap();
        wf.verify(other.clone()).await.unwrap();
        assert_eq!(wf.identity(), Some(other));
    }

    #[tokio::test]
    async fn test_claimed_is_terminal() {
        let wf = workflow(vec![ok(200, VERIFIED), ok(200, CLAIMED)]);
        wf.verify(identity()).await.unwrap();
        wf.claim().await.unwrap();

        assert_eq!(
            wf.verify(identity()).await.unwrap_err(),
            ClaimError::State(StateError::AlreadyClaimed)
        );
        assert_eq!(
            wf.claim().await.unwrap_err(),
            ClaimError::State(StateError::AlreadyClaimed)
        );
        assert_eq!(wf.transport.calls().len(), 2);
    }

    #[derive(Default)]
    struct RecordingClipboard(StdMutex<Vec<String>>);

    impl Clipboard for RecordingClipboard {
        fn copy(&self, text: &str) -> Result<(), ExportError> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct MemoryExporter(StdMutex<Option<ClaimArtifacts>>);

    impl ArtifactExporter for MemoryExporter {
        fn export_artifacts(&self, bundle: &ClaimArtifacts) -> Result<String, ExportError> {
            *self.0.lock().unwrap() = Some(bundle.clone());
            Ok("memory".to_string())
        }
    }

    #[tokio::test]
    async fn test_copy_and_export_only_after_claim() {
        let wf = workflow(vec![ok(200, VERIFIED), ok(200, CLAIMED)]);
        let clipboard = RecordingClipboard::default();
        let exporter = MemoryExporter(StdMutex::new(None));

        assert!(matches!(
            wf.copy_field(ArtifactField::WalletAddress, &clipboard),
            Err(ExportError::State(StateError::NotClaimed { .. }))
        ));

        wf.verify(identity()).await.unwrap();
        assert!(wf.export_artifacts(&exporter).is_err());
        wf.claim().await.unwrap();

        wf.copy_field(ArtifactField::WalletAddress, &clipboard).unwrap();
        wf.copy_field(ArtifactField::RecoveryPhrase, &clipboard).unwrap();
        assert_eq!(*clipboard.0.lock().unwrap(), ["0xA", "M"]);
        assert!(matches!(
            wf.copy_field(ArtifactField::TransactionHash, &clipboard),
            Err(ExportError::FieldAbsent(_))
        ));

        assert_eq!(wf.export_artifacts(&exporter).unwrap(), "memory");
        assert_eq!(
            exporter.0.lock().unwrap().as_ref().map(|a| a.wallet_address.as_str()),
            Some("0xA")
        );
        assert!(wf
            .audit()
            .entries()
            .iter()
            .any(|e| e.message == "Artifacts exported"));
    }
}
