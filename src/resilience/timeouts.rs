//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap issuance-service calls with a deadline
//! - Cancel the in-flight future cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - The protocol has no server-side cancellation handshake, so an elapsed
//!   deadline is reported to the workflow as a transport failure

use std::future::Future;
use std::time::Duration;

/// The deadline passed before the wrapped future completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineElapsed(pub Duration);

impl std::fmt::Display for DeadlineElapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "deadline of {:?} elapsed", self.0)
    }
}

impl std::error::Error for DeadlineElapsed {}

/// Run `fut` to completion or give up after `deadline`.
pub async fn with_deadline<F>(deadline: Duration, fut: F) -> Result<F::Output, DeadlineElapsed>
where
    F: Future,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineElapsed(deadline))
}
