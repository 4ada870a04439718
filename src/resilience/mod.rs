//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the issuance service:
//!     → timeouts.rs (enforce request deadline)
//!     → On elapse: surfaced as TransportError::Timeout
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: the claim endpoint mints, and a blind resend could mint twice
//!   against a service that is not idempotent for retried calls

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineElapsed};
