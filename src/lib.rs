//! Claim portal client library.
//!
//! Drives a two-phase redemption against a remote claim-issuance service:
//! verify eligibility for `(email, claim token)`, then redeem the verified
//! claim for a wallet and NFT mint.
//!
//! # Architecture Overview
//!
//! ```text
//!     ClaimIdentity ──▶ workflow ──▶ transport ──▶ issuance service
//!                          │             │
//!                          │             ▼
//!                          │         normalize (shape variants, error text)
//!                          ▼
//!                    session state ──▶ export (clipboard / file, explicit only)
//!
//!     Cross-cutting: config, observability (audit log, tracing, metrics), resilience
//! ```

// Core
pub mod normalize;
pub mod session;
pub mod transport;
pub mod workflow;

// Collaborators
pub mod export;
pub mod sandbox;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use config::PortalConfig;
pub use observability::AuditLog;
pub use session::{ClaimArtifacts, ClaimIdentity, VerificationResult};
pub use transport::{HttpTransport, Transport};
pub use workflow::{ClaimError, ClaimWorkflow, StateError, WorkflowState};
