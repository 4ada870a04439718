//! Session context: claim identity and the artifacts each phase produces.
//!
//! # Security Constraints
//! - Nothing here is persisted; state lives only as long as the session
//! - Wallet secrets leave memory only through an explicit export
//! - `Debug` output of artifacts masks key material

pub mod artifacts;
pub mod context;
pub mod identity;

pub use artifacts::{ArtifactField, ClaimArtifacts, VerificationResult};
pub use context::SessionContext;
pub use identity::{ClaimIdentity, DeepLinkError};
