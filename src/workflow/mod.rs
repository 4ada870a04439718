//! Claim-redemption workflow.
//!
//! # Data Flow
//! ```text
//! ClaimIdentity (flags or deep link)
//!     → machine.rs verify(): validate → Verifying → transport → interpret.rs
//!     → Verified | Failed{verify}
//!     → machine.rs claim(): Verified → Claiming → transport → interpret.rs
//!     → Claimed(artifacts) | Failed{claim}
//! ```
//!
//! # Design Decisions
//! - state.rs owns the transition table; the machine never assigns a state directly
//! - No automatic retries; a failed claim needs re-verification first
//! - Illegal invocations fail fast with `StateError` and leave state untouched

pub mod error;
pub mod interpret;
pub mod machine;
pub mod state;

pub use error::{ClaimError, StateError};
pub use machine::ClaimWorkflow;
pub use state::{Failure, Phase, WorkflowState};
