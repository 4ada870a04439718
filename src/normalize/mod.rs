//! Response normalization.
//!
//! # Data Flow
//! ```text
//! RawResponse
//!     → response.rs (JSON-or-text parse, non-2xx → ErrorInfo via fallback chain)
//!     → extract.rs (success signals, verification descriptors, wallet bundle)
//!     → workflow interprets the result for its phase
//! ```
//!
//! # Design Decisions
//! - One boundary absorbs every response shape the service has used
//! - Error text priority: `message`, `error`, raw body, phase fallback

pub mod extract;
pub mod response;

pub use extract::{extract_artifacts, extract_verification, verify_verdict, ArtifactExtraction, Verdict};
pub use response::{normalize, parse_body, payload_message, ErrorInfo, NormalizedResult};
