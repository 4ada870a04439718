//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! transport + workflow produce:
//!     → audit.rs (append-only wire trace and transitions, operator-facing)
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request and phase counters, latency histogram)
//! ```
//!
//! # Design Decisions
//! - The audit log is session-scoped data, not just log output: it can be
//!   inspected and exported after the workflow finishes
//! - Audit entries are mirrored to tracing at debug level
//! - Metrics are cheap and recorder-agnostic

pub mod audit;
pub mod logging;
pub mod metrics;

pub use audit::{AuditEntry, AuditLog};
pub use logging::{init_logging, LogFormat};
