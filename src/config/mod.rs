//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (CLAIM_PORTAL_API_URL)
//!     → validation.rs (semantic checks)
//!     → PortalConfig (validated, immutable)
//!     → handed to transport, workflow and audit log at session start
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a session never observes a change
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuditConfig, ObservabilityConfig, PortalConfig, ServiceConfig, TimeoutConfig, WorkflowConfig,
};
