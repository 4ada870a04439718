//! UI collaborators for handing artifacts to the user.
//!
//! The workflow never touches a clipboard or filesystem itself; it calls
//! these narrow interfaces, and only once the claim has been redeemed.

pub mod file;

use thiserror::Error;

use crate::session::ClaimArtifacts;
use crate::workflow::StateError;

pub use file::{ExportFormat, FileExporter};

/// Places text on the user's clipboard.
pub trait Clipboard {
    fn copy(&self, text: &str) -> Result<(), ExportError>;
}

/// Writes the artifact bundle somewhere the user chose.
pub trait ArtifactExporter {
    /// Export `bundle`, returning a description of where it went.
    fn export_artifacts(&self, bundle: &ClaimArtifacts) -> Result<String, ExportError>;
}

/// Errors from copy and export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export yet.
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{0} is not present in the claim artifacts")]
    FieldAbsent(&'static str),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(String),

    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize artifacts: {0}")]
    Serialize(#[from] serde_json::Error),
}
