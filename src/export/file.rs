//! File export of claim artifacts.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::str::FromStr;

use crate::export::{ArtifactExporter, ExportError};
use crate::session::ClaimArtifacts;

/// On-disk format of an exported bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON with camelCase keys.
    Json,
    /// Labelled plain text.
    Text,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

/// Writes the bundle to a new file. Existing files are never overwritten and
/// on Unix the file is created readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileExporter {
    path: PathBuf,
    format: ExportFormat,
}

impl FileExporter {
    pub fn new(path: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    fn render(&self, bundle: &ClaimArtifacts) -> Result<String, ExportError> {
        Ok(match self.format {
            ExportFormat::Json => serde_json::to_string_pretty(bundle)? + "\n",
            ExportFormat::Text => bundle.to_text(),
        })
    }
}

impl FileExporter {
    fn create(&self) -> Result<File, ExportError> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options.open(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                ExportError::AlreadyExists(self.path.display().to_string())
            } else {
                ExportError::Io(e)
            }
        })
    }

    /// Run `write` against the new file, deleting it again on failure so a
    /// truncated secrets file neither lingers nor blocks the next export.
    fn write_or_remove<F>(&self, mut file: File, write: F) -> Result<(), ExportError>
    where
        F: FnOnce(&mut File) -> std::io::Result<()>,
    {
        let written = write(&mut file).and_then(|()| file.sync_all());
        drop(file);

        if let Err(e) = written {
            if let Err(cleanup) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %cleanup, "Failed to remove partial export");
            }
            return Err(ExportError::Io(e));
        }
        Ok(())
    }
}

impl ArtifactExporter for FileExporter {
    fn export_artifacts(&self, bundle: &ClaimArtifacts) -> Result<String, ExportError> {
        let contents = self.render(bundle)?;
        let file = self.create()?;
        self.write_or_remove(file, |file| file.write_all(contents.as_bytes()))?;

        Ok(self.path.display().to_string())
    }
}
