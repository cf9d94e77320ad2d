//! Error types for gcpstudio

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pack operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid GCP archive {path}: {reason}")]
    ArchiveFormat { path: PathBuf, reason: String },

    #[error("info.json not found in {0}")]
    MissingManifest(PathBuf),

    #[error("Failed to parse {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("Deck id '{0}' is already used in this pack")]
    DuplicateDeckId(String),

    #[error("Required field '{field}' is empty")]
    MissingRequiredField { field: String },

    #[error("Failed to write {path}: {source}")]
    PackWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Asset not found: {0}")]
    AssetNotFound(PathBuf),

    #[error("Deck id '{0}' is not a plain file name")]
    InvalidDeckId(String),

    #[error("Deck '{0}' not found in pack")]
    DeckNotFound(String),

    #[error("No pack is currently open")]
    NoOpenPack,

    #[error("Image conversion failed for {path}: {reason}")]
    Image { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::ArchiveFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::ManifestParse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::PackWrite {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing_field(field: impl Into<String>) -> Self {
        Error::MissingRequiredField {
            field: field.into(),
        }
    }

    /// Whether the error only reports an absent optional asset
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, Error::AssetNotFound(_))
    }
}

/// Result type alias for pack operations
pub type Result<T> = std::result::Result<T, Error>;
