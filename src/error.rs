//! Error type shared by every resolution step.

use std::path::PathBuf;

use thiserror::Error;

use crate::policy::FailureKind;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Errors produced while resolving and rendering assets.
///
/// Only [`AssetError::AssetNotFound`], [`AssetError::RevisionNotFound`] and
/// [`AssetError::ManifestNotFound`] are subject to the configured failure policy.
/// Every other variant is always returned to the caller.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The resolved asset file does not exist on disk.
    #[error("asset '{}' not found", .path.display())]
    AssetNotFound {
        /// Absolute path that was checked.
        path: PathBuf,
    },

    /// The manifest has no entry for the requested asset.
    #[error("revision for asset '{asset}' not found in manifest {manifest}")]
    RevisionNotFound {
        /// Normalized asset path that was looked up.
        asset: String,
        /// Human readable manifest source (file path or `inline`).
        manifest: String,
    },

    /// No manifest could be located for the requested asset.
    #[error("manifest not found: {location}")]
    ManifestNotFound {
        /// Path or search description that failed.
        location: String,
    },

    /// The manifest source is not a valid JSON object of revisions.
    #[error("invalid JSON in manifest {manifest}")]
    ManifestParse {
        /// Human readable manifest source (file path or `inline`).
        manifest: String,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A path tried to escape above its root.
    #[error("path is outside of the defined root, path: '{path}', resolved: '{resolved}'")]
    InvalidPath {
        /// Path as supplied.
        path: String,
        /// Partially resolved form at the point of failure.
        resolved: String,
    },

    /// A format template used a placeholder outside the supported set.
    #[error(
        "invalid variable '{name}' in format '{template}', \
         use one of %content%, %raw%, %base%, %basePath%, %baseUrl%, %path%, %url%"
    )]
    UnrecognizedPlaceholder {
        /// Offending placeholder name without the `%` delimiters.
        name: String,
        /// Full template that contained it.
        template: String,
    },

    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A manifest filter pattern could not be compiled.
    #[error("invalid asset filter pattern")]
    InvalidFilter(#[from] regex::Error),

    /// Call arguments supplied by the template layer were malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Filesystem access failed for a reason other than a missing file.
    #[error("failed to read {}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Source I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl AssetError {
    /// Failure kind for errors that respect the configurable policy.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::AssetNotFound { .. } => Some(FailureKind::MissingAsset),
            Self::RevisionNotFound { .. } => Some(FailureKind::MissingRevision),
            Self::ManifestNotFound { .. } => Some(FailureKind::MissingManifest),
            _ => None,
        }
    }

    pub(crate) fn invalid_manifest(
        manifest: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::ManifestParse {
            manifest: manifest.into(),
            source: <serde_json::Error as serde::de::Error>::custom(message),
        }
    }
}
