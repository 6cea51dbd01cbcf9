//! Values produced while resolving an asset against a manifest.

use std::path::{Path, PathBuf};

use crate::asset_paths::{is_renamed_path_token, join_under_root, normalize_path};
use crate::config::Config;
use crate::error::Result;

/// Raw value reported for assets without a revision.
pub const UNKNOWN_REVISION: &str = "unknown";

/// How a manifest token changes the asset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionKind {
    /// The asset keeps its path and the token is appended as a `?v=` query value.
    Version(String),
    /// The build renamed the asset; the value is the new relative path.
    RenamedPath(String),
}

impl RevisionKind {
    /// Classify a manifest token.
    ///
    /// Tokens containing `/` or `.` are renamed paths and get normalised; anything else is an
    /// opaque version string.
    pub fn classify(token: &str) -> Result<Self> {
        if is_renamed_path_token(token) {
            let path = normalize_path(token.trim_start_matches('/'))?;
            Ok(Self::RenamedPath(path.trim_start_matches('/').to_string()))
        } else {
            Ok(Self::Version(token.to_string()))
        }
    }
}

/// A manifest entry resolved for one asset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    asset_path: String,
    raw_value: String,
    kind: RevisionKind,
    relative_path: String,
    absolute_path: PathBuf,
    relative_url: String,
}

impl Revision {
    /// Build the revision of `asset_path` from its manifest token, if any.
    pub fn new(
        config: &Config,
        asset_path: impl Into<String>,
        token: Option<&str>,
    ) -> Result<Self> {
        let asset_path = asset_path.into();
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            return Self::unresolved(config, asset_path);
        };

        let kind = RevisionKind::classify(token)?;
        let relative_path = match &kind {
            RevisionKind::Version(_) => asset_path.clone(),
            RevisionKind::RenamedPath(path) => path.clone(),
        };
        let on_disk = normalize_path(relative_path.trim_start_matches('/'))?;
        let absolute_path = join_under_root(config.assets_root(), &on_disk);
        Ok(Self::from_kind(asset_path, token.to_string(), kind, absolute_path))
    }

    /// Revision for an asset without any manifest entry.
    ///
    /// The path is reported exactly as given. The file location on disk comes from the
    /// normalised path, so a path climbing above the assets root fails with
    /// [`crate::AssetError::InvalidPath`].
    pub fn unresolved(config: &Config, asset_path: impl Into<String>) -> Result<Self> {
        let asset_path = asset_path.into();
        let normalized = normalize_path(asset_path.trim_start_matches('/'))?;
        let absolute_path = join_under_root(config.assets_root(), &normalized);
        let kind = RevisionKind::Version(UNKNOWN_REVISION.to_string());

        Ok(Self::from_kind(
            asset_path,
            UNKNOWN_REVISION.to_string(),
            kind,
            absolute_path,
        ))
    }

    fn from_kind(
        asset_path: String,
        raw_value: String,
        kind: RevisionKind,
        absolute_path: PathBuf,
    ) -> Self {
        let (relative_path, relative_url) = match &kind {
            RevisionKind::Version(version) => {
                (asset_path.clone(), format!("{asset_path}?v={version}"))
            }
            RevisionKind::RenamedPath(path) => (path.clone(), path.clone()),
        };

        Self {
            asset_path,
            raw_value,
            kind,
            relative_path,
            absolute_path,
            relative_url,
        }
    }

    /// Manifest token, or `unknown` when the asset has none.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Whether the token is a version appended as a query value.
    pub fn is_version(&self) -> bool {
        matches!(self.kind, RevisionKind::Version(_))
    }

    /// Classified token.
    pub fn kind(&self) -> &RevisionKind {
        &self.kind
    }

    /// Asset path the revision was resolved for.
    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    /// Path of the file to serve, relative to the assets root.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Location of the file to serve on disk.
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Relative URL fragment, including the `?v=` query for versions.
    pub fn relative_url(&self) -> &str {
        &self.relative_url
    }
}

/// A resolved asset ready to be formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    revision: Revision,
}

impl Asset {
    /// Wrap a resolved revision.
    pub fn new(revision: Revision) -> Self {
        Self { revision }
    }

    /// Underlying revision.
    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    /// Asset path the asset was requested as.
    pub fn asset_path(&self) -> &str {
        self.revision.asset_path()
    }

    /// Path of the file to serve, relative to the assets root.
    pub fn relative_path(&self) -> &str {
        self.revision.relative_path()
    }

    /// Location of the file to serve on disk.
    pub fn absolute_path(&self) -> &Path {
        self.revision.absolute_path()
    }

    /// Relative URL fragment for the asset.
    pub fn relative_url(&self) -> &str {
        self.revision.relative_url()
    }
}
