//! Parsed revision manifest and the lookups it answers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::loading::{RevisionTable, collect_entries, load_manifest_file};
use crate::asset_paths::normalize_path;
use crate::config::Config;
use crate::error::{AssetError, Result};
use crate::models::{Asset, Revision};
use crate::policy::{FailureAction, FailureKind};
use crate::selection::{AssetFilter, PatternFilter};

const INLINE_LABEL: &str = "inline";

/// Revision table loaded from one manifest source.
#[derive(Debug)]
pub struct Manifest {
    config: Arc<Config>,
    source: Option<PathBuf>,
    table: RevisionTable,
}

impl Manifest {
    /// Parse a JSON manifest file.
    pub fn from_file(config: Arc<Config>, path: &Path) -> Result<Self> {
        let table = load_manifest_file(path)?;
        tracing::debug!(path = %path.display(), entries = table.len(), "loaded revision manifest");

        Ok(Self {
            config,
            source: Some(path.to_path_buf()),
            table,
        })
    }

    /// Wrap revisions supplied directly in configuration.
    pub fn from_entries(config: Arc<Config>, entries: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            config,
            source: None,
            table: collect_entries(INLINE_LABEL, entries)?,
        })
    }

    /// File the manifest was read from; `None` for inline manifests.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Raw token stored for an already normalised asset path.
    pub fn token(&self, asset_path: &str) -> Option<&str> {
        self.table.get(asset_path)
    }

    /// Entries in manifest order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.table.iter()
    }

    /// Resolve the revision of an asset.
    ///
    /// A missing entry goes through the `missingRevision` policy; when it is not raised the
    /// result is an `unknown` version revision.
    pub fn get_revision(&self, path: &str, need: bool) -> Result<Revision> {
        let path = normalize_path(path.trim_start_matches('/'))?;
        let token = self.table.get(&path);

        if token.is_none() {
            self.fail(
                FailureKind::MissingRevision,
                AssetError::RevisionNotFound {
                    asset: path.clone(),
                    manifest: self.label(),
                },
                need,
            )?;
        }

        Revision::new(&self.config, path, token)
    }

    /// Resolve an asset and check that the file it points to exists.
    pub fn get_asset(&self, path: &str, need: bool) -> Result<Asset> {
        let revision = self.get_revision(path, need)?;

        if !revision.absolute_path().exists() {
            self.fail(
                FailureKind::MissingAsset,
                AssetError::AssetNotFound {
                    path: revision.absolute_path().to_path_buf(),
                },
                need,
            )?;
        }

        Ok(Asset::new(revision))
    }

    /// Resolve every entry accepted by `filter`, in manifest order.
    pub fn get_all(
        &self,
        filter: Option<&dyn AssetFilter>,
        need: bool,
    ) -> Result<Vec<(String, Asset)>> {
        self.table
            .iter()
            .filter(|(path, _)| filter.is_none_or(|filter| filter.is_included(path)))
            .map(|(path, _)| Ok((path.to_string(), self.get_asset(path, need)?)))
            .collect()
    }

    /// Resolve every entry whose path matches a regular expression.
    pub fn get_all_matching(&self, pattern: &str, need: bool) -> Result<Vec<(String, Asset)>> {
        let filter = PatternFilter::new(pattern)?;
        self.get_all(Some(&filter), need)
    }

    fn fail(&self, kind: FailureKind, error: AssetError, need: bool) -> Result<()> {
        FailureAction::resolve(self.config.policy(kind), need).apply(error)
    }

    fn label(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => INLINE_LABEL.to_string(),
        }
    }
}
