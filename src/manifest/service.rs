//! Locating, caching and querying the manifest that applies to an asset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::revisions::Manifest;
use crate::asset_paths::{generate_manifest_candidates, join_under_root, normalize_path};
use crate::config::{Config, ManifestSource};
use crate::error::{AssetError, Result};
use crate::models::{Asset, Revision};
use crate::policy::{FailureAction, FailureKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ManifestKey {
    Inline,
    File(PathBuf),
}

/// Entry point for asset lookups.
///
/// Parsed manifests are memoised per resolved source for the lifetime of the service and are
/// never reloaded; create a new service to observe a manifest that changed on disk.
#[derive(Debug)]
pub struct ManifestService {
    config: Arc<Config>,
    manifests: DashMap<ManifestKey, Arc<Manifest>>,
}

impl ManifestService {
    /// Create a service with an empty manifest cache.
    pub fn new(config: Config) -> Self {
        Self::with_shared_config(Arc::new(config))
    }

    /// Create a service around a configuration shared with other components.
    pub fn with_shared_config(config: Arc<Config>) -> Self {
        Self {
            config,
            manifests: DashMap::new(),
        }
    }

    /// Configuration the service resolves against.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of manifests parsed and cached so far.
    pub fn cached_manifests(&self) -> usize {
        self.manifests.len()
    }

    /// Manifest that applies to `asset_path`.
    ///
    /// Inline manifests answer every lookup. A configured manifest file is used as is. Without
    /// either, the manifest is searched for starting in the asset's directory and climbing up to
    /// the assets root. `Ok(None)` means no manifest was found and the `missingManifest` policy
    /// chose not to raise.
    pub fn get_manifest(
        &self,
        asset_path: Option<&str>,
        need: bool,
    ) -> Result<Option<Arc<Manifest>>> {
        match self.config.manifest() {
            ManifestSource::Inline(entries) => self
                .cached(ManifestKey::Inline, || {
                    Manifest::from_entries(Arc::clone(&self.config), entries)
                })
                .map(Some),
            ManifestSource::File(path) => {
                if !path.is_file() {
                    self.missing_manifest(format!("'{}'", path.display()), need)?;
                    return Ok(None);
                }
                self.load_file(path).map(Some)
            }
            ManifestSource::Autodetect => match self.autodetect_manifest(asset_path, need)? {
                Some(path) => self.load_file(&path).map(Some),
                None => Ok(None),
            },
        }
    }

    /// Resolve an asset through its manifest.
    ///
    /// When no manifest is available and the failure was not raised, the asset is built from
    /// the raw requested path with an `unknown` revision so callers can still render it. A raw
    /// path climbing above the assets root is rejected even then.
    pub fn get_asset(&self, path: &str, need: bool) -> Result<Asset> {
        match self.get_manifest(Some(path), need)? {
            Some(manifest) => manifest.get_asset(path, need),
            None => Ok(Asset::new(Revision::unresolved(&self.config, path)?)),
        }
    }

    fn load_file(&self, path: &Path) -> Result<Arc<Manifest>> {
        self.cached(ManifestKey::File(path.to_path_buf()), || {
            Manifest::from_file(Arc::clone(&self.config), path)
        })
    }

    fn cached(
        &self,
        key: ManifestKey,
        load: impl FnOnce() -> Result<Manifest>,
    ) -> Result<Arc<Manifest>> {
        match self.manifests.entry(key) {
            Entry::Occupied(entry) => {
                tracing::trace!(key = ?entry.key(), "manifest cache hit");
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                let manifest = Arc::new(load()?);
                entry.insert(Arc::clone(&manifest));
                Ok(manifest)
            }
        }
    }

    fn autodetect_manifest(&self, asset_path: Option<&str>, need: bool) -> Result<Option<PathBuf>> {
        let root = self.config.assets_root();
        let start = match asset_path {
            Some(path) => {
                let path = path.replace('\\', "/");
                let directory = path.rsplit_once('/').map_or("", |(directory, _)| directory);
                join_under_root(root, &normalize_path(directory)?)
            }
            None => root.to_path_buf(),
        };

        let candidates = generate_manifest_candidates(root, &start, self.config.autodetect());
        if let Some(found) = candidates.into_iter().find(|candidate| candidate.is_file()) {
            tracing::debug!(manifest = %found.display(), "autodetected revision manifest");
            return Ok(Some(found));
        }

        self.missing_manifest(
            format!(
                "none of [{}] found between {} and {}",
                self.config.autodetect().join(", "),
                start.display(),
                root.display()
            ),
            need,
        )?;
        Ok(None)
    }

    fn missing_manifest(&self, location: String, need: bool) -> Result<()> {
        let policy = self.config.policy(FailureKind::MissingManifest);
        FailureAction::resolve(policy, need).apply(AssetError::ManifestNotFound { location })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetOptions;
    use crate::policy::FailurePolicy;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn autodetects_manifest_one_directory_up() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("www");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/versions.json"), r#"{"a/b/app.css": "v1"}"#).unwrap();

        let service = ManifestService::new(Config::new(AssetOptions::new(&root)).unwrap());
        let manifest = service.get_manifest(Some("a/b/app.css"), true).unwrap().unwrap();

        assert_eq!(manifest.source(), Some(root.join("a/versions.json").as_path()));
    }

    #[test]
    fn never_searches_above_assets_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("www");
        fs::create_dir_all(root.join("css")).unwrap();
        fs::write(temp.path().join("manifest.json"), "{}").unwrap();

        let options = AssetOptions::new(&root)
            .with_policy(FailureKind::MissingManifest, FailurePolicy::Exception);
        let service = ManifestService::new(Config::new(options).unwrap());

        let error = service.get_manifest(Some("css/app.css"), true).unwrap_err();
        assert!(matches!(error, AssetError::ManifestNotFound { .. }));

        let skipped = service.get_manifest(Some("css/app.css"), false).unwrap();
        assert!(skipped.is_none());
    }

    #[test]
    fn honours_candidate_order_within_a_directory() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("rev-manifest.json"), "{}").unwrap();
        fs::write(root.join("busters.json"), "{}").unwrap();

        let service = ManifestService::new(Config::new(AssetOptions::new(root)).unwrap());
        let manifest = service.get_manifest(None, true).unwrap().unwrap();

        assert_eq!(manifest.source(), Some(root.join("busters.json").as_path()));
    }

    #[test]
    fn missing_configured_file_returns_none_when_ignored() {
        let temp = tempdir().unwrap();
        let options = AssetOptions::new(temp.path())
            .with_manifest_file("missing.json")
            .with_all_policies(FailurePolicy::Ignore);
        let service = ManifestService::new(Config::new(options).unwrap());

        assert!(service.get_manifest(Some("app.css"), true).unwrap().is_none());

        let asset = service.get_asset("/app.css", true).unwrap();
        assert_eq!(asset.revision().raw_value(), "unknown");
        assert!(asset.revision().is_version());
        assert_eq!(asset.asset_path(), "/app.css");
    }

    #[test]
    fn inline_manifest_answers_every_lookup() {
        let options = AssetOptions::new("/www")
            .with_inline_manifest([("deep/nested/app.css", "v7")])
            .with_all_policies(FailurePolicy::Ignore);
        let service = ManifestService::new(Config::new(options).unwrap());

        let first = service.get_manifest(Some("deep/nested/app.css"), true).unwrap().unwrap();
        let second = service.get_manifest(Some("other/file.js"), true).unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.cached_manifests(), 1);
        let asset = service.get_asset("deep/nested/app.css", true).unwrap();
        assert_eq!(asset.relative_url(), "deep/nested/app.css?v=v7");
    }

    #[test]
    fn memoises_parsed_manifests_until_a_new_service() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        let manifest_path = root.join("manifest.json");
        fs::write(&manifest_path, r#"{"app.css": "v1"}"#).unwrap();

        let config = Arc::new(Config::new(AssetOptions::new(root)).unwrap());
        let service = ManifestService::with_shared_config(Arc::clone(&config));

        let first = service.get_manifest(Some("app.css"), true).unwrap().unwrap();
        fs::write(&manifest_path, r#"{"app.css": "v2"}"#).unwrap();
        let second = service.get_manifest(Some("app.css"), true).unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.token("app.css"), Some("v1"));
        assert_eq!(service.cached_manifests(), 1);

        let fresh = ManifestService::with_shared_config(config);
        let reloaded = fresh.get_manifest(Some("app.css"), true).unwrap().unwrap();
        assert_eq!(reloaded.token("app.css"), Some("v2"));
    }

    #[test]
    fn invalid_manifest_json_is_fatal_even_when_not_needed() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("assets.json"), "not json").unwrap();

        let options = AssetOptions::new(temp.path()).with_all_policies(FailurePolicy::Ignore);
        let service = ManifestService::new(Config::new(options).unwrap());

        let error = service.get_asset("app.css", false).unwrap_err();
        assert!(matches!(error, AssetError::ManifestParse { .. }));
    }
}
