//! Asset resolution configuration: raw options and the validated snapshot built from them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::asset_paths::normalize_path;
use crate::error::{AssetError, Result};
use crate::policy::{FailureKind, FailurePolicy};

/// Configuration file names probed by [`AssetOptions::discover`], in order.
pub const DEFAULT_CONFIG_FILES: [&str; 3] = [
    "asset-revision.json",
    "asset-revision.yaml",
    "asset-revision.yml",
];

/// Manifest file names tried during autodetection when none are configured.
pub const DEFAULT_AUTODETECT: [&str; 5] = [
    "assets.json",
    "busters.json",
    "versions.json",
    "manifest.json",
    "rev-manifest.json",
];

/// Default output template.
pub const DEFAULT_FORMAT: &str = "%url%";

/// Manifest location as written in configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ManifestOption {
    /// Path to a JSON manifest file.
    Path(String),
    /// Revisions listed directly in configuration.
    Inline(Map<String, Value>),
}

/// Recognised configuration options, as read from a file or assembled by the host.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetOptions {
    /// Cache rendered output strings.
    pub cache: bool,
    /// Manifest location; absent enables autodetection.
    pub manifest: Option<ManifestOption>,
    /// Manifest file names tried during autodetection, in order.
    pub autodetect: Vec<String>,
    /// Absolute directory containing the public assets.
    pub assets_path: String,
    /// Prefix inserted between the request base and every generated reference.
    pub public_path: String,
    /// Policy for asset files missing on disk.
    pub missing_asset: String,
    /// Policy for manifests that cannot be located.
    pub missing_manifest: String,
    /// Policy for assets without a manifest entry.
    pub missing_revision: String,
    /// Default output template.
    pub format: String,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            cache: false,
            manifest: None,
            autodetect: DEFAULT_AUTODETECT.iter().map(|name| name.to_string()).collect(),
            assets_path: String::new(),
            public_path: String::new(),
            missing_asset: FailurePolicy::Notice.to_string(),
            missing_manifest: FailurePolicy::Notice.to_string(),
            missing_revision: FailurePolicy::Notice.to_string(),
            format: DEFAULT_FORMAT.into(),
        }
    }
}

impl AssetOptions {
    /// Default options rooted at the provided assets directory.
    pub fn new(assets_path: impl AsRef<Path>) -> Self {
        Self {
            assets_path: assets_path.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    /// Look for a configuration file in `dir`.
    ///
    /// When none of [`DEFAULT_CONFIG_FILES`] exists the defaults are returned with `dir` as the
    /// assets root, so a bare public directory works without any configuration.
    pub fn discover(dir: &Path) -> Result<Self> {
        for name in DEFAULT_CONFIG_FILES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                tracing::debug!(
                    path = %candidate.display(),
                    "using discovered asset configuration"
                );
                return Self::from_path(&candidate);
            }
        }

        Ok(Self::new(dir))
    }

    /// Read options from a JSON or YAML file, chosen by extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let parsed = if is_yaml {
            serde_yaml::from_str(&content).map_err(|err| err.to_string())
        } else {
            serde_json::from_str(&content).map_err(|err| err.to_string())
        };

        parsed.map_err(|err| {
            AssetError::InvalidConfiguration(format!("failed to parse {}: {err}", path.display()))
        })
    }

    /// Use a manifest file instead of autodetection.
    pub fn with_manifest_file(mut self, path: impl Into<String>) -> Self {
        self.manifest = Some(ManifestOption::Path(path.into()));
        self
    }

    /// Use revisions listed inline instead of a manifest file.
    pub fn with_inline_manifest<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), Value::String(value.into())))
            .collect();
        self.manifest = Some(ManifestOption::Inline(map));
        self
    }

    /// Replace the autodetect candidate list.
    pub fn with_autodetect<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.autodetect = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the public path prefix.
    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = public_path.into();
        self
    }

    /// Set the policy for one failure kind.
    pub fn with_policy(mut self, kind: FailureKind, policy: FailurePolicy) -> Self {
        let value = policy.to_string();
        match kind {
            FailureKind::MissingAsset => self.missing_asset = value,
            FailureKind::MissingManifest => self.missing_manifest = value,
            FailureKind::MissingRevision => self.missing_revision = value,
        }
        self
    }

    /// Set the same policy for every failure kind.
    pub fn with_all_policies(self, policy: FailurePolicy) -> Self {
        self.with_policy(FailureKind::MissingAsset, policy)
            .with_policy(FailureKind::MissingManifest, policy)
            .with_policy(FailureKind::MissingRevision, policy)
    }

    /// Set the default output template.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Enable or disable output caching.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }
}

/// Where manifest revisions come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestSource {
    /// Revisions supplied directly in configuration.
    Inline(Map<String, Value>),
    /// A single manifest file.
    File(PathBuf),
    /// Search upwards from each asset's directory.
    Autodetect,
}

/// Validated, immutable configuration snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    cache_enabled: bool,
    manifest: ManifestSource,
    autodetect: Vec<String>,
    assets_root: PathBuf,
    public_path: String,
    missing_asset: FailurePolicy,
    missing_manifest: FailurePolicy,
    missing_revision: FailurePolicy,
    default_format: String,
    hash: String,
}

impl Config {
    /// Validate options and normalise every path they contain.
    ///
    /// Relative manifest file paths are resolved against the assets root.
    pub fn new(options: AssetOptions) -> Result<Self> {
        if !Path::new(&options.assets_path).is_absolute() {
            return Err(AssetError::InvalidConfiguration(format!(
                "assetsPath must be absolute, got '{}'",
                options.assets_path
            )));
        }

        let missing_asset = parse_policy(FailureKind::MissingAsset, &options.missing_asset)?;
        let missing_manifest =
            parse_policy(FailureKind::MissingManifest, &options.missing_manifest)?;
        let missing_revision =
            parse_policy(FailureKind::MissingRevision, &options.missing_revision)?;

        let assets_root = PathBuf::from(normalize_path(&options.assets_path)?);
        let public_path = normalize_path(options.public_path.trim_matches('/'))?
            .trim_matches('/')
            .to_string();

        let manifest = match &options.manifest {
            None => ManifestSource::Autodetect,
            Some(ManifestOption::Inline(entries)) => ManifestSource::Inline(entries.clone()),
            Some(ManifestOption::Path(path)) => {
                let resolved = if Path::new(path).is_absolute() {
                    path.clone()
                } else {
                    assets_root.join(path).to_string_lossy().into_owned()
                };
                ManifestSource::File(PathBuf::from(normalize_path(&resolved)?))
            }
        };

        let hash = options_hash(&options)?;

        Ok(Self {
            cache_enabled: options.cache,
            manifest,
            autodetect: options.autodetect,
            assets_root,
            public_path,
            missing_asset,
            missing_manifest,
            missing_revision,
            default_format: options.format,
            hash,
        })
    }

    /// Whether rendered output may be cached.
    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Configured manifest source.
    pub fn manifest(&self) -> &ManifestSource {
        &self.manifest
    }

    /// Manifest file names tried during autodetection.
    pub fn autodetect(&self) -> &[String] {
        &self.autodetect
    }

    /// Absolute assets root; also the upper bound of manifest autodetection.
    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    /// Public path prefix without surrounding slashes, possibly empty.
    pub fn public_path(&self) -> &str {
        &self.public_path
    }

    /// Policy configured for a failure kind.
    pub fn policy(&self, kind: FailureKind) -> FailurePolicy {
        match kind {
            FailureKind::MissingAsset => self.missing_asset,
            FailureKind::MissingManifest => self.missing_manifest,
            FailureKind::MissingRevision => self.missing_revision,
        }
    }

    /// Default output template.
    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    /// Stable digest of every option, used as a cache key component.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

fn parse_policy(kind: FailureKind, value: &str) -> Result<FailurePolicy> {
    value.parse().map_err(|_| {
        AssetError::InvalidConfiguration(format!(
            "unexpected value '{value}' of '{}', allowed values: {}",
            kind.config_key(),
            FailurePolicy::CHOICES.join(", ")
        ))
    })
}

fn options_hash(options: &AssetOptions) -> Result<String> {
    let canonical = serde_json::to_vec(options)
        .map_err(|err| AssetError::InvalidConfiguration(err.to_string()))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}
