//! Call surface used by template engines: arguments, output rendering and output caching.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::asset_paths::is_protocol_relative;
use crate::config::Config;
use crate::error::{AssetError, Result};
use crate::format::{FormatAsset, Formatter, RequestBase};
use crate::manifest::ManifestService;

const ARGUMENT_NAMES: [&str; 3] = ["format", "need", "absolute"];

/// Arguments passed alongside the asset path by the template layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputArgs {
    /// Output template; the configured default when `None`.
    pub format: Option<String>,
    /// Whether missing assets, manifests and revisions go through the failure policy.
    pub need: bool,
    /// Prefix with the absolute base URL instead of the base path.
    pub absolute: bool,
}

impl Default for OutputArgs {
    fn default() -> Self {
        Self {
            format: None,
            need: true,
            absolute: false,
        }
    }
}

impl OutputArgs {
    /// Use an explicit output template.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set whether failures should be reported at all.
    pub fn with_need(mut self, need: bool) -> Self {
        self.need = need;
        self
    }

    /// Render with the absolute base URL.
    pub fn with_absolute(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }

    /// Parse arguments given positionally (`[format, need, absolute]`) or by name.
    ///
    /// Named arguments also accept their positional index as key (`{"0": "%path%"}`); when both
    /// are present the name wins.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut args = Self::default();

        let slots: [Option<&Value>; 3] = match value {
            Value::Null => [None, None, None],
            Value::Array(items) => {
                if items.len() > ARGUMENT_NAMES.len() {
                    return Err(AssetError::InvalidArgument(format!(
                        "expected at most {} arguments, got {}",
                        ARGUMENT_NAMES.len(),
                        items.len()
                    )));
                }
                [items.first(), items.get(1), items.get(2)]
            }
            Value::Object(map) => {
                let is_known =
                    |key: &str| ARGUMENT_NAMES.contains(&key) || matches!(key, "0" | "1" | "2");
                if let Some(unknown) = map.keys().find(|key| !is_known(key.as_str())) {
                    return Err(AssetError::InvalidArgument(format!(
                        "unknown argument '{unknown}', expected one of {}",
                        ARGUMENT_NAMES.join(", ")
                    )));
                }
                let slot = |index: usize| {
                    map.get(ARGUMENT_NAMES[index])
                        .or_else(|| map.get(&index.to_string()))
                };
                [slot(0), slot(1), slot(2)]
            }
            other => {
                return Err(AssetError::InvalidArgument(format!(
                    "arguments must be an array or an object, got {other}"
                )));
            }
        };

        if let Some(format) = slots[0].filter(|value| !value.is_null()) {
            let format = format.as_str().ok_or_else(|| type_error("format", "a string"))?;
            args.format = Some(format.to_string());
        }
        if let Some(need) = slots[1].filter(|value| !value.is_null()) {
            args.need = need.as_bool().ok_or_else(|| type_error("need", "a boolean"))?;
        }
        if let Some(absolute) = slots[2].filter(|value| !value.is_null()) {
            args.absolute = absolute
                .as_bool()
                .ok_or_else(|| type_error("absolute", "a boolean"))?;
        }

        Ok(args)
    }
}

fn type_error(name: &str, expected: &str) -> AssetError {
    AssetError::InvalidArgument(format!("'{name}' must be {expected}"))
}

/// Store for rendered output strings, supplied by the host.
pub trait OutputCache: Send + Sync {
    /// Previously stored output for `key`.
    fn load(&self, key: &str) -> Option<String>;
    /// Remember `output` under `key`.
    fn store(&self, key: &str, output: &str);
    /// Forget every stored output.
    fn clear(&self);
}

/// In-process [`OutputCache`].
#[derive(Debug, Default)]
pub struct MemoryOutputCache {
    entries: DashMap<String, String>,
}

impl MemoryOutputCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored outputs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OutputCache for MemoryOutputCache {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn store(&self, key: &str, output: &str) {
        self.entries.insert(key.to_string(), output.to_string());
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// Resolves asset paths and renders them for templates.
pub struct AssetRenderer {
    service: ManifestService,
    cache: Option<Arc<dyn OutputCache>>,
}

impl AssetRenderer {
    /// Create a renderer with its own manifest service and no output cache.
    pub fn new(config: Config) -> Self {
        Self::from_service(ManifestService::new(config))
    }

    /// Create a renderer around an existing manifest service.
    pub fn from_service(service: ManifestService) -> Self {
        Self {
            service,
            cache: None,
        }
    }

    /// Attach an output cache; it is only consulted when caching is enabled in configuration.
    pub fn with_cache(mut self, cache: Arc<dyn OutputCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Underlying manifest service.
    pub fn service(&self) -> &ManifestService {
        &self.service
    }

    /// Render `asset_path` for a template.
    ///
    /// A path starting with `//` always renders with the absolute base URL.
    pub fn render(
        &self,
        asset_path: &str,
        args: &OutputArgs,
        request: &RequestBase,
    ) -> Result<String> {
        let cache = self
            .cache
            .as_deref()
            .filter(|_| self.service.config().is_cache_enabled());

        let Some(cache) = cache else {
            return self.generate(asset_path, args, request);
        };

        let key = self.cache_key(asset_path, args, request);
        if let Some(output) = cache.load(&key) {
            tracing::trace!(asset = asset_path, "rendered output cache hit");
            return Ok(output);
        }

        let output = self.generate(asset_path, args, request)?;
        cache.store(&key, &output);
        Ok(output)
    }

    /// Content-addressed cache key for one render call.
    pub fn cache_key(&self, asset_path: &str, args: &OutputArgs, request: &RequestBase) -> String {
        let canonical = json!([
            asset_path,
            args,
            self.service.config().hash(),
            request.base_path,
            request.base_url,
        ]);
        hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
    }

    fn generate(
        &self,
        asset_path: &str,
        args: &OutputArgs,
        request: &RequestBase,
    ) -> Result<String> {
        let config = self.service.config();
        let protocol_relative = is_protocol_relative(asset_path);
        let path = if protocol_relative {
            asset_path.trim_start_matches('/')
        } else {
            asset_path
        };
        let template = args.format.as_deref().unwrap_or(config.default_format());

        let asset = self.service.get_asset(path, args.need)?;
        Formatter::new(config, request).format(&asset, template, args.absolute || protocol_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetOptions;
    use crate::policy::FailurePolicy;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn site(cache: bool) -> (TempDir, Config) {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("css")).unwrap();
        fs::write(temp.path().join("css/app.css"), "body{}").unwrap();
        fs::write(temp.path().join("manifest.json"), r#"{"css/app.css": "v1"}"#).unwrap();
        let config = Config::new(AssetOptions::new(temp.path()).with_cache(cache)).unwrap();
        (temp, config)
    }

    fn request() -> RequestBase {
        RequestBase::new("/base", "https://example.com/base")
    }

    #[test]
    fn parses_positional_arguments() {
        let args = OutputArgs::from_value(&json!(["%path%", false, true])).unwrap();
        let expected = OutputArgs::default()
            .with_format("%path%")
            .with_need(false)
            .with_absolute(true);
        assert_eq!(args, expected);
    }

    #[test]
    fn parses_named_arguments() {
        let args = OutputArgs::from_value(&json!({"need": false, "0": "%raw%"})).unwrap();
        assert_eq!(args.format.as_deref(), Some("%raw%"));
        assert!(!args.need);
        assert!(!args.absolute);

        assert_eq!(OutputArgs::from_value(&Value::Null).unwrap(), OutputArgs::default());
    }

    #[test]
    fn rejects_malformed_arguments() {
        for value in [
            json!(["%url%", true, false, "extra"]),
            json!({"fromat": "%url%"}),
            json!({"need": "yes"}),
            json!([42]),
            json!("%url%"),
        ] {
            let error = OutputArgs::from_value(&value).unwrap_err();
            assert!(matches!(error, AssetError::InvalidArgument(_)), "accepted {value}");
        }
    }

    #[test]
    fn renders_with_default_format() {
        let (_temp, config) = site(false);
        let renderer = AssetRenderer::new(config);

        let output = renderer.render("css/app.css", &OutputArgs::default(), &request()).unwrap();
        assert_eq!(output, "/base/css/app.css?v=v1");
    }

    #[test]
    fn protocol_relative_paths_render_absolute() {
        let (_temp, config) = site(false);
        let renderer = AssetRenderer::new(config);

        let output = renderer.render("//css/app.css", &OutputArgs::default(), &request()).unwrap();
        assert_eq!(output, "https://example.com/base/css/app.css?v=v1");
    }

    #[test]
    fn optional_lookups_never_fail() {
        let (temp, _) = site(false);
        let options = AssetOptions::new(temp.path()).with_all_policies(FailurePolicy::Exception);
        let renderer = AssetRenderer::new(Config::new(options).unwrap());
        let args = OutputArgs::default().with_format("%raw%").with_need(false);

        assert_eq!(renderer.render("js/missing.js", &args, &request()).unwrap(), "unknown");
        assert!(renderer.render("js/missing.js", &OutputArgs::default(), &request()).is_err());
    }

    #[test]
    fn unresolved_paths_cannot_read_outside_the_root() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("www");
        fs::create_dir_all(&root).unwrap();
        fs::write(temp.path().join("secret.txt"), "TOP-SECRET").unwrap();

        let options = AssetOptions::new(&root)
            .with_manifest_file("missing.json")
            .with_all_policies(FailurePolicy::Ignore);
        let renderer = AssetRenderer::new(Config::new(options).unwrap());

        for need in [true, false] {
            let args = OutputArgs::default()
                .with_format("%content%|%url%")
                .with_need(need);
            let error = renderer
                .render("../secret.txt", &args, &request())
                .unwrap_err();
            assert!(matches!(error, AssetError::InvalidPath { .. }));
        }

        let args = OutputArgs::default().with_format("%content%|%url%");
        let output = renderer.render("css/./app.css", &args, &request()).unwrap();
        assert_eq!(output, "|/base/css/./app.css?v=unknown");
    }

    #[test]
    fn caches_output_only_when_enabled() {
        let (_temp, config) = site(true);
        let cache = Arc::new(MemoryOutputCache::new());
        let renderer = AssetRenderer::new(config).with_cache(cache.clone());

        let first = renderer.render("css/app.css", &OutputArgs::default(), &request()).unwrap();
        assert_eq!(cache.len(), 1);

        let key = renderer.cache_key("css/app.css", &OutputArgs::default(), &request());
        cache.store(&key, "from-cache");
        let second = renderer.render("css/app.css", &OutputArgs::default(), &request()).unwrap();
        assert_eq!(first, "/base/css/app.css?v=v1");
        assert_eq!(second, "from-cache");

        let (_temp, config) = site(false);
        let disabled_cache = Arc::new(MemoryOutputCache::new());
        let renderer = AssetRenderer::new(config).with_cache(disabled_cache.clone());
        renderer.render("css/app.css", &OutputArgs::default(), &request()).unwrap();
        assert!(disabled_cache.is_empty());
    }

    #[test]
    fn cache_key_depends_on_every_input() {
        let (_temp, config) = site(true);
        let renderer = AssetRenderer::new(config);
        let args = OutputArgs::default();

        let base = renderer.cache_key("css/app.css", &args, &request());
        assert_eq!(base, renderer.cache_key("css/app.css", &args, &request()));
        assert_ne!(base, renderer.cache_key("css/other.css", &args, &request()));
        let absolute = args.clone().with_absolute(true);
        assert_ne!(base, renderer.cache_key("css/app.css", &absolute, &request()));
        let other_request = RequestBase::new("/other", "https://example.com/base");
        assert_ne!(base, renderer.cache_key("css/app.css", &args, &other_request));
    }
}
