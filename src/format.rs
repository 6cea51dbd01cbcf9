//! Rendering resolved assets through `%placeholder%` templates.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::asset_paths::{join_prefix, join_url};
use crate::config::Config;
use crate::error::{AssetError, Result};
use crate::models::Asset;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"%([^%]+)%").expect("invalid placeholder regex"))
}

/// Prefixes derived from the current request by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestBase {
    /// Path-only prefix, e.g. `/app`.
    pub base_path: String,
    /// Absolute URL prefix, e.g. `https://example.com/app`.
    pub base_url: String,
}

impl RequestBase {
    /// Create request prefixes.
    pub fn new(base_path: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }
}

/// Placeholders accepted in output templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Trimmed contents of the resolved file.
    Content,
    /// Raw manifest token or `unknown`.
    Raw,
    /// `baseUrl` for absolute output, otherwise `basePath`.
    Base,
    /// Path-only prefix.
    BasePath,
    /// Absolute URL prefix.
    BaseUrl,
    /// Relative path of the file to serve.
    Path,
    /// Base joined with the relative URL fragment.
    Url,
}

impl Placeholder {
    /// Every placeholder, in documentation order.
    pub const ALL: [Placeholder; 7] = [
        Self::Content,
        Self::Raw,
        Self::Base,
        Self::BasePath,
        Self::BaseUrl,
        Self::Path,
        Self::Url,
    ];

    /// Look up a placeholder by its name without `%` delimiters.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|placeholder| placeholder.name() == name)
    }

    /// Name used inside templates.
    pub fn name(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Raw => "raw",
            Self::Base => "base",
            Self::BasePath => "basePath",
            Self::BaseUrl => "baseUrl",
            Self::Path => "path",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}%", self.name())
    }
}

/// Turns a resolved asset into output text.
pub trait FormatAsset {
    /// Render `asset` through `template`, using absolute URLs when `absolute` is set.
    fn format(&self, asset: &Asset, template: &str, absolute: bool) -> Result<String>;
}

/// Default [`FormatAsset`] implementation backed by the placeholder grammar.
#[derive(Debug, Clone)]
pub struct Formatter {
    base_path: String,
    base_url: String,
}

impl Formatter {
    /// Combine request prefixes with the configured public path.
    pub fn new(config: &Config, request: &RequestBase) -> Self {
        Self {
            base_path: join_prefix(&request.base_path, config.public_path()),
            base_url: join_prefix(&request.base_url, config.public_path()),
        }
    }

    /// Path-only prefix including the public path, without trailing slash.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Absolute URL prefix including the public path, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn value(&self, placeholder: Placeholder, asset: &Asset, absolute: bool) -> Result<String> {
        let base = if absolute { &self.base_url } else { &self.base_path };

        Ok(match placeholder {
            Placeholder::Content => read_content(asset)?,
            Placeholder::Raw => asset.revision().raw_value().to_string(),
            Placeholder::Base => base.clone(),
            Placeholder::BasePath => self.base_path.clone(),
            Placeholder::BaseUrl => self.base_url.clone(),
            Placeholder::Path => asset.relative_path().to_string(),
            Placeholder::Url => join_url(base, asset.relative_url()),
        })
    }
}

impl FormatAsset for Formatter {
    /// Substitution is a single pass; substituted values are never scanned again.
    fn format(&self, asset: &Asset, template: &str, absolute: bool) -> Result<String> {
        let mut output = String::with_capacity(template.len());
        let mut last = 0;

        for captures in placeholder_pattern().captures_iter(template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let placeholder = Placeholder::parse(name.as_str()).ok_or_else(|| {
                AssetError::UnrecognizedPlaceholder {
                    name: name.as_str().to_string(),
                    template: template.to_string(),
                }
            })?;

            output.push_str(&template[last..whole.start()]);
            output.push_str(&self.value(placeholder, asset, absolute)?);
            last = whole.end();
        }

        output.push_str(&template[last..]);
        Ok(output)
    }
}

fn read_content(asset: &Asset) -> Result<String> {
    let path = asset.absolute_path();
    match fs::read_to_string(path) {
        Ok(content) => Ok(content.trim().to_string()),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "asset content unavailable, rendering empty");
            Ok(String::new())
        }
        Err(source) => Err(AssetError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetOptions;
    use crate::models::Revision;
    use tempfile::tempdir;

    fn config(public_path: &str) -> Config {
        Config::new(AssetOptions::new("/www").with_public_path(public_path)).unwrap()
    }

    fn version_asset(config: &Config) -> Asset {
        Asset::new(Revision::new(config, "css/app.css", Some("v1")).unwrap())
    }

    #[test]
    fn renders_version_url_under_base_path() {
        let config = config("");
        let request = RequestBase::new("/base", "https://example.com/base");
        let formatter = Formatter::new(&config, &request);

        let output = formatter.format(&version_asset(&config), "%url%", false).unwrap();
        assert_eq!(output, "/base/css/app.css?v=v1");
    }

    #[test]
    fn renders_renamed_url_without_query() {
        let config = config("");
        let formatter = Formatter::new(&config, &RequestBase::new("/", "https://example.com/"));
        let revision = Revision::new(&config, "css/app.css", Some("css/app.3f.css")).unwrap();
        let asset = Asset::new(revision);

        assert_eq!(formatter.format(&asset, "%url%", false).unwrap(), "/css/app.3f.css");
        assert_eq!(
            formatter.format(&asset, "%url%", true).unwrap(),
            "https://example.com/css/app.3f.css"
        );
    }

    #[test]
    fn includes_public_path_in_bases() {
        let config = config("/dist/");
        let formatter = Formatter::new(&config, &RequestBase::new("/app/", "http://x.test/app"));
        let asset = version_asset(&config);

        let output = formatter
            .format(&asset, "%base%|%basePath%|%baseUrl%|%path%|%raw%", true)
            .unwrap();
        assert_eq!(
            output,
            "http://x.test/app/dist|/app/dist|http://x.test/app/dist|css/app.css|v1"
        );
    }

    #[test]
    fn rejects_unknown_placeholders() {
        let config = config("");
        let formatter = Formatter::new(&config, &RequestBase::default());

        let error = formatter
            .format(&version_asset(&config), "<a href=\"%bogus%\">", false)
            .unwrap_err();
        match error {
            AssetError::UnrecognizedPlaceholder { name, template } => {
                assert_eq!(name, "bogus");
                assert_eq!(template, "<a href=\"%bogus%\">");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn leaves_empty_delimiters_and_plain_text_untouched() {
        let config = config("");
        let formatter = Formatter::new(&config, &RequestBase::default());

        let output = formatter
            .format(&version_asset(&config), "%raw% at 50%%", false)
            .unwrap();
        assert_eq!(output, "v1 at 50%%");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let config = config("");
        let formatter = Formatter::new(&config, &RequestBase::default());
        let asset = Asset::new(Revision::new(&config, "app.css", Some("%url%")).unwrap());

        assert_eq!(formatter.format(&asset, "%raw%", false).unwrap(), "%url%");
    }

    #[test]
    fn inlines_trimmed_file_content() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("icon.svg"), "\n  <svg/>  \n").unwrap();
        let config = Config::new(AssetOptions::new(temp.path())).unwrap();
        let formatter = Formatter::new(&config, &RequestBase::default());
        let asset = Asset::new(Revision::new(&config, "icon.svg", Some("abc")).unwrap());

        assert_eq!(formatter.format(&asset, "%content%", false).unwrap(), "<svg/>");
    }

    #[test]
    fn missing_content_renders_empty() {
        let config = config("");
        let formatter = Formatter::new(&config, &RequestBase::default());
        let asset = Asset::new(Revision::unresolved(&config, "nope.svg").unwrap());

        assert_eq!(formatter.format(&asset, "[%content%]", false).unwrap(), "[]");
    }

    #[test]
    fn placeholder_names_round_trip() {
        for placeholder in Placeholder::ALL {
            assert_eq!(Placeholder::parse(placeholder.name()), Some(placeholder));
        }
        assert_eq!(Placeholder::parse("URL"), None);
        assert_eq!(Placeholder::Url.to_string(), "%url%");
    }
}
