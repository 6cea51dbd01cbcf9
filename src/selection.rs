//! Filters used to restrict which manifest entries are enumerated.

use regex::Regex;

use crate::error::Result;

/// Trait describing which manifest entries an enumeration should include.
pub trait AssetFilter {
    /// Returns `true` when the asset path should be part of the result.
    fn is_included(&self, asset_path: &str) -> bool;
}

impl<F> AssetFilter for F
where
    F: Fn(&str) -> bool,
{
    fn is_included(&self, asset_path: &str) -> bool {
        self(asset_path)
    }
}

/// Regular expression filter matched anywhere in the asset path.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    pattern: Regex,
}

impl PatternFilter {
    /// Compile a pattern, failing with [`crate::AssetError::InvalidFilter`] when it is malformed.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl From<Regex> for PatternFilter {
    fn from(pattern: Regex) -> Self {
        Self { pattern }
    }
}

impl AssetFilter for PatternFilter {
    fn is_included(&self, asset_path: &str) -> bool {
        self.pattern.is_match(asset_path)
    }
}

/// Directory scope filter: includes `scope` itself and everything below it.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    scope: String,
}

impl ScopeFilter {
    /// Create a filter for the given directory scope.
    pub fn new(scope: impl AsRef<str>) -> Self {
        Self {
            scope: scope.as_ref().trim().trim_matches('/').to_string(),
        }
    }
}

impl AssetFilter for ScopeFilter {
    fn is_included(&self, asset_path: &str) -> bool {
        if self.scope.is_empty() || asset_path == self.scope {
            return true;
        }

        asset_path
            .strip_prefix(self.scope.as_str())
            .is_some_and(|suffix| suffix.starts_with('/'))
    }
}
