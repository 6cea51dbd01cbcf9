#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod config;
pub mod error;
pub mod format;
pub mod manifest;
pub mod models;
pub mod output;
pub mod policy;
pub mod selection;

pub use config::{AssetOptions, Config, ManifestOption, ManifestSource};
pub use error::{AssetError, Result};
pub use format::{FormatAsset, Formatter, Placeholder, RequestBase};
pub use manifest::{Manifest, ManifestService};
pub use models::{Asset, Revision, RevisionKind};
pub use output::{AssetRenderer, MemoryOutputCache, OutputArgs, OutputCache};
pub use policy::{FailureAction, FailureKind, FailurePolicy};
pub use selection::{AssetFilter, PatternFilter, ScopeFilter};
