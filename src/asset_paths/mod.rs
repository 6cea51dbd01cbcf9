//! Helpers for normalising asset paths and locating revision manifests.
//!
//! The responsibilities are split into focused submodules so that normalisation, joining,
//! token classification and autodetect candidate generation can be tested independently.

mod candidates;
mod filters;
mod join;
mod normalize;

pub use candidates::generate_manifest_candidates;
pub use filters::{is_protocol_relative, is_renamed_path_token};
pub use join::{join_prefix, join_under_root, join_url};
pub use normalize::normalize_path;
