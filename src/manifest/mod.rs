//! Revision manifests: loading, lookups and per-service caching.

mod loading;
mod revisions;
mod service;

pub use revisions::Manifest;
pub use service::ManifestService;
