use std::path::{Path, PathBuf};

/// Place a slash separated relative path under `root`.
///
/// Leading slashes on `relative` are ignored so that un-normalized request paths still land
/// inside the root instead of replacing it.
pub fn join_under_root(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in relative.replace('\\', "/").split('/') {
        if !segment.is_empty() {
            path.push(segment);
        }
    }
    path
}

/// Join a URL or path prefix and a relative fragment with exactly one slash between them.
pub fn join_url(prefix: &str, fragment: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        fragment.trim_start_matches('/')
    )
}

/// Combine a request prefix with the configured public path, without a trailing slash.
pub fn join_prefix(prefix: &str, public_path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let public_path = public_path.trim_matches('/');
    if public_path.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{public_path}")
    }
}
