/// Whether a manifest token names a renamed file rather than a version string.
///
/// Build tools that rename assets store the new relative path, which always carries a
/// directory separator or an extension. Anything else is treated as an opaque version. A
/// renamed file without extension in the assets root is therefore indistinguishable from a
/// version and is read as one.
pub fn is_renamed_path_token(token: &str) -> bool {
    token.contains(['.', '/'])
}

/// Whether a requested asset path is protocol relative (`//...`) and must render absolute.
pub fn is_protocol_relative(path: &str) -> bool {
    path.starts_with("//")
}
