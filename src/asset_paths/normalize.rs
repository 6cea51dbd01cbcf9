use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AssetError, Result};

fn invisible_characters() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\p{C}+").expect("invalid control character regex"))
}

/// Normalize a slash separated asset path.
///
/// Control and format characters are removed, backslashes become forward slashes, `.` and
/// empty segments are dropped and every `..` cancels the closest preceding segment. A `..`
/// with nothing left to cancel would climb above the root and fails with
/// [`AssetError::InvalidPath`]. Surrounding whitespace is trimmed from the input and from the
/// resolved path, so normalizing twice gives the same result. The result never ends with a
/// slash and starts with one only when the input did.
pub fn normalize_path(path: &str) -> Result<String> {
    let cleaned = invisible_characters().replace_all(path, "");
    let mut current = cleaned.trim().replace('\\', "/");

    loop {
        let resolved = resolve_segments(&current, path)?;
        let trimmed = resolved.trim();
        if trimmed.len() == resolved.len() {
            return Ok(resolved);
        }
        current = trimmed.to_string();
    }
}

fn resolve_segments(cleaned: &str, original: &str) -> Result<String> {
    let rooted = cleaned.starts_with('/');
    let parts: Vec<&str> = cleaned.split('/').collect();
    let mut segments: Vec<&str> = Vec::with_capacity(parts.len());

    for (index, part) in parts.iter().enumerate() {
        match *part {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    let resolved = segments
                        .iter()
                        .chain(parts[index..].iter())
                        .filter(|segment| !matches!(**segment, "" | "."))
                        .copied()
                        .collect::<Vec<_>>()
                        .join("/");
                    return Err(AssetError::InvalidPath {
                        path: original.to_string(),
                        resolved,
                    });
                }
            }
            segment => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    Ok(if rooted { format!("/{joined}") } else { joined })
}
