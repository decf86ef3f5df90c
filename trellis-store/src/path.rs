//! Path helpers. Paths are `/`-separated keys such as `components/public/alice`.

use crate::error::{StoreError, StoreResult};

/// Rejects empty paths, leading/trailing separators and empty segments.
pub fn validate_path(path: &str) -> StoreResult<()> {
    if path.is_empty() || path.split('/').any(str::is_empty) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Returns true if `path` equals `root` or lies below it.
pub fn is_within(path: &str, root: &str) -> bool {
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Joins path segments with `/`.
pub fn join<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("/")
}
