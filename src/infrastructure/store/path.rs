use crate::infrastructure::error::{StoreError, StoreResult};

/// Split a slash-separated store path into its segments.
///
/// Leading and trailing slashes are ignored, so `/`, `` and `//` all name the
/// root. Empty interior segments, `.` and `..` are rejected.
pub fn split_path(path: &str) -> StoreResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == "..")
    {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}
