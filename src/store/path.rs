//! Store path helpers and space identifier validation.

use super::StoreError;

/// Normalize a store path.
///
/// - Replaces backslashes with forward slashes
/// - Collapses redundant separators (`a///b` → `a/b`)
/// - Drops `.` segments
/// - Rejects `..` segments
/// - Strips leading and trailing slashes
pub fn normalize(path: &str) -> Result<String, StoreError> {
    let replaced = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in replaced.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return Err(StoreError::InvalidPath(format!(
                "path traversal (..) not allowed: {path}"
            )));
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return Err(StoreError::InvalidPath("empty path".into()));
    }

    Ok(segments.join("/"))
}

/// Join normalized segments with `/`.
pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else {
        format!("{base}/{name}")
    }
}

/// Whether `id` can be used verbatim as a single directory name.
///
/// Accepts ASCII letters, digits and `-`, `_`, `.`, `{`, `}` (enough for
/// UUIDs in any common spelling). Rejects empty strings, `.` and `..`.
pub fn is_valid_space_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '{' | '}'))
}
