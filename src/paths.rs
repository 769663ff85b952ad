//! Relative → absolute path resolution.

/// Make `path` absolute by joining it onto `cwd`.
///
/// Paths starting with `/` are returned unchanged, so resolving twice is the
/// same as resolving once.  No normalisation happens: `..` and `.` segments
/// are kept verbatim and handed to tar as-is.
pub fn resolve(path: &str, cwd: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    // cwd is "/" only at the filesystem root
    let base = cwd.strip_suffix('/').unwrap_or(cwd);
    format!("{base}/{path}")
}
