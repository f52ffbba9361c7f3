use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Upper bound (exclusive) on numbered suffixes tried by [`first_free_sibling`].
pub const MAX_SUFFIX: usize = 100;

/// Split a filesystem path into its named segments.
///
/// Empty segments (leading, trailing or doubled separators) and `.` markers
/// are skipped, so `"/a//b/./c/"` yields `["a", "b", "c"]`.
///
/// # Errors
/// Returns [`Error::InvalidPath`] if a segment is `..`, since the naming
/// scheme depends on the literal parent directories.
pub fn split_components(path: &str) -> Result<Vec<&str>> {
    let mut segments = Vec::new();
    for seg in path.split('/') {
        if seg.is_empty() || seg == "." {
            continue;
        }
        if seg == ".." {
            return Err(Error::invalid_path(format!(
                "{path}: path segment '..' is not allowed",
            )));
        }
        segments.push(seg);
    }
    Ok(segments)
}

/// Trim whitespace and any leading/trailing `/` from an ignore-file entry.
///
/// Used as the comparison key when merging ignore rules: `/build/`, `build/`
/// and `build` all normalize to `build`.
pub fn strip_separators(entry: &str) -> &str {
    entry.trim().trim_matches('/')
}

/// Return the first path in `base.0`, `base.1`, ... that does not exist.
///
/// The suffix is appended to the full file name, so `hooks/pre-receive.bak`
/// yields `hooks/pre-receive.bak.0` first.
///
/// # Errors
/// Returns [`Error::Lock`] when all [`MAX_SUFFIX`] candidates are taken.
pub fn first_free_sibling(base: &Path) -> Result<PathBuf> {
    (0..MAX_SUFFIX)
        .map(|n| with_suffix(base, n))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| {
            Error::lock(format!(
                "no free backup name for {} in 0..{}",
                base.display(),
                MAX_SUFFIX
            ))
        })
}

/// Return `dir` itself if it does not exist yet, else the first free `dir.N`
/// with `N` starting at 1.
pub fn first_free_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        return Ok(dir.to_path_buf());
    }
    (1..MAX_SUFFIX)
        .map(|n| with_suffix(dir, n))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| Error::already_exists(dir))
}

fn with_suffix(base: &Path, n: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}
