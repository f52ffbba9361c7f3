use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{Error, Result};

/// Match a glob pattern against a file name.
///
/// Dotfiles (names starting with `.`) are excluded unless the pattern
/// explicitly starts with `.`.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    // Dotfile guard
    if name.starts_with('.') && !pattern.starts_with('.') {
        return false;
    }

    fnmatch(pattern.as_bytes(), name.as_bytes())
}

/// Match ignoring ASCII case. Unlike [`glob_match`], dotfiles are not
/// special: `*readme*` matches `.readme`.
pub fn fnmatch_ci(pattern: &str, name: &str) -> bool {
    fnmatch(
        pattern.to_ascii_lowercase().as_bytes(),
        name.to_ascii_lowercase().as_bytes(),
    )
}

/// `true` if `pattern` contains a `*` or `?` wildcard.
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Simple fnmatch implementation: `*` matches any chars, `?` matches single char.
pub(crate) fn fnmatch(pat: &[u8], name: &[u8]) -> bool {
    let mut pi = 0;
    let mut ni = 0;
    let mut star_pi = usize::MAX;
    let mut star_ni = 0;

    while ni < name.len() {
        if pi < pat.len() && (pat[pi] == b'?' || pat[pi] == name[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < pat.len() && pat[pi] == b'*' {
            star_pi = pi;
            star_ni = ni;
            pi += 1;
        } else if star_pi != usize::MAX {
            pi = star_pi + 1;
            star_ni += 1;
            ni = star_ni;
        } else {
            return false;
        }
    }

    while pi < pat.len() && pat[pi] == b'*' {
        pi += 1;
    }

    pi == pat.len()
}

/// Expand a path pattern against the filesystem.
///
/// Wildcards apply within one path component (`/afs/.../ioc/*/*.git`); `*`
/// never crosses a `/`. A pattern without wildcards yields itself if it
/// exists. Results are sorted; a pattern that matches nothing yields an empty
/// list.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    if !has_wildcard(pattern) {
        let path = PathBuf::from(pattern);
        return Ok(if path.exists() { vec![path] } else { Vec::new() });
    }

    let (mut candidates, rest) = if let Some(rest) = pattern.strip_prefix('/') {
        (vec![PathBuf::from("/")], rest)
    } else {
        (vec![PathBuf::new()], pattern)
    };

    for component in rest.split('/').filter(|c| !c.is_empty()) {
        let mut next = Vec::new();
        for base in &candidates {
            if has_wildcard(component) {
                next.extend(matching_children(base, component)?);
            } else {
                let joined = base.join(component);
                if joined.exists() {
                    next.push(joined);
                }
            }
        }
        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    candidates.sort();
    Ok(candidates)
}

/// Expand every pattern in order, warning about patterns that match nothing.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for pattern in patterns {
        let matched = expand_pattern(pattern.as_ref())?;
        if matched.is_empty() {
            warn!("{} matched no paths", pattern.as_ref());
        }
        out.extend(matched);
    }
    Ok(out)
}

fn matching_children(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let dir = if base.as_os_str().is_empty() { Path::new(".") } else { base };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(dir, e)),
    };

    let mut out = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name();
        if glob_match(pattern, &name.to_string_lossy()) {
            out.push(base.join(name));
        }
    }
    Ok(out)
}
