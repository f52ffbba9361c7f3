//! Merge a repository's existing `.gitignore` into the standard one.
//!
//! Entries are compared after [`strip_separators`], so `/build/` in the old
//! file is considered covered by `build/` in the template. Entries the
//! template does not cover are appended, in their original order, under
//! [`CARRIED_OVER_HEADER`].

use std::collections::HashSet;

use crate::paths::strip_separators;

/// Label placed above entries carried over from the previous file.
pub const CARRIED_OVER_HEADER: &str = "# Entries carried over from the previous .gitignore";

/// Return the rule lines of an ignore file.
///
/// Blank lines and lines whose first non-whitespace character is `#` are
/// skipped. Each returned line is trimmed of surrounding whitespace.
pub fn entries(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect()
}

/// Entries of `existing` not already present in `template`.
///
/// Order follows `existing`; an entry repeated in `existing` is kept once.
pub fn unique_entries<'a>(template: &str, existing: &'a str) -> Vec<&'a str> {
    let mut seen: HashSet<&str> = entries(template).into_iter().map(strip_separators).collect();
    entries(existing)
        .into_iter()
        .filter(|entry| seen.insert(strip_separators(entry)))
        .collect()
}

/// Produce the merged file: the template verbatim, followed by the unique
/// entries of `existing` under a labeled section.
///
/// Returns the template unchanged when nothing is unique.
pub fn merge(template: &str, existing: &str) -> String {
    let unique = unique_entries(template, existing);
    let mut out = template.to_string();
    if unique.is_empty() {
        return out;
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(CARRIED_OVER_HEADER);
    out.push('\n');
    for entry in unique {
        out.push_str(entry);
        out.push('\n');
    }
    out
}
