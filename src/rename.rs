//! Translate legacy AFS repository paths into GitHub repository names.
//!
//! The AFS layout nests IOC repositories under a literal `ioc` directory:
//!
//! ```text
//! /afs/slac/g/cd/swe/git/repos/package/epics/ioc/common/gigECam.git
//!                                            ^^^ ^^^^^^ ^^^^^^^
//!                                            root  area   leaf
//! ```
//!
//! which flattens to `ioc-common-gigECam`. One extra directory level between
//! the area and the leaf is folded into the leaf with a hyphen.

use crate::error::{Error, Result};
use crate::paths::split_components;

/// Organization used when none is given.
pub const DEFAULT_ORG: &str = "pcdshub";

/// Literal directory segment every IOC repository lives under.
pub const ROOT_MARKER: &str = "ioc";

/// Known area codes, matched case-sensitively.
pub const AREAS: &[&str] = &[
    "common", "cxi", "det", "fee", "hfx", "hpl", "kfe", "las", "lfe", "mec", "mfx", "rix",
    "rixs", "sxr", "tmo", "tst", "txi", "ued", "xcs", "xpp", "xrt",
];

/// Deprecated area codes and the area they fold into.
pub const AREA_ALIASES: &[(&str, &str)] = &[("rixs", "rix")];

/// Identity of one repository being migrated.
///
/// Built once per migration from the source path and organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoInfo {
    /// Destination repository name, e.g. `ioc-common-ims`.
    pub name: String,
    /// `https://github.com/<org>/<name>.git`
    pub canonical_url: String,
    /// `git@github.com:<org>/<name>.git`
    pub ssh_url: String,
    /// The source path exactly as given.
    pub source_path: String,
    /// Area after alias resolution.
    pub area: String,
}

impl RepoInfo {
    /// Compute the identity of the repository at `source_path`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPath`] if the path does not follow the AFS
    /// IOC naming convention.
    pub fn from_source(source_path: &str, org: &str) -> Result<Self> {
        let parts = parse(source_path)?;
        let name = parts.name();
        Ok(RepoInfo {
            canonical_url: canonical_url(org, &name),
            ssh_url: ssh_url(org, &name),
            name,
            source_path: source_path.to_string(),
            area: parts.area.to_string(),
        })
    }
}

/// Return the new repository name for an AFS path.
///
/// - `.../ioc/common/gigECam.git` -> `ioc-common-gigECam`
/// - `.../ioc/rixs/thermotek.git` -> `ioc-rix-thermotek`
/// - `.../ioc/xpp/cams/gige.git` -> `ioc-xpp-cams-gige`
pub fn rename(old_path: &str) -> Result<String> {
    Ok(parse(old_path)?.name())
}

pub fn canonical_url(org: &str, name: &str) -> String {
    format!("https://github.com/{org}/{name}.git")
}

pub fn ssh_url(org: &str, name: &str) -> String {
    format!("git@github.com:{org}/{name}.git")
}

/// Resolve an area through [`AREA_ALIASES`], or `None` if it is unknown.
pub fn resolve_area(area: &str) -> Option<&'static str> {
    let known: &'static str = AREAS.iter().copied().find(|a| *a == area)?;
    Some(
        AREA_ALIASES
            .iter()
            .find(|(old, _)| *old == known)
            .map(|(_, new)| *new)
            .unwrap_or(known),
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct NameParts<'a> {
    area: &'static str,
    subdir: Option<&'a str>,
    leaf: &'a str,
}

impl NameParts<'_> {
    fn name(&self) -> String {
        match self.subdir {
            Some(sub) => format!("{ROOT_MARKER}-{}-{sub}-{}", self.area, self.leaf),
            None => format!("{ROOT_MARKER}-{}-{}", self.area, self.leaf),
        }
    }
}

fn parse(old_path: &str) -> Result<NameParts<'_>> {
    let segments = split_components(old_path)?;
    let n = segments.len();
    let at = |depth: usize| n.checked_sub(depth).map(|i| segments[i]);

    // Two-level form first; the nested form only when `ioc` is not the
    // grandparent of the leaf.
    let (area, subdir) = if at(3) == Some(ROOT_MARKER) {
        (segments[n - 2], None)
    } else if at(4) == Some(ROOT_MARKER) {
        (segments[n - 3], Some(segments[n - 2]))
    } else {
        return Err(Error::invalid_path(format!(
            "{old_path} is not a valid afs ioc path"
        )));
    };

    let area = resolve_area(area).ok_or_else(|| {
        Error::invalid_path(format!("{old_path} has non-ecs area {area}"))
    })?;

    let leaf = segments[n - 1];
    let leaf = leaf.strip_suffix(".git").unwrap_or(leaf);
    if leaf.is_empty() {
        return Err(Error::invalid_path(format!("{old_path} has an empty repository name")));
    }

    Ok(NameParts { area, subdir, leaf })
}
