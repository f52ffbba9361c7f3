//! Assets and text templates installed into migrated repositories.
//!
//! Static assets (license, ignore rules, the `.github` folder) are compiled
//! in and may be overridden from a directory on disk. The README and the
//! pre-receive hook are `askama` templates under `templates/`.

use std::path::{Path, PathBuf};

use askama::Template;
use log::debug;

use crate::error::{Error, Result};
use crate::rename::RepoInfo;

const LICENSE: &str = include_str!("../assets/LICENSE.md");
const GITIGNORE: &str = include_str!("../assets/gitignore");
const ISSUE_TEMPLATE: &str = include_str!("../assets/github/ISSUE_TEMPLATE.md");
const PULL_REQUEST_TEMPLATE: &str = include_str!("../assets/github/PULL_REQUEST_TEMPLATE.md");

// ---------------------------------------------------------------------------
// TemplateSet
// ---------------------------------------------------------------------------

/// The static files every migrated repository receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    /// Contents of `LICENSE.md`.
    pub license: String,
    /// Standard `.gitignore` contents.
    pub gitignore: String,
    /// Files of the `.github` folder, as (relative path, contents).
    pub github_folder: Vec<(PathBuf, String)>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateSet {
    /// The assets compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            license: LICENSE.to_string(),
            gitignore: GITIGNORE.to_string(),
            github_folder: vec![
                (PathBuf::from("ISSUE_TEMPLATE.md"), ISSUE_TEMPLATE.to_string()),
                (
                    PathBuf::from("PULL_REQUEST_TEMPLATE.md"),
                    PULL_REQUEST_TEMPLATE.to_string(),
                ),
            ],
        }
    }

    /// Load assets from `dir`, falling back to the built-in copy for any
    /// piece that is missing.
    ///
    /// Layout: `LICENSE.md`, `gitignore`, and a `github/` folder copied
    /// recursively.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `dir` is not a directory, or an I/O error
    /// if an asset exists but cannot be read.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::config(format!(
                "asset directory {} does not exist",
                dir.display()
            )));
        }
        let mut set = Self::builtin();

        let license = dir.join("LICENSE.md");
        if license.is_file() {
            set.license = std::fs::read_to_string(&license).map_err(|e| Error::io(&license, e))?;
        } else {
            debug!("no {} override, using built-in license", license.display());
        }

        let gitignore = dir.join("gitignore");
        if gitignore.is_file() {
            set.gitignore =
                std::fs::read_to_string(&gitignore).map_err(|e| Error::io(&gitignore, e))?;
        } else {
            debug!("no {} override, using built-in gitignore", gitignore.display());
        }

        let github = dir.join("github");
        if github.is_dir() {
            let mut files = Vec::new();
            walk_disk(&github, &github, &mut files)?;
            files.sort();
            set.github_folder = files
                .into_iter()
                .map(|rel| {
                    let full = github.join(&rel);
                    std::fs::read_to_string(&full)
                        .map(|text| (rel, text))
                        .map_err(|e| Error::io(&full, e))
                })
                .collect::<Result<_>>()?;
        } else {
            debug!("no {} override, using built-in github folder", github.display());
        }

        Ok(set)
    }
}

fn walk_disk(root: &Path, dir: &Path, results: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let meta = std::fs::symlink_metadata(&path).map_err(|e| Error::io(&path, e))?;

        if meta.is_dir() {
            walk_disk(root, &path, results)?;
        } else {
            let rel = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            results.push(rel);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendered templates
// ---------------------------------------------------------------------------

/// The pre-receive hook that rejects pushes to a migrated AFS repository.
#[derive(Template)]
#[template(path = "pre-receive.sh", escape = "none")]
pub struct HookScript<'a> {
    pub name: &'a str,
    pub canonical_url: &'a str,
    pub ssh_url: &'a str,
    pub source_path: &'a str,
}

impl<'a> HookScript<'a> {
    pub fn new(info: &'a RepoInfo) -> Self {
        Self {
            name: &info.name,
            canonical_url: &info.canonical_url,
            ssh_url: &info.ssh_url,
            source_path: &info.source_path,
        }
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(with_final_newline(self.render()?))
    }
}

/// A readme that existed before the migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalReadme {
    /// File name as found in the repository root.
    pub name: String,
    pub content: String,
}

/// The standard `README.md`.
#[derive(Template)]
#[template(path = "readme.md", escape = "none")]
pub struct Readme<'a> {
    pub name: &'a str,
    pub area: &'a str,
    pub canonical_url: &'a str,
    pub ssh_url: &'a str,
    pub source_path: &'a str,
    pub originals: &'a [OriginalReadme],
}

impl<'a> Readme<'a> {
    pub fn new(info: &'a RepoInfo, originals: &'a [OriginalReadme]) -> Self {
        Self {
            name: &info.name,
            area: &info.area,
            canonical_url: &info.canonical_url,
            ssh_url: &info.ssh_url,
            source_path: &info.source_path,
            originals,
        }
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(with_final_newline(self.render()?))
    }
}

fn with_final_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
