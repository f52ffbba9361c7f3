//! Standard files added to every migrated repository.
//!
//! Each function works on a checked-out working tree and returns the paths
//! it touched so the caller can stage and commit them.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::gitignore;
use crate::glob::fnmatch_ci;
use crate::rename::RepoInfo;
use crate::templates::{OriginalReadme, Readme, TemplateSet};

pub const LICENSE_FILE: &str = "LICENSE.md";
pub const GITIGNORE_FILE: &str = ".gitignore";
pub const GITHUB_FOLDER: &str = ".github";
pub const README_FILE: &str = "README.md";

/// Write the standard license to `LICENSE.md`, replacing any existing file.
pub fn add_license_file(cloned_path: &Path, templates: &TemplateSet) -> Result<PathBuf> {
    let dst = cloned_path.join(LICENSE_FILE);
    std::fs::write(&dst, &templates.license).map_err(|e| Error::io(&dst, e))?;
    Ok(dst)
}

/// Install the standard `.gitignore`, keeping any rules the old one had that
/// the standard file lacks.
pub fn add_gitignore(cloned_path: &Path, templates: &TemplateSet) -> Result<PathBuf> {
    let dst = cloned_path.join(GITIGNORE_FILE);
    let text = match std::fs::read_to_string(&dst) {
        Ok(existing) => {
            let unique = gitignore::unique_entries(&templates.gitignore, &existing);
            if !unique.is_empty() {
                info!("keeping {} entries from the existing .gitignore", unique.len());
            }
            gitignore::merge(&templates.gitignore, &existing)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => templates.gitignore.clone(),
        Err(e) => return Err(Error::io(&dst, e)),
    };
    std::fs::write(&dst, text).map_err(|e| Error::io(&dst, e))?;
    Ok(dst)
}

/// Add a `.github` folder with issue and pull request templates.
///
/// # Errors
/// Returns [`Error::AlreadyExists`] if `.github` is already present.
pub fn add_github_folder(cloned_path: &Path, templates: &TemplateSet) -> Result<PathBuf> {
    let dst = cloned_path.join(GITHUB_FOLDER);
    if dst.exists() {
        return Err(Error::already_exists(&dst));
    }
    for (rel, contents) in &templates.github_folder {
        let file = dst.join(rel);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(&file, contents).map_err(|e| Error::io(&file, e))?;
    }
    // An empty override still produces the folder.
    std::fs::create_dir_all(&dst).map_err(|e| Error::io(&dst, e))?;
    Ok(dst)
}

/// Create the standard `README.md`, folding in every pre-existing readme.
///
/// The README contains the repository identity followed by one section per
/// top-level file whose name contains "readme" in any case, hidden files
/// included, sorted by name.
/// Those files are deleted once the new README is written.
///
/// Returns the new file and the removed files (empty if there were none).
///
/// # Errors
/// Returns [`Error::AlreadyExists`] if `README.md` is already present.
pub fn add_readme_file(cloned_path: &Path, info: &RepoInfo) -> Result<(PathBuf, Vec<PathBuf>)> {
    let dst = cloned_path.join(README_FILE);
    if dst.exists() {
        return Err(Error::already_exists(&dst));
    }

    let original_paths = find_readmes(cloned_path)?;
    let mut originals = Vec::with_capacity(original_paths.len());
    for path in &original_paths {
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        originals.push(OriginalReadme {
            name: file_name(path),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    let text = Readme::new(info, &originals).to_text()?;
    std::fs::write(&dst, text).map_err(|e| Error::io(&dst, e))?;

    for path in &original_paths {
        debug!("removing superseded {}", path.display());
        std::fs::remove_file(path).map_err(|e| Error::io(path, e))?;
    }
    Ok((dst, original_paths))
}

/// Top-level regular files, dotfiles too, whose name contains "readme",
/// sorted by name.
fn find_readmes(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && fnmatch_ci("*readme*", &file_name(&path)) {
            found.push(path);
        }
    }
    found.sort_by_key(|p| file_name(p));
    Ok(found)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
