use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::paths::first_free_sibling;
use crate::rename::RepoInfo;
use crate::templates::HookScript;

/// Name of the server-side hook that blocks pushes.
pub const HOOK_NAME: &str = "pre-receive";

/// What [`lock_source_repo`] did to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No hook was present; ours was installed.
    Locked,
    /// A different hook was present; it was backed up and replaced.
    Replaced { backup: PathBuf },
}

/// Install a pre-receive hook on an AFS repository so it rejects pushes.
///
/// Run before the migration so no new changes land in the old location while
/// it is being moved.
///
/// The hook lives in `<path>/hooks` for a bare repository, or
/// `<path>/.git/hooks` for one with a working tree.
///
/// # Arguments
/// * `path` - Source repository path, following the AFS naming convention.
/// * `org` - Destination organization, embedded in the hook message.
///
/// # Errors
/// * [`Error::InvalidPath`] if `path` does not follow the naming convention.
/// * [`Error::NotARepo`] if neither hooks directory exists.
/// * [`Error::AlreadyLocked`] if our exact hook is already installed. The
///   file is left untouched; callers treat this as success.
/// * [`Error::Lock`] if a foreign hook needs a backup and every backup
///   slot is taken.
pub fn lock_source_repo(path: &str, org: &str) -> Result<LockState> {
    let info = RepoInfo::from_source(path, org)?;
    let hook_path = hooks_dir(Path::new(path))?.join(HOOK_NAME);
    let rendered = HookScript::new(&info).to_text()?;

    let state = if hook_path.exists() {
        let existing = std::fs::read(&hook_path).map_err(|e| Error::io(&hook_path, e))?;
        if existing == rendered.as_bytes() {
            return Err(Error::already_locked(format!(
                "{} already blocks pushes to {}",
                hook_path.display(),
                path
            )));
        }

        let backup = first_free_sibling(&hook_path.with_file_name(format!("{HOOK_NAME}.bak")))?;
        warn!(
            "{} has a different pre-receive hook, backing it up to {}",
            path,
            backup.display()
        );
        std::fs::copy(&hook_path, &backup).map_err(|e| Error::io(&backup, e))?;
        LockState::Replaced { backup }
    } else {
        LockState::Locked
    };

    std::fs::write(&hook_path, rendered).map_err(|e| Error::io(&hook_path, e))?;
    make_executable(&hook_path)?;
    info!("installed {}", hook_path.display());
    Ok(state)
}

/// `true` if `path` already carries exactly the hook [`lock_source_repo`]
/// would install.
pub fn is_locked(path: &str, org: &str) -> Result<bool> {
    let info = RepoInfo::from_source(path, org)?;
    let hook_path = hooks_dir(Path::new(path))?.join(HOOK_NAME);
    match std::fs::read(&hook_path) {
        Ok(existing) => Ok(existing == HookScript::new(&info).to_text()?.as_bytes()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(&hook_path, e)),
    }
}

/// Locate the hooks directory of a bare or non-bare repository.
pub fn hooks_dir(repo: &Path) -> Result<PathBuf> {
    let bare = repo.join("hooks");
    if bare.is_dir() {
        return Ok(bare);
    }
    let worktree = repo.join(".git").join("hooks");
    if worktree.is_dir() {
        debug!("{} is not bare, using {}", repo.display(), worktree.display());
        return Ok(worktree);
    }
    Err(Error::not_a_repo(format!(
        "{} has no hooks or .git/hooks subdirectory",
        repo.display()
    )))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o775);
    std::fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
