//! Local working clone used to assemble the destination repository.
//!
//! Wraps the handful of `git2` operations a migration needs: init, remotes,
//! refspec fetch, branch creation and checkout, staging and committing, and a
//! single push of every branch and tag.

use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{
    AutotagOption, BranchType, Cred, CredentialType, Direction, FetchOptions, IndexAddOption,
    Oid, PushOptions, RemoteCallbacks, Repository,
};
use log::{debug, info};

use crate::error::{Error, Result};
use crate::types::Signature;

/// Remote name for the AFS source.
pub const SOURCE_REMOTE: &str = "afs_remote";
/// Remote name for the GitHub destination.
pub const DEST_REMOTE: &str = "github_remote";
/// Local name of the primary branch, whatever the source called it.
pub const PRIMARY_BRANCH: &str = "master";

/// References retrieved from the source by [`WorkingClone::fetch_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// Branch the source's HEAD points at, when the source advertises it.
    pub default_branch: Option<String>,
    /// Source branch names, sorted.
    pub branches: Vec<String>,
    /// Tag names, sorted.
    pub tags: Vec<String>,
}

impl FetchResult {
    /// Source branch that becomes the local primary branch.
    ///
    /// The advertised HEAD wins; otherwise a lone branch, then `master`,
    /// then `main`.
    pub fn source_head(&self) -> Result<&str> {
        if let Some(head) = &self.default_branch {
            if self.branches.iter().any(|b| b == head) {
                return Ok(head.as_str());
            }
        }
        if let [only] = self.branches.as_slice() {
            return Ok(only.as_str());
        }
        ["master", "main"]
            .into_iter()
            .find_map(|name| self.branches.iter().find(|b| *b == name))
            .map(String::as_str)
            .ok_or_else(|| {
                Error::git_msg(format!(
                    "cannot tell which of {} source branches is the default",
                    self.branches.len()
                ))
            })
    }

    /// Full name of the remote-tracking ref for a fetched branch.
    pub fn tracking_ref(branch: &str) -> String {
        format!("refs/remotes/{SOURCE_REMOTE}/{branch}")
    }
}

/// A non-bare repository being assembled for upload.
pub struct WorkingClone {
    repo: Repository,
    path: PathBuf,
    fallback: Signature,
}

impl WorkingClone {
    /// Initialize an empty repository at `path`.
    ///
    /// `fallback` signs commits when git has no configured identity.
    pub fn init(path: &Path, fallback: Signature) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
        let repo = Repository::init(path)?;
        Ok(Self {
            repo,
            path: path.to_path_buf(),
            fallback,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        debug!("adding remote {name} -> {url}");
        self.repo.remote(name, url)?;
        Ok(())
    }

    /// Fetch every branch into `refs/remotes/<remote>/*` and every tag into
    /// `refs/tags/*`.
    pub fn fetch_all(&self, remote_name: &str) -> Result<FetchResult> {
        let mut remote = self.repo.find_remote(remote_name)?;

        let default_branch = {
            let conn = remote.connect_auth(Direction::Fetch, Some(callbacks()), None)?;
            conn.default_branch()
                .ok()
                .and_then(|buf| buf.as_str().map(str::to_string))
                .map(|r| r.strip_prefix("refs/heads/").unwrap_or(&r).to_string())
        };

        let refspecs = [
            format!("+refs/heads/*:refs/remotes/{remote_name}/*"),
            "+refs/tags/*:refs/tags/*".to_string(),
        ];
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(callbacks());
        opts.download_tags(AutotagOption::None);
        remote.fetch(&refspecs, Some(&mut opts), None)?;

        let prefix = format!("refs/remotes/{remote_name}/");
        let mut branches = Vec::new();
        for reference in self.repo.references_glob(&format!("{prefix}*"))? {
            let reference = reference?;
            if let Some(name) = reference.name().and_then(|n| n.strip_prefix(&prefix)) {
                if name != "HEAD" {
                    branches.push(name.to_string());
                }
            }
        }
        branches.sort();

        let mut tags: Vec<String> = self
            .repo
            .tag_names(None)?
            .iter()
            .flatten()
            .map(str::to_string)
            .collect();
        tags.sort();

        if branches.is_empty() {
            return Err(Error::git_msg(format!("{remote_name} has no branches to migrate")));
        }
        info!(
            "fetched {} branches and {} tags from {remote_name}",
            branches.len(),
            tags.len()
        );
        Ok(FetchResult {
            default_branch,
            branches,
            tags,
        })
    }

    /// Create local branch `name` at `from_ref` and check it out.
    pub fn checkout_new_branch(&self, name: &str, from_ref: &str) -> Result<()> {
        self.create_branch(name, from_ref)?;
        self.repo.set_head(&format!("refs/heads/{name}"))?;
        self.repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
        Ok(())
    }

    /// Create local branch `name` pointing at the commit `from_ref` resolves to.
    ///
    /// # Errors
    /// Returns [`Error::BranchExists`] if the branch is already present.
    pub fn create_branch(&self, name: &str, from_ref: &str) -> Result<()> {
        if self.repo.find_branch(name, BranchType::Local).is_ok() {
            return Err(Error::branch_exists(name));
        }
        let commit = self.repo.find_reference(from_ref)?.peel_to_commit()?;
        self.repo.branch(name, &commit, false)?;
        Ok(())
    }

    /// Stage `add` and the removal of `remove`, then commit on HEAD.
    ///
    /// Paths may be absolute (inside the working tree) or relative to it.
    /// Directories in `add` are staged recursively.
    pub fn commit_paths(&self, add: &[PathBuf], remove: &[PathBuf], message: &str) -> Result<Oid> {
        let mut index = self.repo.index()?;
        for path in add {
            let rel = self.relative(path)?;
            if self.path.join(&rel).is_dir() {
                index.add_all([rel.as_path()], IndexAddOption::DEFAULT, None)?;
            } else {
                index.add_path(&rel)?;
            }
        }
        for path in remove {
            index.remove_path(&self.relative(path)?)?;
        }
        index.write()?;

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let parent = self.repo.head()?.peel_to_commit()?;
        let sig = self.signature()?;
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;
        info!("committed {oid}: {message}");
        Ok(oid)
    }

    /// Local branch names, sorted.
    pub fn branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Push every local branch and tag to `remote_name` in one operation.
    pub fn push_all(&self, remote_name: &str) -> Result<()> {
        let mut refspecs: Vec<String> = self
            .branches()?
            .into_iter()
            .map(|b| format!("refs/heads/{b}:refs/heads/{b}"))
            .collect();
        for tag in self.repo.tag_names(None)?.iter().flatten() {
            refspecs.push(format!("refs/tags/{tag}:refs/tags/{tag}"));
        }

        let mut remote = self.repo.find_remote(remote_name)?;
        let mut rejected = Vec::new();
        {
            let mut cb = callbacks();
            cb.push_update_reference(|refname, status| {
                if let Some(msg) = status {
                    rejected.push(format!("{refname}: {msg}"));
                }
                Ok(())
            });
            let mut opts = PushOptions::new();
            opts.remote_callbacks(cb);
            remote.push(&refspecs, Some(&mut opts))?;
        }

        if !rejected.is_empty() {
            return Err(Error::git_msg(format!(
                "{remote_name} rejected {}",
                rejected.join(", ")
            )));
        }
        info!("pushed {} refs to {remote_name}", refspecs.len());
        Ok(())
    }

    fn relative(&self, path: &Path) -> Result<PathBuf> {
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }
        path.strip_prefix(&self.path)
            .map(Path::to_path_buf)
            .map_err(|_| {
                Error::invalid_path(format!(
                    "{} is outside {}",
                    path.display(),
                    self.path.display()
                ))
            })
    }

    fn signature(&self) -> Result<git2::Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => {
                debug!("no git identity configured, signing as {}", self.fallback.name);
                Ok(git2::Signature::now(&self.fallback.name, &self.fallback.email)?)
            }
        }
    }
}

/// Callbacks offering ssh-agent credentials once per operation.
fn callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut cb = RemoteCallbacks::new();
    let mut tried = false;
    cb.credentials(move |url, username, allowed| {
        if tried || !allowed.contains(CredentialType::SSH_KEY) {
            return Err(git2::Error::from_str(&format!("no usable credentials for {url}")));
        }
        tried = true;
        Cred::ssh_key_from_agent(username.unwrap_or("git"))
    });
    cb
}
