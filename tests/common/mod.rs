#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use afs_ioc_migration::*;
use git2::{Oid, Repository};

/// Create a bare source repository at `root/rel` with one commit on master.
///
/// The commit holds `st.cmd` and an old-style `README`.
pub fn make_source(root: &Path, rel: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(&path).unwrap();
    let repo = Repository::init_bare(&path).unwrap();
    std::fs::create_dir_all(path.join("hooks")).unwrap();

    commit_files(
        &repo,
        "refs/heads/master",
        &[("st.cmd", "#!../../bin/rhel7-x86_64/ioc\n"), ("README", "old readme\n")],
        "initial",
    );
    repo.set_head("refs/heads/master").unwrap();
    path
}

/// Commit `files` on top of `refname` (or as a root commit if it is unborn).
pub fn commit_files(repo: &Repository, refname: &str, files: &[(&str, &str)], msg: &str) -> Oid {
    let parent = repo
        .find_reference(refname)
        .ok()
        .and_then(|r| r.peel_to_commit().ok());

    let mut builder = match &parent {
        Some(commit) => repo.treebuilder(Some(&commit.tree().unwrap())).unwrap(),
        None => repo.treebuilder(None).unwrap(),
    };
    for (name, contents) in files {
        let blob = repo.blob(contents.as_bytes()).unwrap();
        builder.insert(*name, blob, 0o100644).unwrap();
    }
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();
    let sig = git2::Signature::now("tester", "tester@localhost").unwrap();
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some(refname), &sig, &sig, msg, &tree, &parents)
        .unwrap()
}

pub fn source_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

pub fn dry_run_options(out: &Path) -> MigrateOptions {
    MigrateOptions {
        dry_run: true,
        dry_run_dir: out.to_path_buf(),
        pace: Duration::ZERO,
        ..Default::default()
    }
}

pub fn live_options() -> MigrateOptions {
    MigrateOptions {
        pace: Duration::ZERO,
        ..Default::default()
    }
}

/// Number of commits reachable from HEAD.
pub fn history_len(repo: &Repository) -> usize {
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    walk.count()
}

// ---------------------------------------------------------------------------
// In-memory hosting API
// ---------------------------------------------------------------------------

/// Records every hosting call and answers with canned statuses.
///
/// `None` means success; `Some(status)` fails with that HTTP status.
/// With `push_root` set, pushes go to `<push_root>/<name>.git`, and a
/// successful create initializes a bare repository there.
#[derive(Default)]
pub struct RecordingHost {
    pub commits: Option<u16>,
    pub create: Option<u16>,
    pub topics: Option<u16>,
    pub push_root: Option<PathBuf>,
    pub calls: RefCell<Vec<String>>,
    pub created: RefCell<Vec<CreateRepo>>,
}

impl RecordingHost {
    /// Destination exists and has commits.
    pub fn with_history() -> Self {
        Self::default()
    }

    /// Listing destination commits answers `status`.
    pub fn commits_status(status: u16) -> Self {
        Self {
            commits: Some(status),
            ..Default::default()
        }
    }

    /// Destination is absent; creating it makes a bare repository under `root`.
    pub fn pushing_to(root: &Path) -> Self {
        Self {
            commits: Some(404),
            push_root: Some(root.to_path_buf()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn destination(&self, name: &str) -> PathBuf {
        self.push_root.as_ref().unwrap().join(format!("{name}.git"))
    }

    fn answer(&self, call: String, status: Option<u16>) -> Result<()> {
        self.calls.borrow_mut().push(call);
        match status {
            Some(status) => Err(Error::http(status, "canned")),
            None => Ok(()),
        }
    }
}

impl HostingApi for RecordingHost {
    fn list_commits(&self, owner: &str, repo: &str) -> Result<()> {
        self.answer(format!("list_commits {owner}/{repo}"), self.commits)
    }

    fn create_in_org(&self, org: &str, request: &CreateRepo) -> Result<()> {
        self.answer(format!("create_in_org {org}/{}", request.name), self.create)?;
        self.created.borrow_mut().push(request.clone());
        if self.push_root.is_some() {
            Repository::init_bare(self.destination(&request.name)).unwrap();
        }
        Ok(())
    }

    fn replace_all_topics(&self, owner: &str, repo: &str, names: &[String]) -> Result<()> {
        self.answer(
            format!("replace_all_topics {owner}/{repo} {}", names.join(",")),
            self.topics,
        )
    }

    fn push_url(&self, info: &RepoInfo) -> String {
        match &self.push_root {
            Some(_) => self.destination(&info.name).to_string_lossy().into_owned(),
            None => info.ssh_url.clone(),
        }
    }
}
