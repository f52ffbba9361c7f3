//! Move one AFS repository to GitHub.
//!
//! [`Migrator::migrate`] walks a repository through the [`Stage`]s in order:
//! lock the source, compute its identity, make sure the destination has no
//! history, create it and set its topics, assemble a local clone with the
//! standard files committed on top, recreate every branch, and push.
//!
//! Nothing is rolled back on failure. Re-running is safe: the lock is
//! idempotent and a destination that already has commits stops the run
//! before anything is written to it.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::hosting::{CreateRepo, HostingApi};
use crate::lock::lock_source_repo;
use crate::mirror::{FetchResult, WorkingClone, DEST_REMOTE, PRIMARY_BRANCH, SOURCE_REMOTE};
use crate::modify::{add_github_folder, add_gitignore, add_license_file, add_readme_file};
use crate::paths::first_free_dir;
use crate::rename::RepoInfo;
use crate::types::{Destination, LockOutcome, MigrateOptions, MigrationOutcome, Stage};

pub const MSG_LICENSE: &str = "MAINT: adding standard license file";
pub const MSG_GITIGNORE: &str = "MAINT: adding standard gitignore";
pub const MSG_GITHUB: &str = "MAINT: add github templates";
pub const MSG_README: &str = "MAINT: adding standard readme";

/// Topics set on every migrated repository.
pub fn topics(info: &RepoInfo) -> Vec<String> {
    vec![
        "epics".to_string(),
        "epics-ioc".to_string(),
        format!("ioc-{}", info.area),
    ]
}

/// Runs migrations with one set of options and one hosting client.
///
/// Without a hosting client only dry runs are possible, and they skip the
/// destination check.
pub struct Migrator<'a> {
    options: &'a MigrateOptions,
    hosting: Option<&'a dyn HostingApi>,
}

impl<'a> Migrator<'a> {
    pub fn new(options: &'a MigrateOptions, hosting: Option<&'a dyn HostingApi>) -> Self {
        Self { options, hosting }
    }

    pub fn options(&self) -> &MigrateOptions {
        self.options
    }

    /// Migrate the AFS repository at `source`.
    ///
    /// On a dry run the returned outcome carries the directory the clone was
    /// assembled in; it is not deleted.
    ///
    /// # Errors
    /// * [`Error::InvalidPath`] / [`Error::NotARepo`] from the lock step.
    /// * [`Error::RepoExists`] if the destination already has commits.
    /// * [`Error::Http`] for any other hosting API failure.
    /// * [`Error::Git`] for fetch, commit or push failures.
    pub fn migrate(&self, source: &str) -> Result<MigrationOutcome> {
        let mut progress = Progress::new(source);
        match self.run(source, &mut progress) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!("{source}: stopped after stage {}", progress.stage);
                progress.advance(Stage::Failed);
                Err(err)
            }
        }
    }

    fn run(&self, source: &str, progress: &mut Progress<'_>) -> Result<MigrationOutcome> {
        let opts = self.options;
        if !opts.dry_run {
            self.live_api()?;
        }

        let lock = self.lock(source)?;
        progress.advance(Stage::Locked);

        let info = RepoInfo::from_source(source, &opts.org)?;
        progress.advance(Stage::Identified);

        let destination = self.check_destination(&info)?;
        progress.advance(Stage::ExistenceChecked);

        if destination == Destination::Absent && !opts.dry_run {
            info!("Creating repository at {}", info.canonical_url);
            self.live_api()?
                .create_in_org(&opts.org, &CreateRepo::epics_ioc(&info.name))?;
            progress.advance(Stage::Created);
        } else {
            info!("Skipping creation of {}", info.canonical_url);
            progress.advance(Stage::Skipped);
        }

        if opts.dry_run {
            debug!("dry run: not setting topics on {}", info.name);
        } else {
            info!("Setting standard repo topics");
            self.live_api()?
                .replace_all_topics(&opts.org, &info.name, &topics(&info))?;
        }
        progress.advance(Stage::TopicsSet);

        // `_temp` keeps a live run's clone on disk until the push is done.
        let (workdir, _temp): (PathBuf, Option<TempDir>) = if opts.dry_run {
            (first_free_dir(&opts.dry_run_dir.join(&info.name))?, None)
        } else {
            let temp = tempfile::Builder::new()
                .prefix(&format!("{}-", info.name))
                .tempdir()
                .map_err(|e| Error::io(std::env::temp_dir(), e))?;
            (temp.path().to_path_buf(), Some(temp))
        };

        info!("Cloning HEAD from {source} to {} as {PRIMARY_BRANCH}", workdir.display());
        let clone = WorkingClone::init(&workdir, opts.signature.clone())?;
        clone.add_remote(SOURCE_REMOTE, &source_url(source)?)?;
        let fetched = clone.fetch_all(SOURCE_REMOTE)?;
        let head = fetched.source_head()?.to_string();
        clone.checkout_new_branch(PRIMARY_BRANCH, &FetchResult::tracking_ref(&head))?;
        progress.advance(Stage::Cloned);

        self.add_standard_files(&clone, &info)?;
        progress.advance(Stage::Modified);

        for branch in fetched.branches.iter().filter(|b| **b != head) {
            info!("Found branch named {branch}");
            clone.create_branch(branch, &FetchResult::tracking_ref(branch))?;
        }
        progress.advance(Stage::Committed);

        let workdir = if opts.dry_run {
            info!("Dry run: leaving assembled repository at {}", workdir.display());
            progress.advance(Stage::DryRunHalted);
            Some(workdir)
        } else {
            let url = self.live_api()?.push_url(&info);
            info!("Pushing all branches and tags to {url}");
            clone.add_remote(DEST_REMOTE, &url)?;
            clone.push_all(DEST_REMOTE)?;
            progress.advance(Stage::Pushed);
            None
        };
        progress.advance(Stage::Done);

        Ok(MigrationOutcome {
            info,
            stage: progress.stage,
            lock,
            destination,
            workdir,
        })
    }

    fn lock(&self, source: &str) -> Result<LockOutcome> {
        if self.options.dry_run {
            info!("Dry run: not locking {source}");
            return Ok(LockOutcome::Skipped);
        }
        info!("Locking afs repo {source}");
        match lock_source_repo(source, &self.options.org) {
            Ok(state) => {
                info!("{source} has been locked, continuing");
                Ok(LockOutcome::Installed(state))
            }
            Err(err) if err.is_already_locked() => {
                info!("{source} is already locked, continuing");
                Ok(LockOutcome::AlreadyLocked)
            }
            Err(err) => Err(err),
        }
    }

    /// Look for the destination's commits: 404 means absent, 409 means empty,
    /// success means it already has history.
    fn check_destination(&self, info: &RepoInfo) -> Result<Destination> {
        let api = match self.hosting {
            Some(api) => api,
            None if self.options.dry_run => {
                info!("Dry run without a hosting client: not checking {}", info.canonical_url);
                return Ok(Destination::Unchecked);
            }
            None => return Err(self.missing_api()),
        };

        info!("Checking for existing repo commits at {}", info.canonical_url);
        match api.list_commits(&self.options.org, &info.name) {
            Ok(()) => Err(Error::repo_exists(format!(
                "{} exists and has commits, aborting",
                info.canonical_url
            ))),
            Err(err) => match err.http_status() {
                Some(404) => {
                    info!("Repo {} does not exist, continuing", info.canonical_url);
                    Ok(Destination::Absent)
                }
                Some(409) => {
                    let url = &info.canonical_url;
                    info!("Repo {url} exists but does not have commits, continuing");
                    Ok(Destination::Empty)
                }
                _ => Err(err),
            },
        }
    }

    fn add_standard_files(&self, clone: &WorkingClone, info: &RepoInfo) -> Result<()> {
        let templates = &self.options.templates;
        let wd = clone.path();

        info!("Adding license file");
        let license = add_license_file(wd, templates)?;
        clone.commit_paths(&[license], &[], MSG_LICENSE)?;

        info!("Adding gitignore");
        let gitignore = add_gitignore(wd, templates)?;
        clone.commit_paths(&[gitignore], &[], MSG_GITIGNORE)?;

        info!("Adding github templates");
        let github = add_github_folder(wd, templates)?;
        clone.commit_paths(&[github], &[], MSG_GITHUB)?;

        info!("Adding readme");
        let (readme, removed) = add_readme_file(wd, info)?;
        for path in &removed {
            info!("Merged {} into the new readme", path.display());
        }
        clone.commit_paths(&[readme], &removed, MSG_README)?;
        Ok(())
    }

    fn live_api(&self) -> Result<&'a dyn HostingApi> {
        self.hosting.ok_or_else(|| self.missing_api())
    }

    fn missing_api(&self) -> Error {
        Error::config("a hosting client is required unless running a dry run")
    }
}

/// URL for the source remote; relative paths are made absolute so libgit2
/// reads them as local repositories.
fn source_url(source: &str) -> Result<String> {
    let path = Path::new(source);
    if path.is_absolute() {
        return Ok(source.to_string());
    }
    let abs: PathBuf = std::fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
    Ok(abs.to_string_lossy().into_owned())
}

/// Stage tracker for one migration, logging each transition.
struct Progress<'s> {
    source: &'s str,
    stage: Stage,
}

impl<'s> Progress<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            stage: Stage::Init,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "{} -> {next} is not a valid transition",
            self.stage
        );
        debug!("{}: {} -> {next}", self.source, self.stage);
        self.stage = next;
    }
}
