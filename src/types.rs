use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::lock::LockState;
use crate::rename::{RepoInfo, DEFAULT_ORG};
use crate::templates::TemplateSet;

/// Default pause between live migrations, for the GitHub rate limits.
pub const DEFAULT_PACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Author/committer identity used when git has none configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            name: "afs-ioc-migration".into(),
            email: "afs-ioc-migration@localhost".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// MigrateOptions
// ---------------------------------------------------------------------------

/// Options shared by every migration in a run.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Destination organization.
    pub org: String,
    /// Leave AFS and GitHub untouched and keep the assembled clone on disk.
    pub dry_run: bool,
    /// Where dry-run clones are kept.
    pub dry_run_dir: PathBuf,
    /// Abort the batch on the first failed repository.
    pub stop_on_error: bool,
    /// Pause before every live migration after the first.
    pub pace: Duration,
    /// Commit identity when git has none configured.
    pub signature: Signature,
    /// Files installed into every repository.
    pub templates: TemplateSet,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            org: DEFAULT_ORG.into(),
            dry_run: false,
            dry_run_dir: PathBuf::from("."),
            stop_on_error: false,
            pace: DEFAULT_PACE,
            signature: Signature::default(),
            templates: TemplateSet::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Steps of a single migration, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    Locked,
    Identified,
    ExistenceChecked,
    Created,
    Skipped,
    TopicsSet,
    Cloned,
    Modified,
    Committed,
    Pushed,
    DryRunHalted,
    Done,
    Failed,
}

impl Stage {
    /// `true` if `next` may follow `self`.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        if next == Failed {
            return !matches!(self, Done | Failed);
        }
        matches!(
            (self, next),
            (Init, Locked)
                | (Locked, Identified)
                | (Identified, ExistenceChecked)
                | (ExistenceChecked, Created | Skipped)
                | (Created | Skipped, TopicsSet)
                | (TopicsSet, Cloned)
                | (Cloned, Modified)
                | (Modified, Committed)
                | (Committed, Pushed | DryRunHalted)
                | (Pushed | DryRunHalted, Done)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Locked => "locked",
            Stage::Identified => "identified",
            Stage::ExistenceChecked => "existence-checked",
            Stage::Created => "created",
            Stage::Skipped => "skipped",
            Stage::TopicsSet => "topics-set",
            Stage::Cloned => "cloned",
            Stage::Modified => "modified",
            Stage::Committed => "committed",
            Stage::Pushed => "pushed",
            Stage::DryRunHalted => "dry-run-halted",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// MigrationOutcome
// ---------------------------------------------------------------------------

/// Whether the destination had to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The repository did not exist.
    Absent,
    /// The repository exists but has no commits.
    Empty,
    /// Not checked (dry run without a hosting client).
    Unchecked,
}

/// How the source lock step went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// Dry run: the source was not touched.
    Skipped,
    /// Our hook was already installed.
    AlreadyLocked,
    /// The hook was installed by this run.
    Installed(LockState),
}

/// Result of a successful migration.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub info: RepoInfo,
    /// Final stage, [`Stage::Done`] on success.
    pub stage: Stage,
    pub lock: LockOutcome,
    pub destination: Destination,
    /// Assembled clone kept for inspection (dry run only).
    pub workdir: Option<PathBuf>,
}
