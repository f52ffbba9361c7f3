//! Migrate EPICS IOC git repositories from AFS to GitHub.
//!
//! IOC repositories on AFS live at paths like
//! `/afs/slac/g/cd/swe/git/repos/package/epics/ioc/<area>/<name>.git`.
//! Each one is moved to `github.com/<org>/ioc-<area>-<name>` with its full
//! history, every branch and every tag, plus a few standard files.
//!
//! # Key types
//!
//! - [`RepoInfo`] - destination identity computed from an AFS path
//!   ([`rename`]).
//! - [`lock_source_repo`] - installs a pre-receive hook so the AFS copy
//!   rejects further pushes. Idempotent.
//! - [`Migrator`] - runs one migration end to end ([`transfer`]).
//! - [`MigrationBatch`] - runs many, sequentially, with pacing.
//! - [`HostingApi`] / [`GithubClient`] - the GitHub calls a migration makes.
//!
//! # Quick example
//!
//! ```rust,no_run
//! use afs_ioc_migration::{MigrateOptions, Migrator};
//!
//! let options = MigrateOptions {
//!     dry_run: true,
//!     dry_run_dir: "/tmp/inspect".into(),
//!     ..Default::default()
//! };
//! let outcome = Migrator::new(&options, None)
//!     .migrate("/afs/slac/g/cd/swe/git/repos/package/epics/ioc/xpp/gigECam.git")
//!     .unwrap();
//! println!("assembled at {:?}", outcome.workdir);
//! ```

pub mod batch;
pub mod error;
pub mod gitignore;
pub mod glob;
pub mod hosting;
pub mod lock;
pub mod mirror;
pub mod modify;
pub mod paths;
pub mod rename;
pub mod templates;
pub mod transfer;
pub mod types;

// Re-export primary public types at crate root.
pub use batch::{BatchReport, Failure, MigrationBatch};
pub use error::{Error, Result};
pub use glob::expand_patterns;
pub use hosting::{CreateRepo, GithubClient, HostingApi};
pub use lock::{is_locked, lock_source_repo, LockState};
pub use mirror::{FetchResult, WorkingClone};
pub use rename::{rename, RepoInfo, DEFAULT_ORG};
pub use templates::TemplateSet;
pub use transfer::Migrator;
pub use types::*;
