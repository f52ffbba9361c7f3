use std::path::{Path, PathBuf};
use std::thread;

use log::{error, info};

use crate::error::{Error, Result};
use crate::hosting::HostingApi;
use crate::transfer::Migrator;
use crate::types::{MigrateOptions, MigrationOutcome};

/// A repository that could not be migrated.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

/// Summary of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub migrated: Vec<MigrationOutcome>,
    pub failed: Vec<Failure>,
}

impl BatchReport {
    /// Number of failed repositories.
    pub fn error_count(&self) -> usize {
        self.failed.len()
    }

    /// `true` when every repository was migrated.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Migrates many repositories, one after another.
///
/// Live runs pause [`MigrateOptions::pace`] between migrations (not before
/// the first) to stay inside the hosting API's rate limits.
pub struct MigrationBatch<'a> {
    migrator: Migrator<'a>,
}

impl<'a> MigrationBatch<'a> {
    pub fn new(options: &'a MigrateOptions, hosting: Option<&'a dyn HostingApi>) -> Self {
        Self {
            migrator: Migrator::new(options, hosting),
        }
    }

    /// Migrate every path in order.
    ///
    /// # Errors
    /// With `stop_on_error`, returns the first migration error. Otherwise
    /// failures are logged and collected in the report.
    pub fn run<P: AsRef<Path>>(&self, paths: &[P]) -> Result<BatchReport> {
        let opts = self.migrator.options();
        let mut report = BatchReport::default();

        for (i, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            if i > 0 && !opts.dry_run && !opts.pace.is_zero() {
                thread::sleep(opts.pace);
            }

            info!("Migrating {} with dry_run={}", path.display(), opts.dry_run);
            let result = match path.to_str() {
                Some(source) => self.migrator.migrate(source),
                None => Err(Error::invalid_path(format!(
                    "{} is not valid UTF-8",
                    path.display()
                ))),
            };

            match result {
                Ok(outcome) => report.migrated.push(outcome),
                Err(err) if opts.stop_on_error => return Err(err),
                Err(err) => {
                    error!("Exception while transferring {}: {err}", path.display());
                    report.failed.push(Failure {
                        path: path.to_path_buf(),
                        error: err,
                    });
                }
            }
        }

        info!(
            "{} migrated, {} failed",
            report.migrated.len(),
            report.failed.len()
        );
        Ok(report)
    }
}
