//! Command-line entry point: migrate AFS IOC repositories to GitHub.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use afs_ioc_migration::{
    expand_patterns, GithubClient, HostingApi, MigrateOptions, MigrationBatch, TemplateSet,
    DEFAULT_ORG,
};
use clap::Parser;
use log::{error, info, warn, LevelFilter};

/// Move EPICS IOC repositories from AFS to a GitHub organization.
///
/// Each path is locked on AFS, copied with all branches and tags to
/// `github.com/<org>/ioc-<area>-<name>`, and given a standard license,
/// gitignore, GitHub templates and README. The exit code is the number of
/// repositories that failed.
#[derive(Parser, Debug)]
#[command(name = "afs-ioc-migration", version, about, verbatim_doc_comment)]
struct Cli {
    /// AFS repository paths; `*` and `?` are expanded per path component.
    #[arg(required = true)]
    paths: Vec<String>,

    /// Destination GitHub organization.
    #[arg(long, env = "AFS_IOC_MIGRATION_ORG", default_value = DEFAULT_ORG)]
    org: String,

    /// Stop at the first repository that fails.
    #[arg(long)]
    stop_on_error: bool,

    /// Assemble each repository locally without touching AFS or GitHub.
    #[arg(long)]
    dry_run: bool,

    /// Where dry-run repositories are left for inspection.
    #[arg(long, default_value = ".")]
    dry_run_dir: PathBuf,

    /// Directory overriding the built-in LICENSE.md, gitignore and github/.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Seconds to wait between live migrations.
    #[arg(long, default_value_t = 2)]
    pace_secs: u64,

    /// GitHub token. Required unless --dry-run.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let templates = match &cli.assets {
        Some(dir) => match TemplateSet::from_dir(dir) {
            Ok(set) => set,
            Err(err) => {
                error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => TemplateSet::builtin(),
    };

    let client = GithubClient::new(cli.token.clone());
    if !cli.dry_run && !client.has_token() {
        error!("a GitHub token is required for a live run (set GITHUB_TOKEN or pass --token)");
        return ExitCode::FAILURE;
    }
    // Dry runs without a token skip the destination check.
    let hosting: Option<&dyn HostingApi> = if client.has_token() {
        Some(&client)
    } else {
        None
    };

    let options = MigrateOptions {
        org: cli.org,
        dry_run: cli.dry_run,
        dry_run_dir: cli.dry_run_dir,
        stop_on_error: cli.stop_on_error,
        pace: Duration::from_secs(cli.pace_secs),
        templates,
        ..Default::default()
    };

    let paths = match expand_patterns(&cli.paths) {
        Ok(paths) => paths,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if paths.is_empty() {
        warn!("no repositories matched");
    }

    match MigrationBatch::new(&options, hosting).run(&paths) {
        Ok(report) => {
            for failure in &report.failed {
                info!("failed: {}", failure.path.display());
            }
            ExitCode::from(u8::try_from(report.error_count()).unwrap_or(u8::MAX))
        }
        Err(err) => {
            error!("stopping on error: {err}");
            ExitCode::FAILURE
        }
    }
}
