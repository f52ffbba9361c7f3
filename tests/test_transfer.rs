mod common;

use std::path::Path;

use afs_ioc_migration::lock::HOOK_NAME;
use afs_ioc_migration::transfer::{MSG_GITHUB, MSG_GITIGNORE, MSG_LICENSE, MSG_README};
use afs_ioc_migration::*;
use common::RecordingHost;
use git2::{BranchType, Repository};

const ARTIFACTS: &[&str] = &[
    ".gitignore",
    "LICENSE.md",
    ".github/ISSUE_TEMPLATE.md",
    ".github/PULL_REQUEST_TEMPLATE.md",
    "README.md",
];

fn messages(repo: &Repository) -> Vec<String> {
    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
        .unwrap();
    walk.map(|oid| {
        let commit = repo.find_commit(oid.unwrap()).unwrap();
        commit.summary().unwrap_or_default().to_string()
    })
    .collect()
}

fn in_head(repo: &Repository, path: &str) -> bool {
    let tree = repo.head().unwrap().peel_to_tree().unwrap();
    tree.get_path(Path::new(path)).is_ok()
}

// ---------------------------------------------------------------------------
// dry run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_assembles_standard_repo() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/dry_run.git");
    let out = tempfile::tempdir().unwrap();
    let options = common::dry_run_options(out.path());

    let outcome = Migrator::new(&options, None)
        .migrate(common::source_str(&source))
        .unwrap();

    assert_eq!(outcome.stage, Stage::Done);
    assert_eq!(outcome.lock, LockOutcome::Skipped);
    assert_eq!(outcome.destination, Destination::Unchecked);
    assert_eq!(outcome.info.name, "ioc-tst-dry_run");
    let workdir = outcome.workdir.unwrap();
    assert_eq!(workdir, out.path().join("ioc-tst-dry_run"));

    for artifact in ARTIFACTS {
        assert!(workdir.join(artifact).is_file(), "missing {artifact}");
    }

    let repo = Repository::open(&workdir).unwrap();
    let source_repo = Repository::open_bare(&source).unwrap();
    assert!(common::history_len(&repo) > common::history_len(&source_repo));
    assert_eq!(
        messages(&repo),
        vec!["initial", MSG_LICENSE, MSG_GITIGNORE, MSG_GITHUB, MSG_README]
    );
    assert_eq!(repo.head().unwrap().shorthand(), Some("master"));

    for artifact in ARTIFACTS {
        assert!(in_head(&repo, artifact), "{artifact} not committed");
    }
    assert!(in_head(&repo, "st.cmd"));
    assert!(!in_head(&repo, "README"));
    assert!(!workdir.join("README").exists());
    let readme = std::fs::read_to_string(workdir.join("README.md")).unwrap();
    assert!(readme.contains("old readme"));

    // The source is untouched.
    assert!(!source.join("hooks").join(HOOK_NAME).exists());
}

#[test]
fn dry_run_keeps_branches_and_tags() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/branches.git");
    {
        let repo = Repository::open_bare(&source).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.tag_lightweight("R1.0.0", head.as_object(), false)
            .unwrap();
        let sig = git2::Signature::now("tester", "tester@localhost").unwrap();
        repo.tag("R1.0.1", head.as_object(), &sig, "release", false)
            .unwrap();
        repo.branch("dev", &head, false).unwrap();
        common::commit_files(&repo, "refs/heads/dev", &[("dev.txt", "wip\n")], "dev work");
    }
    let out = tempfile::tempdir().unwrap();
    let options = common::dry_run_options(out.path());

    let outcome = Migrator::new(&options, None)
        .migrate(common::source_str(&source))
        .unwrap();
    let repo = Repository::open(outcome.workdir.unwrap()).unwrap();

    let dev = repo.find_branch("dev", BranchType::Local).unwrap();
    let dev_commit = dev.get().peel_to_commit().unwrap();
    assert_eq!(dev_commit.summary(), Some("dev work"));
    assert!(repo.find_branch("master", BranchType::Local).is_ok());

    let mut tags: Vec<String> = repo
        .tag_names(None)
        .unwrap()
        .iter()
        .flatten()
        .map(str::to_string)
        .collect();
    tags.sort();
    assert_eq!(tags, vec!["R1.0.0", "R1.0.1"]);
}

#[test]
fn dry_run_source_default_branch_becomes_master() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("ioc/tst/trunk.git");
    std::fs::create_dir_all(source.join("hooks")).unwrap();
    {
        let repo = Repository::init_bare(&source).unwrap();
        common::commit_files(&repo, "refs/heads/trunk", &[("st.cmd", "x\n")], "first");
        repo.set_head("refs/heads/trunk").unwrap();
    }
    let out = tempfile::tempdir().unwrap();
    let options = common::dry_run_options(out.path());

    let outcome = Migrator::new(&options, None)
        .migrate(common::source_str(&source))
        .unwrap();
    let repo = Repository::open(outcome.workdir.unwrap()).unwrap();
    assert_eq!(repo.head().unwrap().shorthand(), Some("master"));
    assert!(repo.find_branch("trunk", BranchType::Local).is_err());
    assert_eq!(messages(&repo)[0], "first");
}

#[test]
fn dry_run_picks_free_directory() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/again.git");
    let out = tempfile::tempdir().unwrap();
    let options = common::dry_run_options(out.path());
    let migrator = Migrator::new(&options, None);

    let first = migrator.migrate(common::source_str(&source)).unwrap();
    let second = migrator.migrate(common::source_str(&source)).unwrap();
    assert_eq!(first.workdir.unwrap(), out.path().join("ioc-tst-again"));
    assert_eq!(second.workdir.unwrap(), out.path().join("ioc-tst-again.1"));
}

#[test]
fn dry_run_with_hosting_only_checks_destination() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/check.git");
    let out = tempfile::tempdir().unwrap();
    let options = common::dry_run_options(out.path());
    let host = RecordingHost::commits_status(404);

    let outcome = Migrator::new(&options, Some(&host))
        .migrate(common::source_str(&source))
        .unwrap();
    assert_eq!(outcome.destination, Destination::Absent);
    assert_eq!(host.calls(), vec!["list_commits pcdshub/ioc-tst-check"]);
}

#[test]
fn dry_run_with_hosting_stops_on_existing_history() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/taken.git");
    let out = tempfile::tempdir().unwrap();
    let options = common::dry_run_options(out.path());
    let host = RecordingHost::with_history();

    let err = Migrator::new(&options, Some(&host))
        .migrate(common::source_str(&source))
        .unwrap_err();
    assert!(matches!(err, Error::RepoExists(_)), "{err}");
    assert!(!out.path().join("ioc-tst-taken").exists());
}

// ---------------------------------------------------------------------------
// live runs against the in-memory host
// ---------------------------------------------------------------------------

#[test]
fn live_run_without_hosting_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/nohost.git");
    let options = common::live_options();

    let err = Migrator::new(&options, None)
        .migrate(common::source_str(&source))
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
    assert!(!is_locked(common::source_str(&source), DEFAULT_ORG).unwrap());
}

#[test]
fn live_run_locks_then_refuses_existing_history() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/live.git");
    let src = common::source_str(&source);
    let options = common::live_options();
    let host = RecordingHost::with_history();

    let err = Migrator::new(&options, Some(&host)).migrate(src).unwrap_err();
    assert!(matches!(err, Error::RepoExists(_)), "{err}");
    assert!(is_locked(src, DEFAULT_ORG).unwrap());
    assert_eq!(host.calls(), vec!["list_commits pcdshub/ioc-tst-live"]);
}

#[test]
fn live_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/rerun.git");
    let src = common::source_str(&source);
    let hook = source.join("hooks").join(HOOK_NAME);
    let options = common::live_options();
    let host = RecordingHost::with_history();
    let migrator = Migrator::new(&options, Some(&host));

    assert!(matches!(migrator.migrate(src), Err(Error::RepoExists(_))));
    let installed = std::fs::read(&hook).unwrap();

    // The second lock attempt sees its own hook and carries on to the destination check.
    assert!(matches!(migrator.migrate(src), Err(Error::RepoExists(_))));
    assert_eq!(std::fs::read(&hook).unwrap(), installed);
    assert!(!source.join("hooks").join("pre-receive.bak.0").exists());
    assert_eq!(host.calls().len(), 2);
}

#[test]
fn destination_check_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/forbidden.git");
    let options = common::live_options();
    let host = RecordingHost::commits_status(403);

    let err = Migrator::new(&options, Some(&host))
        .migrate(common::source_str(&source))
        .unwrap_err();
    assert_eq!(err.http_status(), Some(403));
    assert_eq!(host.calls().len(), 1);
}

#[test]
fn create_failure_stops_before_topics() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/create.git");
    let options = common::live_options();
    let host = RecordingHost {
        commits: Some(404),
        create: Some(422),
        ..Default::default()
    };

    let err = Migrator::new(&options, Some(&host))
        .migrate(common::source_str(&source))
        .unwrap_err();
    assert_eq!(err.http_status(), Some(422));
    assert_eq!(
        host.calls(),
        vec![
            "list_commits pcdshub/ioc-tst-create",
            "create_in_org pcdshub/ioc-tst-create",
        ]
    );
}

#[test]
fn empty_destination_skips_creation() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/rixs/empty.git");
    let options = common::live_options();
    let host = RecordingHost {
        commits: Some(409),
        topics: Some(500),
        ..Default::default()
    };

    let err = Migrator::new(&options, Some(&host))
        .migrate(common::source_str(&source))
        .unwrap_err();
    assert_eq!(err.http_status(), Some(500));
    assert_eq!(
        host.calls(),
        vec![
            "list_commits pcdshub/ioc-rix-empty",
            "replace_all_topics pcdshub/ioc-rix-empty epics,epics-ioc,ioc-rix",
        ]
    );
}

// ---------------------------------------------------------------------------
// live runs that push
// ---------------------------------------------------------------------------

fn branch_messages(repo: &Repository, branch: &str) -> Vec<String> {
    let tip = repo.find_branch(branch, BranchType::Local).unwrap();
    let mut walk = repo.revwalk().unwrap();
    walk.push(tip.get().target().unwrap()).unwrap();
    walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
        .unwrap();
    walk.map(|oid| {
        let commit = repo.find_commit(oid.unwrap()).unwrap();
        commit.summary().unwrap_or_default().to_string()
    })
    .collect()
}

#[test]
fn live_run_creates_sets_topics_and_pushes() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/full.git");
    let src = common::source_str(&source);
    {
        let repo = Repository::open_bare(&source).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.tag_lightweight("R1.0.0", head.as_object(), false)
            .unwrap();
        repo.branch("dev", &head, false).unwrap();
        common::commit_files(&repo, "refs/heads/dev", &[("dev.txt", "wip\n")], "dev work");
    }
    let github = tempfile::tempdir().unwrap();
    let host = RecordingHost::pushing_to(github.path());
    let options = common::live_options();

    let outcome = Migrator::new(&options, Some(&host)).migrate(src).unwrap();

    assert_eq!(outcome.stage, Stage::Done);
    assert_eq!(outcome.destination, Destination::Absent);
    assert_eq!(outcome.lock, LockOutcome::Installed(LockState::Locked));
    assert_eq!(outcome.workdir, None);
    assert!(is_locked(src, DEFAULT_ORG).unwrap());

    assert_eq!(
        host.calls(),
        vec![
            "list_commits pcdshub/ioc-tst-full",
            "create_in_org pcdshub/ioc-tst-full",
            "replace_all_topics pcdshub/ioc-tst-full epics,epics-ioc,ioc-tst",
        ]
    );
    assert_eq!(
        *host.created.borrow(),
        vec![CreateRepo::epics_ioc("ioc-tst-full")]
    );

    let pushed = Repository::open_bare(host.destination("ioc-tst-full")).unwrap();
    assert_eq!(
        branch_messages(&pushed, "master"),
        vec!["initial", MSG_LICENSE, MSG_GITIGNORE, MSG_GITHUB, MSG_README]
    );
    assert_eq!(branch_messages(&pushed, "dev"), vec!["initial", "dev work"]);
    let tags = pushed.tag_names(None).unwrap();
    assert_eq!(tags.iter().flatten().collect::<Vec<_>>(), vec!["R1.0.0"]);
}

#[test]
fn push_failure_is_git_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::make_source(dir.path(), "ioc/tst/unreachable.git");
    let github = tempfile::tempdir().unwrap();
    // Empty destination: nothing is created, so there is no repository to push to.
    let host = RecordingHost {
        commits: Some(409),
        ..RecordingHost::pushing_to(github.path())
    };
    let options = common::live_options();

    let err = Migrator::new(&options, Some(&host))
        .migrate(common::source_str(&source))
        .unwrap_err();
    assert!(matches!(err, Error::Git(_)), "{err}");
    assert!(host.created.borrow().is_empty());
    assert_eq!(
        host.calls(),
        vec![
            "list_commits pcdshub/ioc-tst-unreachable",
            "replace_all_topics pcdshub/ioc-tst-unreachable epics,epics-ioc,ioc-tst",
        ]
    );
}
