//! End-to-end tests against real git repositories built with git2.

use std::fs;
use std::path::Path;

use git2::{Oid, Repository};
use semver::Version;
use serial_test::serial;
use tempfile::TempDir;

use git_lineage::analyzer::StateCalculator;
use git_lineage::checker::{check_and_repair, Checker};
use git_lineage::config::Config;
use git_lineage::git::{Backend, Git2Backend};
use git_lineage::session::Session;

// Helper to set up a temporary git repo for testing
fn setup_test_repo() -> (TempDir, Repository) {
    let temp_dir = TempDir::new().expect("Could not create temp dir");
    let repo = Repository::init(temp_dir.path()).expect("Could not init git repo");

    {
        let mut config = repo.config().expect("Could not get config");
        config
            .set_str("user.name", "Test User")
            .expect("Could not set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Could not set user.email");
    }

    (temp_dir, repo)
}

// Create a commit with the given message, updating a tracked file
fn commit_file(repo: &Repository, temp_dir: &TempDir, content: &str, message: &str) -> Oid {
    let content_path = temp_dir.path().join("README.md");
    fs::write(&content_path, content).expect("Could not write file");

    let mut index = repo.index().expect("Could not get index");
    index
        .add_path(Path::new("README.md"))
        .expect("Could not add file to index");
    index.write().expect("Could not write index");

    let tree_id = index.write_tree().expect("Could not write tree");
    let tree = repo.find_tree(tree_id).expect("Could not find tree");
    let signature = repo.signature().expect("Could not get signature");

    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().expect("Could not peel HEAD")],
        Err(_) => vec![],
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parent_refs,
    )
    .expect("Could not create commit")
}

fn tag(repo: &Repository, name: &str, target: Oid) {
    repo.tag_lightweight(name, &repo.find_object(target, None).unwrap(), false)
        .expect("Could not create tag");
}

#[test]
#[serial]
fn calculates_versions_over_a_real_repository() {
    let (temp_dir, repo) = setup_test_repo();
    let first = commit_file(&repo, &temp_dir, "one\n", "Initial commit\n\n+semver: breaking");
    tag(&repo, "1.0.0", first);
    let second = commit_file(&repo, &temp_dir, "two\n", "Follow-up work");

    let backend = Git2Backend::open(temp_dir.path()).unwrap();
    let session = Session::new(&backend, &Config::default()).unwrap();
    let calculator = StateCalculator::new(&session);

    let tagged = calculator.calculate(first).unwrap();
    assert_eq!(tagged.version, Version::new(1, 0, 0));
    assert_eq!(tagged.prerelease, "");

    let tip = calculator.calculate(second).unwrap();
    assert_eq!(tip.calculated_release, Version::new(1, 0, 1));
    assert_eq!(tip.commits_since_release, 1);
    assert!(tip.version.to_string().starts_with("1.0.1-alpha.1."));

    assert_eq!(backend.head().unwrap(), second);
    assert!(backend.is_ancestor(first, second).unwrap());
    assert!(!backend.is_ancestor(second, first).unwrap());
}

#[test]
#[serial]
fn ref_listing_classifies_tags_and_branches() {
    let (temp_dir, repo) = setup_test_repo();
    let first = commit_file(&repo, &temp_dir, "one\n", "Initial commit");
    tag(&repo, "0.1.0", first);
    tag(&repo, "not-a-release", first);

    let backend = Git2Backend::open(temp_dir.path()).unwrap();
    let refs = backend.list_refs().unwrap();

    let tag_names: Vec<&str> = refs
        .iter()
        .filter(|r| r.is_tag)
        .map(|r| r.name.as_str())
        .collect();
    assert!(tag_names.contains(&"0.1.0"));
    assert!(tag_names.contains(&"not-a-release"));

    // The default branch created by init exists and points at the commit
    let branch = refs.iter().find(|r| !r.is_tag).expect("a branch");
    assert_eq!(branch.target, first);
}

#[test]
#[serial]
fn repair_loop_builds_branches_in_a_real_repository() {
    let (temp_dir, repo) = setup_test_repo();
    let first = commit_file(
        &repo,
        &temp_dir,
        "one\n",
        "Initial commit\n\n+semver: breaking",
    );
    tag(&repo, "1.0.0", first);
    let second = commit_file(&repo, &temp_dir, "two\n", "Follow-up work");

    // Make the development tip a master branch regardless of the init
    // default; the reference-level update works even on the checked-out
    // branch
    repo.reference("refs/heads/master", second, true, "test setup")
        .expect("Could not set master");

    let backend = Git2Backend::open(temp_dir.path()).unwrap();

    let outcome = check_and_repair(&backend, &Config::default()).unwrap();
    assert!(outcome.is_clean(), "outcome: {:?}", outcome);

    let check_branch = |name: &str, expected: Oid| {
        let branch = repo
            .find_branch(name, git2::BranchType::Local)
            .unwrap_or_else(|_| panic!("branch {} missing", name));
        assert_eq!(branch.get().target(), Some(expected), "branch {}", name);
    };
    check_branch("latest", first);
    check_branch("1-latest", first);
    check_branch("1.0-latest", first);
    check_branch("master", second);

    // A fresh session over the repaired repository is clean
    let session = Session::new(&backend, &Config::default()).unwrap();
    let checker = Checker::new(&session);
    assert!(checker.check().unwrap().is_none());
}

#[test]
#[serial]
fn checker_rejects_merge_commits_in_a_real_repository() {
    let (temp_dir, repo) = setup_test_repo();
    let first = commit_file(&repo, &temp_dir, "one\n", "Initial commit");
    let second = commit_file(&repo, &temp_dir, "two\n", "More work");

    // Manufacture a merge commit of the two line ends
    let tree = repo
        .find_commit(second)
        .unwrap()
        .tree()
        .expect("Could not get tree");
    let signature = repo.signature().unwrap();
    let merge = repo
        .commit(
            None,
            &signature,
            &signature,
            "Merge the lines",
            &tree,
            &[
                &repo.find_commit(first).unwrap(),
                &repo.find_commit(second).unwrap(),
            ],
        )
        .unwrap();
    tag(&repo, "1.0.0", merge);

    let backend = Git2Backend::open(temp_dir.path()).unwrap();
    let session = Session::new(&backend, &Config::default()).unwrap();
    let checker = Checker::new(&session);

    let failure = checker.check().unwrap().expect("merge commit must fail");
    assert!(failure.description.contains("merge commit"));
    assert!(!failure.is_repairable());
}
