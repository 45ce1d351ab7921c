//! Lineage consistency checks.
//!
//! A fixed, ordered battery of invariant checks over releases and
//! convention-named branches. `check` returns the first failing check, not
//! an aggregate report: the repair loop fixes one violation, rebuilds the
//! session, and asks again. Each check re-derives its inputs from the
//! session, so a checker is only as fresh as the session it borrows.

pub mod remote;
pub mod repair;

pub use remote::RemoteChecker;
pub use repair::{check_and_repair, RepairOutcome};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use git2::Oid;
use semver::Version;

use crate::analyzer::StateCalculator;
use crate::branches::{latest_branch_specs, master_branch_specs};
use crate::catalog::{Release, ReleaseCatalog};
use crate::domain::commit::Commit;
use crate::domain::refs::{MasterScope, RefName};
use crate::domain::version::minor_series;
use crate::error::Result;
use crate::git::Backend;
use crate::session::Session;

/// One failed invariant.
///
/// Carries a human-readable description of the violation, a description of
/// the fix, and, when the fix can be automated, a zero-argument repair
/// action closed over exactly the context needed to fix this one violation.
/// A failure without a repair action requires manual intervention.
pub struct CheckFailure<'a> {
    pub description: String,
    pub repair_description: String,
    repair: Option<Box<dyn FnOnce() -> Result<()> + 'a>>,
}

impl fmt::Debug for CheckFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckFailure")
            .field("description", &self.description)
            .field("repair_description", &self.repair_description)
            .field("repairable", &self.repair.is_some())
            .finish()
    }
}

impl<'a> CheckFailure<'a> {
    /// A failure that cannot be repaired automatically.
    pub fn fatal(description: impl Into<String>, repair_description: impl Into<String>) -> Self {
        CheckFailure {
            description: description.into(),
            repair_description: repair_description.into(),
            repair: None,
        }
    }

    /// A failure paired with an automated repair.
    pub fn repairable(
        description: impl Into<String>,
        repair_description: impl Into<String>,
        repair: impl FnOnce() -> Result<()> + 'a,
    ) -> Self {
        CheckFailure {
            description: description.into(),
            repair_description: repair_description.into(),
            repair: Some(Box::new(repair)),
        }
    }

    pub fn is_repairable(&self) -> bool {
        self.repair.is_some()
    }

    /// Execute the repair action, if there is one.
    ///
    /// Returns whether a repair ran. After a repair the repository has
    /// changed: discard the session and every component built on it before
    /// checking again.
    pub fn repair(self) -> Result<bool> {
        match self.repair {
            Some(action) => {
                action()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn short(id: Oid) -> String {
    id.to_string().chars().take(7).collect()
}

/// The ordered check battery.
pub struct Checker<'a, B: Backend> {
    session: &'a Session<'a, B>,
}

impl<'a, B: Backend> Checker<'a, B> {
    pub fn new(session: &'a Session<'a, B>) -> Self {
        Checker { session }
    }

    /// Run every check in order and return the first failure, if any.
    pub fn check(&self) -> Result<Option<CheckFailure<'a>>> {
        let checks: [fn(&Self) -> Result<Option<CheckFailure<'a>>>; 18] = [
            Self::check_no_merge_commits,
            Self::check_no_zero_release,
            Self::check_no_multi_release_commits,
            Self::check_no_missing_major_releases,
            Self::check_no_missing_minor_releases,
            Self::check_no_missing_patch_releases,
            Self::check_release_ordering,
            Self::check_major_release_ordering,
            Self::check_minor_release_ordering,
            Self::check_patch_release_ordering,
            Self::check_major_release_content,
            Self::check_minor_release_content,
            Self::check_patch_release_content,
            Self::check_latest_branches_exist,
            Self::check_latest_branches_correct,
            Self::check_master_branches_exist,
            Self::check_master_branch_series,
            Self::check_master_branches_not_behind,
        ];

        for check in checks {
            if let Some(failure) = check(self)? {
                return Ok(Some(failure));
            }
        }

        Ok(None)
    }

    fn catalog(&self) -> Result<ReleaseCatalog> {
        ReleaseCatalog::build(self.session)
    }

    fn branch_tips(&self) -> Result<BTreeMap<String, Oid>> {
        Ok(self
            .session
            .refs()?
            .iter()
            .filter(|r| !r.is_tag)
            .map(|r| (r.name.clone(), r.target))
            .collect())
    }

    /// Commits from `to` (inclusive) back to `from` (exclusive), or back to
    /// the root of history if `from` is not an ancestor.
    fn commits_between(&self, from: Oid, to: Oid) -> Result<Vec<Rc<Commit>>> {
        let mut commits = Vec::new();
        let mut cursor = Some(to);

        while let Some(id) = cursor {
            if id == from {
                break;
            }
            let commit = self.session.commit(id)?;
            cursor = commit.linear_parent()?;
            commits.push(commit);
        }

        Ok(commits)
    }

    /// 1: every commit reachable from a release tag or master branch tip
    /// has at most one parent.
    fn check_no_merge_commits(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let mut starts: BTreeSet<Oid> = catalog.ascending().iter().map(|r| r.commit).collect();
        for r in self.session.refs()?.iter() {
            if matches!(r.classify(), RefName::MasterBranch(_)) {
                starts.insert(r.target);
            }
        }

        let mut visited: BTreeSet<Oid> = BTreeSet::new();
        for start in starts {
            let mut cursor = Some(start);
            while let Some(id) = cursor {
                if !visited.insert(id) {
                    break;
                }
                let commit = self.session.commit(id)?;
                if commit.parents.len() > 1 {
                    return Ok(Some(CheckFailure::fatal(
                        format!("Commit {} is a merge commit", short(id)),
                        "Flatten the history; lineage calculation requires a linear chain",
                    )));
                }
                cursor = commit.parents.first().copied();
            }
        }

        Ok(None)
    }

    /// 2: no release tag parses to version 0.0.0.
    fn check_no_zero_release(&self) -> Result<Option<CheckFailure<'a>>> {
        for r in self.session.refs()?.iter() {
            if let RefName::ReleaseTag(version) = r.classify() {
                if version == Version::new(0, 0, 0) {
                    return Ok(Some(CheckFailure::fatal(
                        format!("Tag '{}' releases version 0.0.0", r.name),
                        "Delete the tag; 0.0.0 is not a valid release",
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 3: no commit carries more than one release tag.
    fn check_no_multi_release_commits(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let mut by_commit: BTreeMap<Oid, Vec<&Release>> = BTreeMap::new();
        for release in catalog.ascending() {
            by_commit.entry(release.commit).or_default().push(release);
        }

        for (commit, releases) in by_commit {
            if releases.len() > 1 {
                let tags: Vec<&str> = releases.iter().map(|r| r.tag_name.as_str()).collect();
                return Ok(Some(CheckFailure::fatal(
                    format!(
                        "Commit {} carries {} release tags: {}",
                        short(commit),
                        releases.len(),
                        tags.join(", ")
                    ),
                    "Delete all but one of the release tags",
                )));
            }
        }

        Ok(None)
    }

    /// 4: every `N.0.0` up to the latest major exists.
    fn check_no_missing_major_releases(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        if let Some(latest) = catalog.latest() {
            for major in 1..=latest.version.major {
                let expected = Version::new(major, 0, 0);
                if catalog.find(&expected).is_none() {
                    return Ok(Some(CheckFailure::fatal(
                        format!("Release {} is missing", expected),
                        format!("Tag the commit that released {} retroactively", expected),
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 5: within each major series, every `.M.0` up to the series' latest
    /// minor exists.
    fn check_no_missing_minor_releases(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        for release in catalog.latest_major_series() {
            for minor in 1..=release.version.minor {
                let expected = Version::new(release.version.major, minor, 0);
                if catalog.find(&expected).is_none() {
                    return Ok(Some(CheckFailure::fatal(
                        format!("Release {} is missing", expected),
                        format!("Tag the commit that released {} retroactively", expected),
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 6: within each minor series, every patch below the series' latest
    /// patch exists.
    fn check_no_missing_patch_releases(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        for release in catalog.latest_minor_series() {
            for patch in 1..release.version.patch {
                let expected =
                    Version::new(release.version.major, release.version.minor, patch);
                if catalog.find(&expected).is_none() {
                    return Ok(Some(CheckFailure::fatal(
                        format!("Release {} is missing", expected),
                        format!("Tag the commit that released {} retroactively", expected),
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 7: no release is numerically below the release on its nearest tagged
    /// ancestor.
    fn check_release_ordering(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        for release in catalog.ascending() {
            if let Some(previous) = catalog.previous_ancestral(self.session, release)? {
                if release.version < previous.version {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Release {} descends from the higher release {}",
                            release.version, previous.version
                        ),
                        "Re-tag the releases so versions ascend along history",
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 8: every major release's commit descends from the previous major
    /// release's commit.
    fn check_major_release_ordering(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let backend = self.session.backend();

        for release in catalog.ascending().iter().filter(|r| r.is_major()) {
            let previous = catalog
                .previous_major_version(release)
                .and_then(|version| catalog.find(&version));
            if let Some(previous) = previous {
                if !backend.is_ancestor(previous.commit, release.commit)? {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Release {} does not descend from release {}",
                            release.version, previous.version
                        ),
                        "Re-tag the major releases onto one line of descent",
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 9: every minor release's commit descends from the previous major or
    /// minor release's commit.
    fn check_minor_release_ordering(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let backend = self.session.backend();

        for release in catalog.ascending().iter().filter(|r| r.is_minor()) {
            if let Some(previous) = catalog.previous_numeric_major_or_minor(release) {
                if !backend.is_ancestor(previous.commit, release.commit)? {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Release {} does not descend from release {}",
                            release.version, previous.version
                        ),
                        "Re-tag the minor release on a descendant of the preceding release",
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 10: every patch release's commit descends from the previous numeric
    /// release's commit.
    fn check_patch_release_ordering(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let backend = self.session.backend();

        for release in catalog.ascending().iter().filter(|r| r.is_patch()) {
            if let Some(previous) = catalog.previous_numeric(release) {
                if !backend.is_ancestor(previous.commit, release.commit)? {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Release {} does not descend from release {}",
                            release.version, previous.version
                        ),
                        "Re-tag the patch release on a descendant of the preceding release",
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 11: a major release contains at least one breaking change since its
    /// previous ancestral release.
    fn check_major_release_content(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        for release in catalog.ascending().iter().filter(|r| r.is_major()) {
            if let Some(previous) = catalog.previous_ancestral(self.session, release)? {
                let commits = self.commits_between(previous.commit, release.commit)?;
                if !commits.iter().any(|c| c.is_breaking) {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Major release {} has no breaking change since {}",
                            release.version, previous.version
                        ),
                        "Add a '+semver: breaking' trailer to a commit in the interval, \
                         or re-tag as a minor or patch release",
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 12: a minor release contains a feature change and no breaking change
    /// since its previous ancestral release.
    fn check_minor_release_content(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        for release in catalog.ascending().iter().filter(|r| r.is_minor()) {
            if let Some(previous) = catalog.previous_ancestral(self.session, release)? {
                let commits = self.commits_between(previous.commit, release.commit)?;
                if commits.iter().any(|c| c.is_breaking) {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Minor release {} contains a breaking change since {}",
                            release.version, previous.version
                        ),
                        "Re-tag as a major release, or drop the breaking trailer",
                    )));
                }
                if !commits.iter().any(|c| c.is_feature) {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Minor release {} has no feature change since {}",
                            release.version, previous.version
                        ),
                        "Add a '+semver: feature' trailer to a commit in the interval, \
                         or re-tag as a patch release",
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 13: a patch release contains neither feature nor breaking changes
    /// since its previous ancestral release.
    fn check_patch_release_content(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        for release in catalog.ascending().iter().filter(|r| r.is_patch()) {
            if let Some(previous) = catalog.previous_ancestral(self.session, release)? {
                let commits = self.commits_between(previous.commit, release.commit)?;
                if commits.iter().any(|c| c.is_breaking) {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Patch release {} contains a breaking change since {}",
                            release.version, previous.version
                        ),
                        "Re-tag as a major release",
                    )));
                }
                if commits.iter().any(|c| c.is_feature) {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Patch release {} contains a feature change since {}",
                            release.version, previous.version
                        ),
                        "Re-tag as a minor release",
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 14: every latest branch that should exist does.
    fn check_latest_branches_exist(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let branches = self.branch_tips()?;
        let backend = self.session.backend();

        for spec in latest_branch_specs(&catalog) {
            if !branches.contains_key(&spec.name) {
                let name = spec.name.clone();
                let target = spec.commit;
                return Ok(Some(CheckFailure::repairable(
                    format!("Branch '{}' does not exist", spec.name),
                    format!("Create branch '{}' at {}", spec.name, short(target)),
                    move || backend.set_branch(&name, target),
                )));
            }
        }

        Ok(None)
    }

    /// 15: every latest branch points at its release's commit.
    fn check_latest_branches_correct(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let branches = self.branch_tips()?;
        let backend = self.session.backend();

        for spec in latest_branch_specs(&catalog) {
            if let Some(tip) = branches.get(&spec.name) {
                if *tip != spec.commit {
                    let name = spec.name.clone();
                    let target = spec.commit;
                    return Ok(Some(CheckFailure::repairable(
                        format!(
                            "Branch '{}' points at {} instead of release {}",
                            spec.name,
                            short(*tip),
                            spec.version
                        ),
                        format!("Move branch '{}' to {}", spec.name, short(target)),
                        move || backend.set_branch(&name, target),
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 16: every master branch that should exist does.
    fn check_master_branches_exist(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let branches = self.branch_tips()?;
        let backend = self.session.backend();

        for spec in master_branch_specs(self.session, &catalog)? {
            if !branches.contains_key(&spec.name) {
                let name = spec.name.clone();
                let target = spec.commit;
                return Ok(Some(CheckFailure::repairable(
                    format!("Branch '{}' does not exist", spec.name),
                    format!("Create branch '{}' at {}", spec.name, short(target)),
                    move || backend.set_branch(&name, target),
                )));
            }
        }

        Ok(None)
    }

    /// 17: every master-named branch tracks the series its name promises.
    fn check_master_branch_series(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let specs = master_branch_specs(self.session, &catalog)?;
        let mainline_series = specs
            .iter()
            .find(|s| s.name == "master")
            .map(|s| s.series.clone());
        let calculator = StateCalculator::new(self.session);
        let backend = self.session.backend();

        for r in self.session.refs()?.iter().filter(|r| !r.is_tag) {
            let scope = match RefName::of_branch_name(&r.name) {
                RefName::MasterBranch(scope) => scope,
                _ => continue,
            };
            let expected = match scope {
                MasterScope::Mainline => mainline_series.clone(),
                MasterScope::Series(major, minor) => Some(Version::new(major, minor, 0)),
            };
            let actual = minor_series(&calculator.calculate(r.target)?.version);
            if expected.as_ref() == Some(&actual) {
                continue;
            }

            let description = format!(
                "Branch '{}' is on series {}.{} instead of its own series",
                r.name, actual.major, actual.minor
            );
            match specs.iter().find(|s| s.name == r.name) {
                Some(spec) => {
                    let name = r.name.clone();
                    let target = spec.commit;
                    return Ok(Some(CheckFailure::repairable(
                        description,
                        format!("Move branch '{}' to {}", r.name, short(target)),
                        move || backend.set_branch(&name, target),
                    )));
                }
                None => {
                    return Ok(Some(CheckFailure::fatal(
                        description,
                        format!("Delete branch '{}'; its series is not maintained", r.name),
                    )));
                }
            }
        }

        Ok(None)
    }

    /// 18: no master branch is behind the latest known point of its series.
    fn check_master_branches_not_behind(&self) -> Result<Option<CheckFailure<'a>>> {
        let catalog = self.catalog()?;
        let branches = self.branch_tips()?;
        let backend = self.session.backend();

        for spec in master_branch_specs(self.session, &catalog)? {
            if let Some(tip) = branches.get(&spec.name) {
                if *tip == spec.commit || backend.is_ancestor(spec.commit, *tip)? {
                    continue;
                }
                let name = spec.name.clone();
                let target = spec.commit;
                return Ok(Some(CheckFailure::repairable(
                    format!(
                        "Branch '{}' is behind its series at {}",
                        spec.name,
                        short(target)
                    ),
                    format!("Move branch '{}' to {}", spec.name, short(target)),
                    move || backend.set_branch(&name, target),
                )));
            }
        }

        Ok(None)
    }
}
