use git2::Oid;
use semver::Version;

use crate::domain::version::parse_release_version;

/// A tag or branch with its target commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    pub name: String,
    pub target: Oid,
    pub is_tag: bool,
}

impl Ref {
    pub fn tag(name: impl Into<String>, target: Oid) -> Self {
        Ref {
            name: name.into(),
            target,
            is_tag: true,
        }
    }

    pub fn branch(name: impl Into<String>, target: Oid) -> Self {
        Ref {
            name: name.into(),
            target,
            is_tag: false,
        }
    }

    /// Classify this ref by lineage convention.
    pub fn classify(&self) -> RefName {
        RefName::of(self)
    }
}

/// Scope of a latest branch: overall, one major series, or one minor series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestScope {
    Overall,
    Major(u64),
    Minor(u64, u64),
}

impl LatestScope {
    /// The branch name this scope maps to (`latest`, `1-latest`, `1.2-latest`).
    pub fn branch_name(&self) -> String {
        match self {
            LatestScope::Overall => "latest".to_string(),
            LatestScope::Major(major) => format!("{}-latest", major),
            LatestScope::Minor(major, minor) => format!("{}.{}-latest", major, minor),
        }
    }
}

/// Scope of a master branch: the mainline or one minor series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterScope {
    Mainline,
    Series(u64, u64),
}

impl MasterScope {
    /// The branch name this scope maps to (`master`, `1.2-master`).
    pub fn branch_name(&self) -> String {
        match self {
            MasterScope::Mainline => "master".to_string(),
            MasterScope::Series(major, minor) => format!("{}.{}-master", major, minor),
        }
    }
}

/// Classification of a ref name.
///
/// Every ref is exactly one of these; dispatch happens on the variant rather
/// than on a type hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefName {
    /// No lineage meaning
    Plain,
    /// Tag whose name parses as a clean release version
    ReleaseTag(Version),
    /// Convention branch tracking the most recent release in a scope
    LatestBranch(LatestScope),
    /// Convention branch tracking ongoing development of a series
    MasterBranch(MasterScope),
}

impl RefName {
    pub fn of(r: &Ref) -> Self {
        if r.is_tag {
            match parse_release_version(&r.name) {
                Some(version) => RefName::ReleaseTag(version),
                None => RefName::Plain,
            }
        } else {
            Self::of_branch_name(&r.name)
        }
    }

    /// Classify a branch name alone (used for the current-branch check in
    /// the repair driver, where only the name is at hand).
    pub fn of_branch_name(name: &str) -> Self {
        if name == "latest" {
            return RefName::LatestBranch(LatestScope::Overall);
        }
        if name == "master" {
            return RefName::MasterBranch(MasterScope::Mainline);
        }
        if let Some(scope) = name.strip_suffix("-latest") {
            if let Some((major, minor)) = parse_series(scope) {
                return RefName::LatestBranch(LatestScope::Minor(major, minor));
            }
            if let Ok(major) = scope.parse::<u64>() {
                return RefName::LatestBranch(LatestScope::Major(major));
            }
        }
        if let Some(scope) = name.strip_suffix("-master") {
            if let Some((major, minor)) = parse_series(scope) {
                return RefName::MasterBranch(MasterScope::Series(major, minor));
            }
        }
        RefName::Plain
    }
}

fn parse_series(text: &str) -> Option<(u64, u64)> {
    let (major, minor) = text.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}
