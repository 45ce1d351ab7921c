use git2::Oid;
use semver::Version;

use crate::catalog::{Release, ReleaseCatalog};
use crate::domain::refs::LatestScope;

/// A latest branch that should exist, and the release it should point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestBranchSpec {
    pub name: String,
    pub version: Version,
    pub commit: Oid,
}

impl LatestBranchSpec {
    fn new(scope: LatestScope, release: &Release) -> Self {
        LatestBranchSpec {
            name: scope.branch_name(),
            version: release.version.clone(),
            commit: release.commit,
        }
    }
}

/// The full set of latest branches the catalog calls for.
///
/// `latest` tracks the highest release overall, `{major}-latest` the highest
/// release of each major series, and `{major}.{minor}-latest` the highest
/// release of each minor series. A repository without releases has no
/// latest branches.
pub fn latest_branch_specs(catalog: &ReleaseCatalog) -> Vec<LatestBranchSpec> {
    let mut specs = Vec::new();

    if let Some(release) = catalog.latest() {
        specs.push(LatestBranchSpec::new(LatestScope::Overall, release));
    }

    for release in catalog.latest_major_series() {
        specs.push(LatestBranchSpec::new(
            LatestScope::Major(release.version.major),
            release,
        ));
    }

    for release in catalog.latest_minor_series() {
        specs.push(LatestBranchSpec::new(
            LatestScope::Minor(release.version.major, release.version.minor),
            release,
        ));
    }

    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::mock::{oid, MockBackend};
    use crate::session::Session;

    #[test]
    fn test_no_releases_no_latest_branches() {
        let backend = MockBackend::new();
        backend.add_commit(oid(1), vec![], "root");

        let session = Session::new(&backend, &Config::default()).unwrap();
        let catalog = ReleaseCatalog::build(&session).unwrap();
        assert!(latest_branch_specs(&catalog).is_empty());
    }

    #[test]
    fn test_latest_branch_specs() {
        let backend = MockBackend::new();
        let a = backend.add_commit(oid(1), vec![], "a");
        let b = backend.add_commit(oid(2), vec![a], "b");
        let c = backend.add_commit(oid(3), vec![b], "c");
        let d = backend.add_commit(oid(4), vec![c], "d");
        backend.add_tag("1.0.0", a);
        backend.add_tag("1.0.1", b);
        backend.add_tag("1.1.0", c);
        backend.add_tag("2.0.0", d);

        let session = Session::new(&backend, &Config::default()).unwrap();
        let catalog = ReleaseCatalog::build(&session).unwrap();
        let specs = latest_branch_specs(&catalog);

        let lookup = |name: &str| {
            specs
                .iter()
                .find(|s| s.name == name)
                .unwrap_or_else(|| panic!("missing spec {}", name))
        };

        assert_eq!(lookup("latest").version, Version::new(2, 0, 0));
        assert_eq!(lookup("latest").commit, d);
        assert_eq!(lookup("1-latest").version, Version::new(1, 1, 0));
        assert_eq!(lookup("2-latest").version, Version::new(2, 0, 0));
        assert_eq!(lookup("1.0-latest").version, Version::new(1, 0, 1));
        assert_eq!(lookup("1.1-latest").version, Version::new(1, 1, 0));
        assert_eq!(lookup("2.0-latest").version, Version::new(2, 0, 0));
        assert_eq!(specs.len(), 6);
    }
}
