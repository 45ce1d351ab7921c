//! Ordered release records derived from release tags.

use std::collections::BTreeMap;

use git2::Oid;
use semver::Version;

use crate::domain::refs::RefName;
use crate::domain::version::{major_series, minor_series, ReleaseKind};
use crate::error::Result;
use crate::git::Backend;
use crate::session::Session;

/// A release: a tag whose name parses as a clean semantic version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: Version,
    pub tag_name: String,
    pub commit: Oid,
}

impl Release {
    pub fn kind(&self) -> ReleaseKind {
        ReleaseKind::of(&self.version)
    }

    pub fn is_major(&self) -> bool {
        self.kind() == ReleaseKind::Major
    }

    pub fn is_minor(&self) -> bool {
        self.kind() == ReleaseKind::Minor
    }

    pub fn is_patch(&self) -> bool {
        self.kind() == ReleaseKind::Patch
    }

    /// The major series this release belongs to (`X.0.0`).
    pub fn major_series(&self) -> Version {
        major_series(&self.version)
    }

    /// The minor series this release belongs to (`X.Y.0`).
    pub fn minor_series(&self) -> Version {
        minor_series(&self.version)
    }
}

/// All releases of the repository, in ascending version order.
///
/// Derived once from the session's ref snapshot; a changed repository
/// requires a new catalog (by way of a new session).
pub struct ReleaseCatalog {
    releases: Vec<Release>,
}

impl ReleaseCatalog {
    /// Collect release tags from the session's ref snapshot.
    pub fn build<B: Backend>(session: &Session<'_, B>) -> Result<Self> {
        let mut releases: Vec<Release> = session
            .refs()?
            .iter()
            .filter_map(|r| match r.classify() {
                RefName::ReleaseTag(version) => Some(Release {
                    version,
                    tag_name: r.name.clone(),
                    commit: r.target,
                }),
                _ => None,
            })
            .collect();

        releases.sort_by(|a, b| {
            a.version
                .cmp(&b.version)
                .then_with(|| a.tag_name.cmp(&b.tag_name))
        });

        Ok(ReleaseCatalog { releases })
    }

    /// Releases in ascending version order.
    pub fn ascending(&self) -> &[Release] {
        &self.releases
    }

    /// Releases in descending version order.
    pub fn descending(&self) -> impl Iterator<Item = &Release> {
        self.releases.iter().rev()
    }

    /// The highest release overall.
    pub fn latest(&self) -> Option<&Release> {
        self.releases.last()
    }

    /// Find a release by exact version.
    pub fn find(&self, version: &Version) -> Option<&Release> {
        self.releases.iter().find(|r| &r.version == version)
    }

    /// All releases tagged on a commit, ascending.
    pub fn releases_at(&self, commit: Oid) -> Vec<&Release> {
        self.releases.iter().filter(|r| r.commit == commit).collect()
    }

    /// The highest release strictly below this one, ignoring ancestry.
    pub fn previous_numeric(&self, release: &Release) -> Option<&Release> {
        self.descending().find(|r| r.version < release.version)
    }

    /// The highest major or minor release strictly below this one.
    pub fn previous_numeric_major_or_minor(&self, release: &Release) -> Option<&Release> {
        self.descending()
            .find(|r| r.version < release.version && !r.is_patch())
    }

    /// The version of the major release preceding this release's series:
    /// `(X-1).0.0` for an `X.0.0` release, this release's own `X.0.0`
    /// otherwise.
    pub fn previous_major_version(&self, release: &Release) -> Option<Version> {
        if release.is_major() {
            release
                .version
                .major
                .checked_sub(1)
                .map(|major| Version::new(major, 0, 0))
        } else {
            Some(Version::new(release.version.major, 0, 0))
        }
    }

    /// The release on the nearest ancestor of this release's commit that
    /// carries one, excluding the commit itself. Highest version wins when
    /// an ancestor carries several (a state the checker reports as invalid).
    pub fn previous_ancestral<B: Backend>(
        &self,
        session: &Session<'_, B>,
        release: &Release,
    ) -> Result<Option<&Release>> {
        let mut cursor = session.commit(release.commit)?.linear_parent()?;

        while let Some(id) = cursor {
            if let Some(found) = self.releases_at(id).into_iter().last() {
                return Ok(Some(found));
            }
            cursor = session.commit(id)?.linear_parent()?;
        }

        Ok(None)
    }

    /// The highest release of each major series, ascending by series.
    pub fn latest_major_series(&self) -> Vec<&Release> {
        self.latest_by_key(|r| r.major_series())
    }

    /// The highest release of each minor series, ascending by series.
    pub fn latest_minor_series(&self) -> Vec<&Release> {
        self.latest_by_key(|r| r.minor_series())
    }

    fn latest_by_key(&self, key: impl Fn(&Release) -> Version) -> Vec<&Release> {
        let mut groups: BTreeMap<Version, &Release> = BTreeMap::new();
        // Ascending input order makes the last insert per group the maximum
        for release in &self.releases {
            groups.insert(key(release), release);
        }
        groups.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::mock::{oid, MockBackend};

    fn catalog_for(backend: &MockBackend) -> ReleaseCatalog {
        let session = Session::new(backend, &Config::default()).unwrap();
        ReleaseCatalog::build(&session).unwrap()
    }

    fn linear_history(backend: &MockBackend, count: u8) -> Vec<Oid> {
        let mut commits = Vec::new();
        for n in 1..=count {
            let parents = if n == 1 { vec![] } else { vec![oid(n - 1)] };
            commits.push(backend.add_commit(oid(n), parents, format!("commit {}", n)));
        }
        commits
    }

    #[test]
    fn test_catalog_orders_by_version() {
        let backend = MockBackend::new();
        let commits = linear_history(&backend, 3);
        backend.add_tag("2.0.0", commits[2]);
        backend.add_tag("1.0.0", commits[0]);
        backend.add_tag("1.1.0", commits[1]);
        backend.add_tag("nightly", commits[2]);

        let catalog = catalog_for(&backend);
        let versions: Vec<String> = catalog
            .ascending()
            .iter()
            .map(|r| r.version.to_string())
            .collect();
        assert_eq!(versions, vec!["1.0.0", "1.1.0", "2.0.0"]);
        assert_eq!(catalog.latest().unwrap().version, Version::new(2, 0, 0));
    }

    #[test]
    fn test_find_and_releases_at() {
        let backend = MockBackend::new();
        let commits = linear_history(&backend, 2);
        backend.add_tag("1.0.0", commits[0]);
        backend.add_tag("1.0.1", commits[1]);

        let catalog = catalog_for(&backend);
        assert!(catalog.find(&Version::new(1, 0, 0)).is_some());
        assert!(catalog.find(&Version::new(9, 0, 0)).is_none());
        assert_eq!(catalog.releases_at(commits[1]).len(), 1);
        assert_eq!(catalog.releases_at(oid(99)).len(), 0);
    }

    #[test]
    fn test_previous_numeric_relations() {
        let backend = MockBackend::new();
        let commits = linear_history(&backend, 4);
        backend.add_tag("1.0.0", commits[0]);
        backend.add_tag("1.0.1", commits[1]);
        backend.add_tag("1.1.0", commits[2]);
        backend.add_tag("1.1.1", commits[3]);

        let catalog = catalog_for(&backend);
        let latest = catalog.latest().unwrap();

        assert_eq!(
            catalog.previous_numeric(latest).unwrap().version,
            Version::new(1, 1, 0)
        );
        assert_eq!(
            catalog
                .previous_numeric_major_or_minor(latest)
                .unwrap()
                .version,
            Version::new(1, 1, 0)
        );

        let minor = catalog.find(&Version::new(1, 1, 0)).unwrap();
        assert_eq!(
            catalog
                .previous_numeric_major_or_minor(minor)
                .unwrap()
                .version,
            Version::new(1, 0, 0)
        );
    }

    #[test]
    fn test_previous_major_version() {
        let backend = MockBackend::new();
        let commits = linear_history(&backend, 3);
        backend.add_tag("1.0.0", commits[0]);
        backend.add_tag("1.2.0", commits[1]);
        backend.add_tag("2.0.0", commits[2]);

        let catalog = catalog_for(&backend);
        let two = catalog.find(&Version::new(2, 0, 0)).unwrap();
        let minor = catalog.find(&Version::new(1, 2, 0)).unwrap();

        assert_eq!(
            catalog.previous_major_version(two),
            Some(Version::new(1, 0, 0))
        );
        assert_eq!(
            catalog.previous_major_version(minor),
            Some(Version::new(1, 0, 0))
        );
    }

    #[test]
    fn test_previous_ancestral() {
        let backend = MockBackend::new();
        let commits = linear_history(&backend, 4);
        backend.add_tag("1.0.0", commits[0]);
        backend.add_tag("1.1.0", commits[2]);

        let session = Session::new(&backend, &Config::default()).unwrap();
        let catalog = ReleaseCatalog::build(&session).unwrap();

        let minor = catalog.find(&Version::new(1, 1, 0)).unwrap();
        let previous = catalog.previous_ancestral(&session, minor).unwrap();
        assert_eq!(previous.unwrap().version, Version::new(1, 0, 0));

        let first = catalog.find(&Version::new(1, 0, 0)).unwrap();
        assert!(catalog.previous_ancestral(&session, first).unwrap().is_none());
    }

    #[test]
    fn test_latest_series_groupings() {
        let backend = MockBackend::new();
        let commits = linear_history(&backend, 6);
        backend.add_tag("1.0.0", commits[0]);
        backend.add_tag("1.0.1", commits[1]);
        backend.add_tag("1.1.0", commits[2]);
        backend.add_tag("2.0.0", commits[3]);
        backend.add_tag("2.0.1", commits[4]);

        let catalog = catalog_for(&backend);

        let majors: Vec<String> = catalog
            .latest_major_series()
            .iter()
            .map(|r| r.version.to_string())
            .collect();
        assert_eq!(majors, vec!["1.1.0", "2.0.1"]);

        let minors: Vec<String> = catalog
            .latest_minor_series()
            .iter()
            .map(|r| r.version.to_string())
            .collect();
        assert_eq!(minors, vec!["1.0.1", "1.1.0", "2.0.1"]);
    }

    #[test]
    fn test_release_kinds() {
        let release = |v: &str| Release {
            version: Version::parse(v).unwrap(),
            tag_name: v.to_string(),
            commit: oid(1),
        };

        assert!(release("1.0.0").is_major());
        assert!(release("1.2.0").is_minor());
        assert!(release("1.2.3").is_patch());
        assert_eq!(release("1.2.3").major_series(), Version::new(1, 0, 0));
        assert_eq!(release("1.2.3").minor_series(), Version::new(1, 2, 0));
    }
}
