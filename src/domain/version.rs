use semver::Version;

/// Classification of a release by which version component it advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Major,
    Minor,
    Patch,
}

impl ReleaseKind {
    /// Classify a clean release version.
    ///
    /// `X.0.0` is a major release, `X.Y.0` with `Y > 0` a minor release,
    /// and anything with a nonzero patch component a patch release.
    pub fn of(version: &Version) -> Self {
        if version.patch > 0 {
            ReleaseKind::Patch
        } else if version.minor > 0 {
            ReleaseKind::Minor
        } else {
            ReleaseKind::Major
        }
    }
}

/// Parse a tag name as a release version.
///
/// A release version is a semantic version with empty prerelease and empty
/// build metadata. Tag names may carry a `v`/`V` prefix. Anything else
/// (unparsable text, prerelease versions, build metadata) is not a release
/// and yields `None`; such tags are invisible to the lineage logic.
pub fn parse_release_version(name: &str) -> Option<Version> {
    let clean = name
        .strip_prefix('v')
        .or_else(|| name.strip_prefix('V'))
        .unwrap_or(name);
    parse_bare(clean)
}

fn parse_bare(text: &str) -> Option<Version> {
    match Version::parse(text) {
        Ok(v) if v.pre.is_empty() && v.build.is_empty() => Some(v),
        _ => None,
    }
}

/// Truncate a version to its major series identity (`X.0.0`).
pub fn major_series(version: &Version) -> Version {
    Version::new(version.major, 0, 0)
}

/// Truncate a version to its minor series identity (`X.Y.0`).
///
/// Prerelease and build text are stripped, so a calculated prerelease
/// version maps to the same series as the release it is leading up to.
pub fn minor_series(version: &Version) -> Version {
    Version::new(version.major, version.minor, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release_version() {
        assert_eq!(parse_release_version("v1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_release_version("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_release_version("V2.0.0"), Some(Version::new(2, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_prerelease_and_build() {
        assert_eq!(parse_release_version("1.2.3-alpha.1"), None);
        assert_eq!(parse_release_version("v1.2.3+build5"), None);
        assert_eq!(parse_release_version("1.2.3-rc.1+exp"), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_release_version("1.2"), None);
        assert_eq!(parse_release_version("release-1"), None);
        assert_eq!(parse_release_version("version-one"), None);
        assert_eq!(parse_release_version(""), None);
    }

    #[test]
    fn test_release_kind() {
        assert_eq!(ReleaseKind::of(&Version::new(1, 0, 0)), ReleaseKind::Major);
        assert_eq!(ReleaseKind::of(&Version::new(1, 2, 0)), ReleaseKind::Minor);
        assert_eq!(ReleaseKind::of(&Version::new(1, 2, 3)), ReleaseKind::Patch);
        assert_eq!(ReleaseKind::of(&Version::new(1, 0, 1)), ReleaseKind::Patch);
        // 0.0.0 classifies as major; the checker rejects it as a release
        assert_eq!(ReleaseKind::of(&Version::new(0, 0, 0)), ReleaseKind::Major);
    }

    #[test]
    fn test_series_truncation() {
        let v = Version::parse("2.3.4").unwrap();
        assert_eq!(major_series(&v), Version::new(2, 0, 0));
        assert_eq!(minor_series(&v), Version::new(2, 3, 0));

        let pre = Version::parse("2.3.4-alpha.1.20200101T000000.abcd").unwrap();
        assert_eq!(minor_series(&pre), Version::new(2, 3, 0));
    }
}
