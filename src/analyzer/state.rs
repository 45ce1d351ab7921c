use git2::Oid;
use semver::Version;

/// The calculated version state of one commit.
///
/// A `CommitState` is a strict function of the commit itself and its
/// parent's state, with no hidden inputs, which is what makes it safe to
/// memoize by commit identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitState {
    /// The commit this state belongs to
    pub commit: Oid,
    /// Release version tagged on this commit, if any
    pub tagged_release: Option<Version>,
    /// This commit carries a feature trailer
    pub is_feature: bool,
    /// This commit carries a breaking trailer
    pub is_breaking: bool,
    /// A feature trailer has appeared since the previous release
    pub has_feature_since_release: bool,
    /// A breaking trailer has appeared since the previous release
    pub has_breaking_since_release: bool,
    /// This commit is the first feature change since the previous release
    pub first_feature_since_release: bool,
    /// This commit is the first breaking change since the previous release
    pub first_breaking_since_release: bool,
    /// Commits counted since the previous release (restarts at 1 after a tag)
    pub commits_since_release: u64,
    /// Running major counter (after any tag override)
    pub major: u64,
    /// Running minor counter (after any tag override)
    pub minor: u64,
    /// Running patch counter (after any tag override)
    pub patch: u64,
    /// Prerelease label; empty on a tagged commit
    pub prerelease: String,
    /// `major.minor.patch-prerelease` from the pre-override counters
    pub calculated_prerelease: Version,
    /// `major.minor.patch` from the pre-override counters
    pub calculated_release: Version,
    /// The final version: the tagged release if present, else the
    /// calculated prerelease version
    pub version: Version,
}
