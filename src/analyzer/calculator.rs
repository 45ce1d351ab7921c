use std::rc::Rc;

use git2::Oid;
use semver::{BuildMetadata, Prerelease, Version};

use crate::analyzer::state::CommitState;
use crate::domain::commit::Commit;
use crate::error::{LineageError, Result};
use crate::git::Backend;
use crate::session::Session;

/// What a commit inherits from its parent's state.
///
/// The seed carry, used below the root of history, starts the minor
/// counter at 1, so an untagged, untrailered history calculates `0.1.0`
/// prereleases.
#[derive(Debug, Clone, Copy)]
struct Carry {
    major: u64,
    minor: u64,
    patch: u64,
    has_feature: bool,
    has_breaking: bool,
    commits_since_release: u64,
    parent_tagged: bool,
}

impl Carry {
    fn seed() -> Self {
        Carry {
            major: 0,
            minor: 1,
            patch: 0,
            has_feature: false,
            has_breaking: false,
            commits_since_release: 0,
            parent_tagged: false,
        }
    }

    fn from_state(state: &CommitState) -> Self {
        Carry {
            major: state.major,
            minor: state.minor,
            patch: state.patch,
            has_feature: state.has_feature_since_release,
            has_breaking: state.has_breaking_since_release,
            commits_since_release: state.commits_since_release,
            parent_tagged: state.tagged_release.is_some(),
        }
    }
}

/// The calculation engine.
///
/// Folds over a commit's full ancestor chain, oldest first, producing one
/// [CommitState] per commit. States are memoized in the session keyed by
/// commit identity, so calculating a descendant reuses the shared prefix.
///
/// The fold only supports linear history: asking for a state across a merge
/// commit is an error. The checker's merge-commit check exists to rule that
/// out before any engine output is trusted.
pub struct StateCalculator<'a, B: Backend> {
    session: &'a Session<'a, B>,
}

impl<'a, B: Backend> StateCalculator<'a, B> {
    pub fn new(session: &'a Session<'a, B>) -> Self {
        StateCalculator { session }
    }

    /// Calculate the state of a commit, reusing any memoized ancestor prefix.
    pub fn calculate(&self, id: Oid) -> Result<Rc<CommitState>> {
        if let Some(state) = self.session.cached_state(id) {
            return Ok(state);
        }

        let mut chain: Vec<Rc<Commit>> = Vec::new();
        let mut carry = Carry::seed();
        let mut cursor = Some(id);

        while let Some(current) = cursor {
            match self.session.cached_state(current) {
                Some(state) => {
                    carry = Carry::from_state(&state);
                    break;
                }
                None => {
                    let commit = self.session.commit(current)?;
                    cursor = commit.linear_parent()?;
                    chain.push(commit);
                }
            }
        }

        self.fold(chain, carry)
    }

    /// Calculate the state of a commit by replaying the full chain from the
    /// root of history, refreshing the memoized states along the way.
    pub fn calculate_to(&self, id: Oid) -> Result<Rc<CommitState>> {
        let mut chain: Vec<Rc<Commit>> = Vec::new();
        let mut cursor = Some(id);

        while let Some(current) = cursor {
            let commit = self.session.commit(current)?;
            cursor = commit.linear_parent()?;
            chain.push(commit);
        }

        self.fold(chain, Carry::seed())
    }

    /// Fold a newest-first chain into states, oldest first.
    fn fold(&self, chain: Vec<Rc<Commit>>, mut carry: Carry) -> Result<Rc<CommitState>> {
        let mut last: Option<Rc<CommitState>> = None;

        for commit in chain.into_iter().rev() {
            let releases = self.session.release_versions_at(commit.id)?;
            let state = Rc::new(self.step(&carry, &commit, releases.first())?);

            carry = Carry::from_state(&state);
            self.session.store_state(state.clone());
            last = Some(state);
        }

        last.ok_or_else(|| LineageError::history("Cannot calculate state of an empty chain"))
    }

    /// Derive one commit's state from its parent's carry.
    fn step(&self, carry: &Carry, commit: &Commit, tag: Option<&Version>) -> Result<CommitState> {
        let mut major = carry.major;
        let mut minor = carry.minor;
        let mut patch = carry.patch;

        // The "since previous release" window closes when the parent is a
        // release: both the commit counter and the cumulative flags restart
        let (inherited_feature, inherited_breaking) = if carry.parent_tagged {
            (false, false)
        } else {
            (carry.has_feature, carry.has_breaking)
        };

        let first_feature = commit.is_feature && !inherited_feature;
        let first_breaking = commit.is_breaking && !inherited_breaking;
        let has_feature = inherited_feature || commit.is_feature;
        let has_breaking = inherited_breaking || commit.is_breaking;

        let mut commits_since_release = carry.commits_since_release + 1;

        // Every commit following a release starts a new patch candidate
        if carry.parent_tagged {
            patch += 1;
            commits_since_release = 1;
        }

        // Bump policy: breaking takes priority, and a feature bump only
        // applies while no breaking change has occurred in the window
        if first_breaking {
            major += 1;
            minor = 0;
            patch = 0;
        } else if first_feature && !has_breaking {
            minor += 1;
            patch = 0;
        }

        let prerelease_label = format!(
            "{}.{}.{}.{}",
            self.session.prerelease_identifier(),
            commits_since_release,
            commit.committed_at.format("%Y%m%dT%H%M%S"),
            commit.short_hash()
        );

        let pre = Prerelease::new(&prerelease_label).map_err(|e| {
            LineageError::version(format!(
                "Invalid prerelease label '{}': {}",
                prerelease_label, e
            ))
        })?;

        let calculated_prerelease = Version {
            major,
            minor,
            patch,
            pre,
            build: BuildMetadata::EMPTY,
        };
        let calculated_release = Version::new(major, minor, patch);

        // A human-authored release tag corrects the counters: its numbers
        // replace the calculated ones and the prerelease label is dropped
        let (version, prerelease) = match tag {
            Some(tagged) => {
                major = tagged.major;
                minor = tagged.minor;
                patch = tagged.patch;
                (tagged.clone(), String::new())
            }
            None => (calculated_prerelease.clone(), prerelease_label),
        };

        Ok(CommitState {
            commit: commit.id,
            tagged_release: tag.cloned(),
            is_feature: commit.is_feature,
            is_breaking: commit.is_breaking,
            has_feature_since_release: has_feature,
            has_breaking_since_release: has_breaking,
            first_feature_since_release: first_feature,
            first_breaking_since_release: first_breaking,
            commits_since_release,
            major,
            minor,
            patch,
            prerelease,
            calculated_prerelease,
            calculated_release,
            version,
        })
    }
}
