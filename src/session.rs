//! Per-invocation state shared by every component.
//!
//! A [Session] owns every cache in the system: commits by id, calculated
//! states by commit, and the ref snapshot. Components borrow the session;
//! nothing holds ambient or static state. After a repair mutates the
//! repository the session is discarded and a fresh one is constructed;
//! caches are never invalidated in place.
//!
//! The session is single-threaded by contract: one invocation, one actor,
//! exclusive sequential access for the process lifetime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use git2::Oid;
use semver::Version;

use crate::analyzer::CommitState;
use crate::config::Config;
use crate::domain::commit::{Commit, TrailerMatcher};
use crate::domain::refs::{Ref, RefName};
use crate::error::Result;
use crate::git::Backend;

pub struct Session<'a, B: Backend> {
    backend: &'a B,
    matcher: TrailerMatcher,
    prerelease_identifier: String,
    commits: RefCell<HashMap<Oid, Rc<Commit>>>,
    states: RefCell<HashMap<Oid, Rc<CommitState>>>,
    refs: RefCell<Option<Rc<Vec<Ref>>>>,
    releases_by_commit: RefCell<Option<Rc<HashMap<Oid, Vec<Version>>>>>,
}

impl<'a, B: Backend> Session<'a, B> {
    pub fn new(backend: &'a B, config: &Config) -> Result<Self> {
        Ok(Session {
            backend,
            matcher: TrailerMatcher::new(&config.trailers)?,
            prerelease_identifier: config.prerelease_identifier.clone(),
            commits: RefCell::new(HashMap::new()),
            states: RefCell::new(HashMap::new()),
            refs: RefCell::new(None),
            releases_by_commit: RefCell::new(None),
        })
    }

    /// The backend this session reads from.
    ///
    /// The reference outlives the session value itself, so repair closures
    /// can capture it without tying themselves to the session.
    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// Identifier used for calculated prerelease labels (`alpha` by default).
    pub fn prerelease_identifier(&self) -> &str {
        &self.prerelease_identifier
    }

    /// Fetch a commit, memoized by identity.
    ///
    /// The returned `Rc` is shared with the cache; commits are never copied.
    pub fn commit(&self, id: Oid) -> Result<Rc<Commit>> {
        if let Some(commit) = self.commits.borrow().get(&id) {
            return Ok(commit.clone());
        }

        let data = self.backend.find_commit(id)?;
        let commit = Rc::new(Commit::from_data(data, &self.matcher));

        self.commits.borrow_mut().insert(id, commit.clone());
        Ok(commit)
    }

    /// The repository's tags and branches, sorted by name.
    ///
    /// Snapshotted on first use; a repair invalidates it by replacing the
    /// whole session.
    pub fn refs(&self) -> Result<Rc<Vec<Ref>>> {
        if let Some(refs) = self.refs.borrow().as_ref() {
            return Ok(refs.clone());
        }

        let mut refs = self.backend.list_refs()?;
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        let refs = Rc::new(refs);

        *self.refs.borrow_mut() = Some(refs.clone());
        Ok(refs)
    }

    /// Release versions tagged on a commit, in tag-name order.
    ///
    /// More than one entry is invalid input; the checker reports it, and the
    /// engine deterministically takes the first.
    pub fn release_versions_at(&self, id: Oid) -> Result<Vec<Version>> {
        let index = self.release_index()?;
        Ok(index.get(&id).cloned().unwrap_or_default())
    }

    fn release_index(&self) -> Result<Rc<HashMap<Oid, Vec<Version>>>> {
        if let Some(index) = self.releases_by_commit.borrow().as_ref() {
            return Ok(index.clone());
        }

        let mut index: HashMap<Oid, Vec<Version>> = HashMap::new();
        for r in self.refs()?.iter() {
            if let RefName::ReleaseTag(version) = r.classify() {
                index.entry(r.target).or_default().push(version);
            }
        }
        let index = Rc::new(index);

        *self.releases_by_commit.borrow_mut() = Some(index.clone());
        Ok(index)
    }

    /// A previously calculated state for a commit, if any.
    pub fn cached_state(&self, id: Oid) -> Option<Rc<CommitState>> {
        self.states.borrow().get(&id).cloned()
    }

    /// Record a calculated state, keyed by commit identity.
    pub fn store_state(&self, state: Rc<CommitState>) {
        self.states.borrow_mut().insert(state.commit, state);
    }
}
