use chrono::{Duration, TimeZone, Utc};
use git2::Oid;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use crate::domain::refs::Ref;
use crate::error::{LineageError, Result};
use crate::git::{Backend, CommitData};

/// Deterministic test commit id from a single byte.
pub fn oid(n: u8) -> Oid {
    Oid::from_bytes(&[n; 20]).expect("constant-length byte slice")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Head {
    Unset,
    Detached(Oid),
    Branch(String),
}

/// In-memory backend for testing without actual git repositories.
///
/// Holds a real commit graph (parent links, ancestry) and mutable tag/branch
/// tables so repair actions can be exercised end to end. Commit timestamps
/// are deterministic: each added commit lands one minute after the previous.
pub struct MockBackend {
    commits: RefCell<HashMap<Oid, CommitData>>,
    tags: RefCell<BTreeMap<String, Oid>>,
    branches: RefCell<BTreeMap<String, Oid>>,
    remotes: RefCell<HashMap<String, Vec<Ref>>>,
    head: RefCell<Head>,
    clock: Cell<i64>,
}

impl MockBackend {
    /// Create a new empty mock backend
    pub fn new() -> Self {
        MockBackend {
            commits: RefCell::new(HashMap::new()),
            tags: RefCell::new(BTreeMap::new()),
            branches: RefCell::new(BTreeMap::new()),
            remotes: RefCell::new(HashMap::new()),
            head: RefCell::new(Head::Unset),
            clock: Cell::new(0),
        }
    }

    /// Add a commit with the given parents and message
    pub fn add_commit(&self, id: Oid, parents: Vec<Oid>, message: impl Into<String>) -> Oid {
        let tick = self.clock.get();
        self.clock.set(tick + 1);

        let committed_at = Utc
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .single()
            .expect("valid base timestamp")
            + Duration::minutes(tick);

        self.commits.borrow_mut().insert(
            id,
            CommitData {
                id,
                parents,
                author: "Test Author".to_string(),
                authored_at: committed_at,
                committer: "Test Committer".to_string(),
                committed_at,
                message: message.into(),
            },
        );

        id
    }

    /// Add a tag pointing to a commit
    pub fn add_tag(&self, name: impl Into<String>, target: Oid) {
        self.tags.borrow_mut().insert(name.into(), target);
    }

    /// Add or move a branch pointing to a commit
    pub fn add_branch(&self, name: impl Into<String>, target: Oid) {
        self.branches.borrow_mut().insert(name.into(), target);
    }

    /// Put HEAD on a branch
    pub fn set_head_branch(&self, name: impl Into<String>) {
        *self.head.borrow_mut() = Head::Branch(name.into());
    }

    /// Replace the advertised refs of a remote
    pub fn set_remote_refs(&self, remote: impl Into<String>, refs: Vec<Ref>) {
        self.remotes.borrow_mut().insert(remote.into(), refs);
    }

    /// The current tip of a branch, if it exists
    pub fn branch_tip(&self, name: &str) -> Option<Oid> {
        self.branches.borrow().get(name).copied()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MockBackend {
    fn resolve(&self, rev: &str) -> Result<Oid> {
        if let Some(target) = self.branches.borrow().get(rev) {
            return Ok(*target);
        }
        if let Some(target) = self.tags.borrow().get(rev) {
            return Ok(*target);
        }
        if rev == "HEAD" {
            return self.head();
        }
        if let Ok(id) = Oid::from_str(rev) {
            if self.commits.borrow().contains_key(&id) {
                return Ok(id);
            }
        }
        Err(LineageError::commit(format!("Cannot resolve '{}'", rev)))
    }

    fn head(&self) -> Result<Oid> {
        match &*self.head.borrow() {
            Head::Unset => Err(LineageError::commit("HEAD is not set")),
            Head::Detached(id) => Ok(*id),
            Head::Branch(name) => self
                .branches
                .borrow()
                .get(name)
                .copied()
                .ok_or_else(|| LineageError::branch(format!("Branch not found: {}", name))),
        }
    }

    fn current_branch(&self) -> Result<Option<String>> {
        match &*self.head.borrow() {
            Head::Branch(name) => Ok(Some(name.clone())),
            _ => Ok(None),
        }
    }

    fn find_commit(&self, id: Oid) -> Result<CommitData> {
        self.commits
            .borrow()
            .get(&id)
            .cloned()
            .ok_or_else(|| LineageError::commit(format!("Cannot find commit {}", id)))
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        // Proper ancestry: walk parent links up from the descendant
        let commits = self.commits.borrow();
        let mut queue = vec![descendant];
        let mut seen = Vec::new();

        while let Some(id) = queue.pop() {
            let data = commits
                .get(&id)
                .ok_or_else(|| LineageError::commit(format!("Cannot find commit {}", id)))?;
            for parent in &data.parents {
                if *parent == ancestor {
                    return Ok(true);
                }
                if !seen.contains(parent) {
                    seen.push(*parent);
                    queue.push(*parent);
                }
            }
        }

        Ok(false)
    }

    fn list_refs(&self) -> Result<Vec<Ref>> {
        let mut refs: Vec<Ref> = Vec::new();
        refs.extend(
            self.tags
                .borrow()
                .iter()
                .map(|(name, target)| Ref::tag(name.clone(), *target)),
        );
        refs.extend(
            self.branches
                .borrow()
                .iter()
                .map(|(name, target)| Ref::branch(name.clone(), *target)),
        );
        Ok(refs)
    }

    fn remote_refs(&self, remote: &str) -> Result<Vec<Ref>> {
        self.remotes
            .borrow()
            .get(remote)
            .cloned()
            .ok_or_else(|| LineageError::remote(format!("Cannot find remote: {}", remote)))
    }

    fn create_tag(&self, name: &str, target: Oid) -> Result<()> {
        let mut tags = self.tags.borrow_mut();
        if tags.contains_key(name) {
            return Err(LineageError::tag(format!("Tag '{}' already exists", name)));
        }
        tags.insert(name.to_string(), target);
        Ok(())
    }

    fn set_branch(&self, name: &str, target: Oid) -> Result<()> {
        self.branches.borrow_mut().insert(name.to_string(), target);
        Ok(())
    }

    fn checkout_detached(&self, target: Oid) -> Result<()> {
        *self.head.borrow_mut() = Head::Detached(target);
        Ok(())
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        if !self.branches.borrow().contains_key(name) {
            return Err(LineageError::branch(format!("Branch not found: {}", name)));
        }
        *self.head.borrow_mut() = Head::Branch(name.to_string());
        Ok(())
    }
}
