use chrono::{TimeZone, Utc};
use git2::{Oid, Repository as Git2Repo};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::refs::Ref;
use crate::error::{LineageError, Result};
use crate::git::{Backend, CommitData};

/// Wrapper around git2::Repository with our backend interface
pub struct Git2Backend {
    repo: Git2Repo,
}

impl Git2Backend {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Backend { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Backend { repo }
    }
}

impl Backend for Git2Backend {
    fn resolve(&self, rev: &str) -> Result<Oid> {
        let object = self
            .repo
            .revparse_single(rev)
            .map_err(|e| LineageError::commit(format!("Cannot resolve '{}': {}", rev, e)))?;

        let commit = object
            .peel_to_commit()
            .map_err(|e| LineageError::commit(format!("'{}' is not a commit: {}", rev, e)))?;

        Ok(commit.id())
    }

    fn head(&self) -> Result<Oid> {
        let head = self.repo.head()?;

        let commit = head
            .peel_to_commit()
            .map_err(|e| LineageError::commit(format!("HEAD is not a commit: {}", e)))?;

        Ok(commit.id())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            // Unborn or missing HEAD counts as detached here
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    fn find_commit(&self, id: Oid) -> Result<CommitData> {
        let commit = self
            .repo
            .find_commit(id)
            .map_err(|e| LineageError::commit(format!("Cannot find commit {}: {}", id, e)))?;

        let timestamp = |seconds: i64| {
            Utc.timestamp_opt(seconds, 0).single().ok_or_else(|| {
                LineageError::commit(format!("Commit {} has an invalid timestamp", id))
            })
        };
        let authored_at = timestamp(commit.author().when().seconds())?;
        let committed_at = timestamp(commit.time().seconds())?;

        let result = Ok(CommitData {
            id,
            parents: commit.parent_ids().collect(),
            author: commit.author().name().unwrap_or("unknown").to_string(),
            authored_at,
            committer: commit.committer().name().unwrap_or("unknown").to_string(),
            committed_at,
            message: commit.message().unwrap_or("").to_string(),
        });
        result
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        Ok(self.repo.graph_descendant_of(descendant, ancestor)?)
    }

    fn list_refs(&self) -> Result<Vec<Ref>> {
        let mut refs = Vec::new();

        for reference in self.repo.references()? {
            let reference = reference?;
            let full_name = match reference.name() {
                Some(name) => name.to_string(),
                None => continue,
            };

            if let Some(name) = full_name.strip_prefix("refs/tags/") {
                // Annotated tags peel to their commit; tags on non-commit
                // objects have no lineage meaning and are skipped
                match reference.peel_to_commit() {
                    Ok(commit) => refs.push(Ref::tag(name, commit.id())),
                    Err(_) => continue,
                }
            } else if let Some(name) = full_name.strip_prefix("refs/heads/") {
                match reference.peel_to_commit() {
                    Ok(commit) => refs.push(Ref::branch(name, commit.id())),
                    Err(_) => continue,
                }
            }
        }

        Ok(refs)
    }

    fn remote_refs(&self, remote: &str) -> Result<Vec<Ref>> {
        let mut remote = self
            .repo
            .find_remote(remote)
            .map_err(|e| LineageError::remote(format!("Cannot find remote: {}", e)))?;

        let connection = remote
            .connect_auth(git2::Direction::Fetch, None, None)
            .map_err(|e| LineageError::remote(format!("Cannot connect to remote: {}", e)))?;

        let mut tags: BTreeMap<String, Oid> = BTreeMap::new();
        let mut branches: BTreeMap<String, Oid> = BTreeMap::new();

        for head in connection
            .list()
            .map_err(|e| LineageError::remote(format!("Cannot list remote refs: {}", e)))?
        {
            let name = head.name();
            if let Some(rest) = name.strip_prefix("refs/tags/") {
                if let Some(tag) = rest.strip_suffix("^{}") {
                    // Peeled entry carries the commit id for an annotated tag
                    tags.insert(tag.to_string(), head.oid());
                } else {
                    tags.entry(rest.to_string()).or_insert_with(|| head.oid());
                }
            } else if let Some(branch) = name.strip_prefix("refs/heads/") {
                branches.insert(branch.to_string(), head.oid());
            }
        }

        let mut refs: Vec<Ref> = Vec::new();
        refs.extend(tags.into_iter().map(|(name, oid)| Ref::tag(name, oid)));
        refs.extend(
            branches
                .into_iter()
                .map(|(name, oid)| Ref::branch(name, oid)),
        );

        Ok(refs)
    }

    fn create_tag(&self, name: &str, target: Oid) -> Result<()> {
        let object = self
            .repo
            .find_object(target, None)
            .map_err(|e| LineageError::tag(format!("Cannot find object: {}", e)))?;

        self.repo
            .tag_lightweight(name, &object, false)
            .map_err(|e| LineageError::tag(format!("Cannot create tag: {}", e)))?;

        Ok(())
    }

    fn set_branch(&self, name: &str, target: Oid) -> Result<()> {
        let commit = self
            .repo
            .find_commit(target)
            .map_err(|e| LineageError::branch(format!("Cannot find commit {}: {}", target, e)))?;

        self.repo
            .branch(name, &commit, true)
            .map_err(|e| LineageError::branch(format!("Cannot set branch '{}': {}", name, e)))?;

        Ok(())
    }

    fn checkout_detached(&self, target: Oid) -> Result<()> {
        self.repo
            .set_head_detached(target)
            .map_err(|e| LineageError::branch(format!("Cannot detach HEAD at {}: {}", target, e)))?;

        Ok(())
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        self.repo
            .set_head(&format!("refs/heads/{}", name))
            .map_err(|e| {
                LineageError::branch(format!("Cannot check out branch '{}': {}", name, e))
            })?;

        Ok(())
    }
}
