//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the version-control
//! backend, allowing for multiple implementations including real Git
//! repositories and an in-memory implementation for testing.
//!
//! The primary abstraction is the [Backend] trait, which defines the raw
//! history and ref operations the lineage logic needs. The concrete
//! implementations are:
//!
//! - [repository::Git2Backend]: a real implementation using the `git2` crate
//! - [mock::MockBackend]: an in-memory commit graph for testing
//!
//! Most code should depend on the [Backend] trait rather than concrete
//! implementations. Everything above this layer treats the backend as
//! read-only except for the repair actions, which create or move refs and
//! check out commits.

pub mod mock;
pub mod repository;

pub use mock::MockBackend;
pub use repository::Git2Backend;

use chrono::{DateTime, Utc};
use git2::Oid;

use crate::domain::refs::Ref;
use crate::error::Result;

/// Raw commit facts as the backend reports them.
///
/// This is backend output, not a domain object; the session turns it into a
/// [crate::domain::Commit] with derived trailer flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitData {
    /// The commit identity
    pub id: Oid,
    /// Parent identities, in commit order
    pub parents: Vec<Oid>,
    /// Author name
    pub author: String,
    /// Author timestamp, in UTC
    pub authored_at: DateTime<Utc>,
    /// Committer name
    pub committer: String,
    /// Committer timestamp, in UTC
    pub committed_at: DateTime<Utc>,
    /// Full message text
    pub message: String,
}

/// Common backend trait for history and ref access.
///
/// All caches live above this layer; implementations may hit the object
/// database on every call. The model is single-threaded and synchronous:
/// one invocation, one actor, exclusive sequential access.
pub trait Backend {
    /// Resolve a revision string (branch, tag, or hash) to a commit id.
    fn resolve(&self, rev: &str) -> Result<Oid>;

    /// The commit id HEAD points at.
    fn head(&self) -> Result<Oid>;

    /// The branch HEAD is on, or `None` when detached.
    fn current_branch(&self) -> Result<Option<String>>;

    /// Look up a commit by id.
    fn find_commit(&self, id: Oid) -> Result<CommitData>;

    /// Whether `ancestor` is a proper ancestor of `descendant`.
    ///
    /// A commit is not its own ancestor; callers that accept equality test
    /// it separately.
    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool>;

    /// All local tags and branches with their target commits.
    fn list_refs(&self) -> Result<Vec<Ref>>;

    /// All tags and branches the named remote advertises.
    fn remote_refs(&self, remote: &str) -> Result<Vec<Ref>>;

    /// Create a lightweight tag at the given commit.
    ///
    /// Fails if the tag already exists; release tags are never moved.
    fn create_tag(&self, name: &str, target: Oid) -> Result<()>;

    /// Create a branch at the given commit, or move it there if it exists.
    fn set_branch(&self, name: &str, target: Oid) -> Result<()>;

    /// Detach HEAD at the given commit.
    ///
    /// Used by the repair driver before moving a branch that is currently
    /// checked out; the working tree is left in place.
    fn checkout_detached(&self, target: Oid) -> Result<()>;

    /// Point HEAD back at a branch.
    fn checkout_branch(&self, name: &str) -> Result<()>;
}
