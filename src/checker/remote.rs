//! Remote consistency checks.
//!
//! Optional checks comparing local refs against what a remote advertises,
//! with the same first-failure contract as the local battery. Remote drift
//! is never repaired automatically (pushing is an operator decision), so
//! every failure here is fatal with a repair description naming the push
//! or fetch that would resolve it.

use std::collections::BTreeMap;

use git2::Oid;

use crate::checker::CheckFailure;
use crate::domain::refs::RefName;
use crate::error::Result;
use crate::git::Backend;
use crate::session::Session;

/// Checks local release tags and convention branches against one remote.
pub struct RemoteChecker<'a, B: Backend> {
    session: &'a Session<'a, B>,
    remote: String,
}

impl<'a, B: Backend> RemoteChecker<'a, B> {
    pub fn new(session: &'a Session<'a, B>, remote: impl Into<String>) -> Self {
        RemoteChecker {
            session,
            remote: remote.into(),
        }
    }

    /// Run the remote checks in order and return the first failure, if any.
    pub fn check(&self) -> Result<Option<CheckFailure<'a>>> {
        let advertised = self.session.backend().remote_refs(&self.remote)?;

        let mut remote_tags: BTreeMap<&str, Oid> = BTreeMap::new();
        let mut remote_branches: BTreeMap<&str, Oid> = BTreeMap::new();
        for r in &advertised {
            if r.is_tag {
                remote_tags.insert(r.name.as_str(), r.target);
            } else {
                remote_branches.insert(r.name.as_str(), r.target);
            }
        }

        if let Some(failure) = self.check_release_tags(&remote_tags)? {
            return Ok(Some(failure));
        }
        if let Some(failure) = self.check_branches_exist(&remote_branches)? {
            return Ok(Some(failure));
        }
        self.check_branches_not_ahead(&remote_branches)
    }

    /// Release tags must exist on the remote and match exactly.
    fn check_release_tags(
        &self,
        remote_tags: &BTreeMap<&str, Oid>,
    ) -> Result<Option<CheckFailure<'a>>> {
        for r in self.session.refs()?.iter() {
            if !matches!(r.classify(), RefName::ReleaseTag(_)) {
                continue;
            }
            match remote_tags.get(r.name.as_str()) {
                None => {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Release tag '{}' does not exist on remote '{}'",
                            r.name, self.remote
                        ),
                        format!("Push the tag: git push {} {}", self.remote, r.name),
                    )));
                }
                Some(target) if *target != r.target => {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Release tag '{}' on remote '{}' does not match the local tag",
                            r.name, self.remote
                        ),
                        "Reconcile the tags manually; a published release must not move",
                    )));
                }
                _ => {}
            }
        }

        Ok(None)
    }

    /// Convention branches must exist on the remote, at commits known locally.
    fn check_branches_exist(
        &self,
        remote_branches: &BTreeMap<&str, Oid>,
    ) -> Result<Option<CheckFailure<'a>>> {
        for r in self.convention_branches()? {
            match remote_branches.get(r.0.as_str()) {
                None => {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Branch '{}' does not exist on remote '{}'",
                            r.0, self.remote
                        ),
                        format!("Push the branch: git push {} {}", self.remote, r.0),
                    )));
                }
                Some(target) if self.session.commit(*target).is_err() => {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Branch '{}' on remote '{}' is at an unknown commit",
                            r.0, self.remote
                        ),
                        format!("Fetch from '{}' before checking", self.remote),
                    )));
                }
                _ => {}
            }
        }

        Ok(None)
    }

    /// Remote convention branches must not be ahead of their local tips.
    fn check_branches_not_ahead(
        &self,
        remote_branches: &BTreeMap<&str, Oid>,
    ) -> Result<Option<CheckFailure<'a>>> {
        let backend = self.session.backend();

        for (name, local_tip) in self.convention_branches()? {
            if let Some(remote_tip) = remote_branches.get(name.as_str()) {
                if *remote_tip != local_tip && backend.is_ancestor(local_tip, *remote_tip)? {
                    return Ok(Some(CheckFailure::fatal(
                        format!(
                            "Branch '{}' on remote '{}' is ahead of the local branch",
                            name, self.remote
                        ),
                        format!("Fetch from '{}' and fast-forward '{}'", self.remote, name),
                    )));
                }
            }
        }

        Ok(None)
    }

    fn convention_branches(&self) -> Result<Vec<(String, Oid)>> {
        Ok(self
            .session
            .refs()?
            .iter()
            .filter(|r| {
                matches!(
                    r.classify(),
                    RefName::LatestBranch(_) | RefName::MasterBranch(_)
                )
            })
            .map(|r| (r.name.clone(), r.target))
            .collect())
    }
}
