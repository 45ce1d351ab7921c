use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use git2::Oid;
use semver::Version;

use crate::analyzer::{CommitState, StateCalculator};
use crate::catalog::ReleaseCatalog;
use crate::domain::refs::{MasterScope, RefName};
use crate::domain::version::minor_series;
use crate::error::Result;
use crate::git::Backend;
use crate::session::Session;

/// A master branch that should exist, and the series point it should track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterBranchSpec {
    pub name: String,
    /// The minor series this branch maintains (`X.Y.0`)
    pub series: Version,
    /// The latest known commit of the series
    pub commit: Oid,
    /// The calculated version at that commit
    pub version: Version,
}

/// The full set of master branches the repository calls for.
///
/// Candidate leaves are every release commit plus every existing
/// master-named branch tip. The union of their ancestors' calculated states
/// is grouped by minor series; the maximum version of each group marks the
/// series' latest known point. The series holding the overall maximum maps
/// to `master`, every other series to `{major}.{minor}-master`: one branch
/// per concurrently maintained release line.
pub fn master_branch_specs<B: Backend>(
    session: &Session<'_, B>,
    catalog: &ReleaseCatalog,
) -> Result<Vec<MasterBranchSpec>> {
    let mut leaves: BTreeSet<Oid> = catalog.ascending().iter().map(|r| r.commit).collect();
    for r in session.refs()?.iter() {
        if matches!(r.classify(), RefName::MasterBranch(_)) {
            leaves.insert(r.target);
        }
    }

    let calculator = StateCalculator::new(session);
    let mut best: BTreeMap<Version, Rc<CommitState>> = BTreeMap::new();
    let mut visited: BTreeSet<Oid> = BTreeSet::new();

    for leaf in leaves {
        let mut cursor = Some(leaf);
        while let Some(id) = cursor {
            if !visited.insert(id) {
                // Shared ancestor prefix was already grouped
                break;
            }
            let state = calculator.calculate(id)?;
            match best.entry(minor_series(&state.version)) {
                Entry::Occupied(mut entry) => {
                    if state.version > entry.get().version {
                        entry.insert(state);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(state);
                }
            }
            cursor = session.commit(id)?.linear_parent()?;
        }
    }

    // A series is only a live maintenance line while its point has not been
    // superseded by a higher series further down the same line of descent
    let backend = session.backend();
    let mut current: Vec<(&Version, &Rc<CommitState>)> = Vec::new();
    for (series, state) in &best {
        let mut superseded = false;
        for other in best.values() {
            if other.version > state.version && backend.is_ancestor(state.commit, other.commit)? {
                superseded = true;
                break;
            }
        }
        if !superseded {
            current.push((series, state));
        }
    }

    let mainline = current.iter().map(|(_, state)| state.version.clone()).max();

    let specs = current
        .into_iter()
        .map(|(series, state)| {
            let scope = if Some(&state.version) == mainline.as_ref() {
                MasterScope::Mainline
            } else {
                MasterScope::Series(series.major, series.minor)
            };
            MasterBranchSpec {
                name: scope.branch_name(),
                series: series.clone(),
                commit: state.commit,
                version: state.version.clone(),
            }
        })
        .collect();

    Ok(specs)
}
