//! The check/repair driver loop.

use crate::checker::Checker;
use crate::config::Config;
use crate::domain::refs::RefName;
use crate::error::Result;
use crate::git::Backend;
use crate::session::Session;

/// How a repair run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Every check passes; `repairs` lists what was applied on the way.
    Clean { repairs: Vec<String> },
    /// An unrepairable failure was hit after applying `repairs`.
    Fatal {
        description: String,
        repair_description: String,
        repairs: Vec<String>,
    },
}

impl RepairOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, RepairOutcome::Clean { .. })
    }

    pub fn repairs(&self) -> &[String] {
        match self {
            RepairOutcome::Clean { repairs } => repairs,
            RepairOutcome::Fatal { repairs, .. } => repairs,
        }
    }
}

/// Check and repair until the repository is clean or an unrepairable
/// failure is found.
///
/// Every applied repair mutates the repository, so each round runs against
/// a freshly built session; nothing survives from one round to the next.
/// When HEAD is on a convention master branch it is detached onto the
/// branch's commit for the duration, since some repairs move the very
/// branch being stood on, and restored afterwards.
pub fn check_and_repair<B: Backend>(backend: &B, config: &Config) -> Result<RepairOutcome> {
    let restore = match backend.current_branch()? {
        Some(name) if matches!(RefName::of_branch_name(&name), RefName::MasterBranch(_)) => {
            backend.checkout_detached(backend.resolve(&name)?)?;
            Some(name)
        }
        _ => None,
    };

    let outcome = run_rounds(backend, config);

    if let Some(branch) = restore {
        backend.checkout_branch(&branch)?;
    }

    outcome
}

fn run_rounds<B: Backend>(backend: &B, config: &Config) -> Result<RepairOutcome> {
    let mut repairs = Vec::new();

    loop {
        let session = Session::new(backend, config)?;
        let checker = Checker::new(&session);

        match checker.check()? {
            None => return Ok(RepairOutcome::Clean { repairs }),
            Some(failure) if failure.is_repairable() => {
                repairs.push(failure.repair_description.clone());
                failure.repair()?;
            }
            Some(failure) => {
                return Ok(RepairOutcome::Fatal {
                    description: failure.description,
                    repair_description: failure.repair_description,
                    repairs,
                });
            }
        };
    }
}
