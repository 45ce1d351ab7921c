//! Convention-branch resolvers: which branches should exist, and where.

pub mod latest;
pub mod master;

pub use latest::{latest_branch_specs, LatestBranchSpec};
pub use master::{master_branch_specs, MasterBranchSpec};
