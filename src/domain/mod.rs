//! Domain logic - pure lineage rules independent of the git backend

pub mod commit;
pub mod refs;
pub mod version;

pub use commit::{Commit, TrailerMatcher};
pub use refs::{LatestScope, MasterScope, Ref, RefName};
pub use version::ReleaseKind;
