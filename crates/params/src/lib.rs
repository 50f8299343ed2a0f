//! Versioned staking protocol parameters.
//!
//! Staking outputs commit to the covenant committee, quorum and unbonding constants of the
//! parameter version in force when they were opened. Spending them later requires selecting
//! that same version again, which is what [`resolve`] does.

mod errors;
mod resolver;
mod version;

pub use errors::ParamsError;
pub use resolver::{resolve, CurrentVersion, ParamsVersions};
pub use version::{ProtocolParamsVersion, TAG_LEN};
