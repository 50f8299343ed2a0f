//! Unsigned transaction construction for delegation transitions.
//!
//! Every path spends exactly one taproot output through a single script leaf and pays one
//! output. Before building, the source output is checked against the tree rebuilt from the
//! scripts; a mismatch means the scripts came from the wrong parameter version and the spend
//! would be unsignable.

mod errors;
mod spend;
mod unbond;
mod withdraw;

pub use errors::{Mismatch, MismatchReason, TxBuildError};
pub use unbond::build_unbonding_psbt;
pub use withdraw::{
    build_withdrawal_psbt, EarlyUnbondedScripts, TimelockExpiredScripts, WithdrawPath,
    WithdrawSource,
};
