//! Reconstruction of the staking scripts and their taproot commitments.
//!
//! Nothing here stores scripts. They are rebuilt on demand from the finality provider key, the
//! staking timelock, the staker key and the parameter version that was in force when the
//! staking transaction was included. The layout must stay byte-for-byte stable: any change
//! would yield outputs that no longer match what is already committed on-chain.

mod builder;
mod errors;
mod taproot;

pub use builder::{
    build_staking_scripts, timelock_script, StakingScriptData, StakingScripts,
    DATA_EMBED_VERSION,
};
pub use errors::ScriptError;
pub use taproot::{
    p2tr_script, parse_timelock_script, staking_spend_info, unbonding_spend_info,
    UNSPENDABLE_INTERNAL_KEY,
};
