//! Data model shared by every stakeline crate.
//!
//! Remote delegation records are authoritative and arrive from the staking indexer as
//! camelCase JSON. Intermediate records are the local, optimistic shadows written right after
//! a transition was submitted and retired once the indexer catches up.

pub mod delegation;
pub mod errors;
pub mod intermediate;
pub mod keys;
pub mod serde_helpers;

pub use delegation::{
    decode_tx_hex, encode_tx_hex, Delegation, DelegationState, StakingTx, UnbondingTx,
};
pub use errors::ParseError;
pub use intermediate::{intermediate_store_key, IntermediateDelegation, IntermediateState};
pub use keys::parse_xonly_pk;
