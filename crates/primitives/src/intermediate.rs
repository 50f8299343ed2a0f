use bitcoin::{Amount, Txid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    delegation::{Delegation, DelegationState, StakingTx},
    serde_helpers::serde_amount_sat,
};

/// Prefix of the storage key intermediate records are kept under, one key per staker.
pub const INTERMEDIATE_STORE_KEY_PREFIX: &str = "bbn-staking-intermediate-delegations";

/// Storage key holding the intermediate records of `staker_pk_hex`.
pub fn intermediate_store_key(staker_pk_hex: &str) -> String {
    format!("{INTERMEDIATE_STORE_KEY_PREFIX}-{staker_pk_hex}")
}

/// Marker for a transition that was submitted locally but not confirmed by the indexer yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntermediateState {
    #[serde(rename = "INTERMEDIATE_UNBONDING")]
    Unbonding,
    #[serde(rename = "INTERMEDIATE_WITHDRAWAL")]
    Withdrawal,
}

/// Local shadow of a delegation with an in-flight transition.
///
/// Records are plain values; they are never updated in place, only replaced as a whole
/// collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntermediateDelegation {
    pub staking_tx_hash_hex: Txid,
    pub staker_pk_hex: String,
    pub finality_provider_pk_hex: String,
    pub state: IntermediateState,
    #[serde(with = "serde_amount_sat")]
    pub staking_value_sat: Amount,
    pub staking_tx: StakingTx,
}

impl IntermediateDelegation {
    /// Creates the record written right after a transition on `delegation` was submitted.
    ///
    /// Only the fields needed to render the pending entry are kept. The inclusion height is
    /// unknown locally and left at zero.
    pub fn pending(
        delegation: &Delegation,
        staker_pk_hex: &str,
        state: IntermediateState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            staking_tx_hash_hex: delegation.staking_tx_hash_hex,
            staker_pk_hex: staker_pk_hex.to_owned(),
            finality_provider_pk_hex: delegation.finality_provider_pk_hex.clone(),
            state,
            staking_value_sat: delegation.staking_value_sat,
            staking_tx: StakingTx {
                tx_hex: delegation.staking_tx.tx_hex.clone(),
                output_index: 0,
                start_timestamp: now,
                start_height: 0,
                timelock: delegation.staking_tx.timelock,
            },
        }
    }

    pub fn staking_tx_hash(&self) -> Txid {
        self.staking_tx_hash_hex
    }

    /// Renders the record as a delegation carrying the matching intermediate state.
    pub fn to_delegation(&self) -> Delegation {
        Delegation {
            staking_tx_hash_hex: self.staking_tx_hash_hex,
            staker_pk_hex: self.staker_pk_hex.clone(),
            finality_provider_pk_hex: self.finality_provider_pk_hex.clone(),
            state: DelegationState::from(self.state),
            staking_value_sat: self.staking_value_sat,
            staking_tx: self.staking_tx.clone(),
            unbonding_tx: None,
            is_overflow: false,
        }
    }
}
