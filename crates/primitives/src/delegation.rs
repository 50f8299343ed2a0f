use std::fmt;

use bitcoin::{consensus, Amount, Transaction, Txid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors::ParseError, intermediate::IntermediateState, serde_helpers::serde_amount_sat};

/// Lifecycle state of a delegation.
///
/// The first five variants are reported by the indexer. The two `Intermediate*` variants never
/// come from the indexer; they only appear in the merged view for transitions that were
/// submitted locally and are not confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelegationState {
    Active,
    UnbondingRequested,
    Unbonding,
    Unbonded,
    Withdrawn,
    IntermediateUnbonding,
    IntermediateWithdrawal,
}

impl DelegationState {
    /// Whether this is a local marker state rather than one reported by the indexer.
    pub fn is_intermediate(self) -> bool {
        matches!(
            self,
            DelegationState::IntermediateUnbonding | DelegationState::IntermediateWithdrawal
        )
    }
}

impl From<IntermediateState> for DelegationState {
    fn from(value: IntermediateState) -> Self {
        match value {
            IntermediateState::Unbonding => DelegationState::IntermediateUnbonding,
            IntermediateState::Withdrawal => DelegationState::IntermediateWithdrawal,
        }
    }
}

impl fmt::Display for DelegationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DelegationState::Active => "ACTIVE",
            DelegationState::UnbondingRequested => "UNBONDING_REQUESTED",
            DelegationState::Unbonding => "UNBONDING",
            DelegationState::Unbonded => "UNBONDED",
            DelegationState::Withdrawn => "WITHDRAWN",
            DelegationState::IntermediateUnbonding => "INTERMEDIATE_UNBONDING",
            DelegationState::IntermediateWithdrawal => "INTERMEDIATE_WITHDRAWAL",
        };
        f.write_str(s)
    }
}

/// The staking transaction a delegation was opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingTx {
    /// Consensus-encoded transaction, hex.
    pub tx_hex: String,

    /// Index of the staking output inside the transaction.
    pub output_index: u32,

    pub start_timestamp: DateTime<Utc>,

    /// Bitcoin height the staking transaction was included at. Selects the parameter version
    /// the staking scripts were built with.
    pub start_height: u64,

    /// Staking timelock in blocks.
    pub timelock: u16,
}

impl StakingTx {
    pub fn decode(&self) -> Result<Transaction, ParseError> {
        decode_tx_hex(&self.tx_hex)
    }
}

/// The unbonding transaction of a delegation that was unbonded early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnbondingTx {
    pub tx_hex: String,

    #[serde(default)]
    pub output_index: u32,
}

impl UnbondingTx {
    pub fn decode(&self) -> Result<Transaction, ParseError> {
        decode_tx_hex(&self.tx_hex)
    }
}

/// A staking position as reported by the indexer, or derived from a local intermediate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    /// Join key between the remote and the local view.
    pub staking_tx_hash_hex: Txid,

    pub staker_pk_hex: String,

    pub finality_provider_pk_hex: String,

    pub state: DelegationState,

    #[serde(with = "serde_amount_sat")]
    pub staking_value_sat: Amount,

    pub staking_tx: StakingTx,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unbonding_tx: Option<UnbondingTx>,

    /// Set when the delegation exceeded the staking cap at the time it was submitted.
    #[serde(default)]
    pub is_overflow: bool,
}

impl Delegation {
    pub fn staking_tx_hash(&self) -> Txid {
        self.staking_tx_hash_hex
    }

    /// Height at which the staking timelock expires.
    pub fn timelock_expiry_height(&self) -> u64 {
        self.staking_tx
            .start_height
            .saturating_add(u64::from(self.staking_tx.timelock))
    }
}

/// Decodes a consensus-encoded transaction from hex.
pub fn decode_tx_hex(tx_hex: &str) -> Result<Transaction, ParseError> {
    let bytes = hex::decode(tx_hex)?;
    consensus::deserialize(&bytes).map_err(|e| ParseError::InvalidTransaction(e.to_string()))
}

/// Encodes a transaction to consensus hex.
pub fn encode_tx_hex(tx: &Transaction) -> String {
    hex::encode(consensus::serialize(tx))
}
