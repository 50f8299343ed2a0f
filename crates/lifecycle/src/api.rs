//! Remote collaborators reached during a transition.

use async_trait::async_trait;
use bitcoin::Txid;
use serde::{Deserialize, Serialize};
use stakeline_params::ProtocolParamsVersion;
use thiserror::Error;

/// Failure reported by a remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The collaborator could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The collaborator answered but refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

/// Body posted to the unbonding acceptance endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnbondingRequest {
    /// Staker's script-path signature over the unbonding transaction, hex.
    pub staker_signed_signature_hex: String,
    pub staking_tx_hash_hex: Txid,
    pub unbonding_tx_hash_hex: Txid,
    pub unbonding_tx_hex: String,
}

/// The remote staking API.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait StakingApi: Send + Sync {
    /// Whether the delegation may be unbonded right now.
    async fn unbonding_eligibility(&self, staking_tx_hash: Txid) -> Result<bool, ClientError>;

    /// Full history of protocol parameter versions.
    async fn global_params(&self) -> Result<Vec<ProtocolParamsVersion>, ClientError>;

    /// Submits a staker-signed unbonding transaction for covenant co-signing.
    async fn post_unbonding(&self, request: UnbondingRequest) -> Result<(), ClientError>;
}

/// Broadcasts finalized transactions to the Bitcoin network.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    async fn push_tx(&self, tx_hex: String) -> Result<Txid, ClientError>;
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;

    use super::*;

    #[test]
    fn test_unbonding_request_wire_names() {
        let request = UnbondingRequest {
            staker_signed_signature_hex: "ab".to_owned(),
            staking_tx_hash_hex: Txid::all_zeros(),
            unbonding_tx_hash_hex: Txid::all_zeros(),
            unbonding_tx_hex: "cd".to_owned(),
        };

        let json = serde_json::to_value(&request).unwrap();
        let obj = json.as_object().unwrap();
        for field in [
            "stakerSignedSignatureHex",
            "stakingTxHashHex",
            "unbondingTxHashHex",
            "unbondingTxHex",
        ] {
            assert!(obj.contains_key(field), "missing {field}");
        }
    }
}
