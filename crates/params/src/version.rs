use bitcoin::{Amount, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use stakeline_primitives::{parse_xonly_pk, serde_helpers::serde_amount_sat};

use crate::errors::ParamsError;

/// Length of the protocol tag embedded in the staking OP_RETURN output.
pub const TAG_LEN: usize = 4;

/// One version of the staking protocol constants.
///
/// A version takes effect at `activation_height` and stays in force until the next version
/// activates. The script constants in here are exactly what the staking outputs opened under
/// this version commit to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParamsVersion {
    pub version: u32,

    /// First height (inclusive) at which this version is in force.
    pub activation_height: u64,

    #[serde(with = "serde_amount_sat")]
    pub staking_cap_sat: Amount,

    /// Hex-encoded protocol tag.
    pub tag: String,

    /// Covenant committee keys, hex, compressed or x-only.
    pub covenant_pks: Vec<String>,

    /// Covenant signatures required on the unbonding and slashing paths.
    pub covenant_quorum: u32,

    /// Unbonding timelock in blocks.
    pub unbonding_time: u16,

    #[serde(with = "serde_amount_sat")]
    pub unbonding_fee_sat: Amount,

    #[serde(with = "serde_amount_sat")]
    pub max_staking_amount_sat: Amount,

    #[serde(with = "serde_amount_sat")]
    pub min_staking_amount_sat: Amount,

    pub max_staking_time_blocks: u16,

    pub min_staking_time_blocks: u16,

    pub confirmation_depth: u64,
}

impl ProtocolParamsVersion {
    /// Parses the covenant committee keys in the order they were published.
    pub fn covenant_keys(&self) -> Result<Vec<XOnlyPublicKey>, ParamsError> {
        self.covenant_pks
            .iter()
            .map(|pk| {
                parse_xonly_pk(pk).map_err(|e| self.invalid(format!("covenant key {pk}: {e}")))
            })
            .collect()
    }

    pub fn tag_bytes(&self) -> Result<[u8; TAG_LEN], ParamsError> {
        let bytes = hex::decode(&self.tag).map_err(|e| self.invalid(format!("tag: {e}")))?;
        bytes.try_into().map_err(|b: Vec<u8>| {
            self.invalid(format!("tag must be {TAG_LEN} bytes, got {}", b.len()))
        })
    }

    /// Checks internal consistency of the version.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let keys = self.covenant_keys()?;
        if self.covenant_quorum == 0 || self.covenant_quorum as usize > keys.len() {
            return Err(self.invalid(format!(
                "covenant quorum {} out of range for {} keys",
                self.covenant_quorum,
                keys.len()
            )));
        }
        self.tag_bytes()?;
        if self.min_staking_amount_sat > self.max_staking_amount_sat {
            return Err(self.invalid("min staking amount exceeds max".to_owned()));
        }
        if self.min_staking_time_blocks > self.max_staking_time_blocks {
            return Err(self.invalid("min staking time exceeds max".to_owned()));
        }
        if self.unbonding_time == 0 {
            return Err(self.invalid("unbonding time must be non-zero".to_owned()));
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> ParamsError {
        ParamsError::Invalid {
            version: self.version,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COVENANT_PK: &str =
        "0250929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0";

    fn sample() -> ProtocolParamsVersion {
        ProtocolParamsVersion {
            version: 0,
            activation_height: 100,
            staking_cap_sat: Amount::from_sat(1_000_000_000),
            tag: "62627434".to_owned(),
            covenant_pks: vec![COVENANT_PK.to_owned()],
            covenant_quorum: 1,
            unbonding_time: 101,
            unbonding_fee_sat: Amount::from_sat(1_000),
            max_staking_amount_sat: Amount::from_sat(5_000_000),
            min_staking_amount_sat: Amount::from_sat(50_000),
            max_staking_time_blocks: 64_000,
            min_staking_time_blocks: 64_000,
            confirmation_depth: 10,
        }
    }

    #[test]
    fn test_valid_version() {
        let params = sample();
        params.validate().unwrap();
        assert_eq!(params.tag_bytes().unwrap(), *b"bbt4");
        assert_eq!(params.covenant_keys().unwrap().len(), 1);
    }

    #[test]
    fn test_quorum_out_of_range() {
        let mut params = sample();
        params.covenant_quorum = 2;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::Invalid { version: 0, .. })
        ));

        params.covenant_quorum = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_bad_tag_length() {
        let mut params = sample();
        params.tag = "6262".to_owned();
        assert!(params.tag_bytes().is_err());
    }

    #[test]
    fn test_bad_covenant_key() {
        let mut params = sample();
        params.covenant_pks.push("00".repeat(33));
        assert!(params.covenant_keys().is_err());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = serde_json::json!({
            "version": 3,
            "activationHeight": 200,
            "stakingCapSat": 10,
            "tag": "01020304",
            "covenantPks": [COVENANT_PK],
            "covenantQuorum": 1,
            "unbondingTime": 5,
            "unbondingFeeSat": 7,
            "maxStakingAmountSat": 9,
            "minStakingAmountSat": 1,
            "maxStakingTimeBlocks": 10,
            "minStakingTimeBlocks": 1,
            "confirmationDepth": 6
        });
        let params: ProtocolParamsVersion = serde_json::from_value(json).unwrap();
        assert_eq!(params.version, 3);
        assert_eq!(params.unbonding_fee_sat, Amount::from_sat(7));
    }
}
