//! Taproot commitments of the staking and unbonding outputs.

use std::{str::FromStr, sync::LazyLock};

use bitcoin::{
    opcodes::all::{OP_PUSHNUM_1, OP_PUSHNUM_16},
    script::Instruction,
    taproot::{TaprootBuilder, TaprootSpendInfo},
    ScriptBuf, XOnlyPublicKey,
};
use secp256k1::SECP256K1;

use crate::{
    builder::{timelock_script, StakingScripts},
    errors::ScriptError,
};

/// Unspendable internal key (BIP-341 "H" point). Nobody knows its discrete log, so staking and
/// unbonding outputs can only be spent through one of their script leaves.
pub static UNSPENDABLE_INTERNAL_KEY: LazyLock<XOnlyPublicKey> = LazyLock::new(|| {
    XOnlyPublicKey::from_str("50929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0")
        .expect("valid NUMS point")
});

impl StakingScripts {
    /// Spend info of the staking output: `[slashing, [unbonding, timelock]]`.
    pub fn staking_spend_info(&self) -> Result<TaprootSpendInfo, ScriptError> {
        staking_spend_info(
            &self.slashing_script,
            &self.unbonding_script,
            &self.timelock_script,
        )
    }

    /// Spend info of the unbonding output: `[slashing, unbonding_timelock]`.
    pub fn unbonding_spend_info(&self) -> Result<TaprootSpendInfo, ScriptError> {
        unbonding_spend_info(&self.slashing_script, &self.unbonding_timelock_script)
    }

    pub fn staking_output_script(&self) -> Result<ScriptBuf, ScriptError> {
        Ok(p2tr_script(&self.staking_spend_info()?))
    }

    pub fn unbonding_output_script(&self) -> Result<ScriptBuf, ScriptError> {
        Ok(p2tr_script(&self.unbonding_spend_info()?))
    }
}

pub fn staking_spend_info(
    slashing: &ScriptBuf,
    unbonding: &ScriptBuf,
    timelock: &ScriptBuf,
) -> Result<TaprootSpendInfo, ScriptError> {
    let builder = TaprootBuilder::new()
        .add_leaf(1, slashing.clone())
        .and_then(|b| b.add_leaf(2, unbonding.clone()))
        .and_then(|b| b.add_leaf(2, timelock.clone()))
        .map_err(|e| ScriptError::Taproot(e.to_string()))?;
    finalize(builder)
}

pub fn unbonding_spend_info(
    slashing: &ScriptBuf,
    unbonding_timelock: &ScriptBuf,
) -> Result<TaprootSpendInfo, ScriptError> {
    let builder = TaprootBuilder::new()
        .add_leaf(1, slashing.clone())
        .and_then(|b| b.add_leaf(1, unbonding_timelock.clone()))
        .map_err(|e| ScriptError::Taproot(e.to_string()))?;
    finalize(builder)
}

/// P2TR script pubkey committing to `spend_info`.
pub fn p2tr_script(spend_info: &TaprootSpendInfo) -> ScriptBuf {
    ScriptBuf::new_p2tr(
        SECP256K1,
        spend_info.internal_key(),
        spend_info.merkle_root(),
    )
}

fn finalize(builder: TaprootBuilder) -> Result<TaprootSpendInfo, ScriptError> {
    builder
        .finalize(SECP256K1, *UNSPENDABLE_INTERNAL_KEY)
        .map_err(|_| ScriptError::Taproot("incomplete taproot tree".to_owned()))
}

/// Reads the key and relative timelock back out of a timelock script.
///
/// Only the parameters are extracted here; the script is accepted only if rebuilding it from
/// them gives the exact same bytes.
pub fn parse_timelock_script(script: &ScriptBuf) -> Option<(XOnlyPublicKey, u16)> {
    let mut instructions = script.instructions();

    let pk = match instructions.next() {
        Some(Ok(Instruction::PushBytes(bytes))) => {
            XOnlyPublicKey::from_slice(bytes.as_bytes()).ok()?
        }
        _ => return None,
    };
    instructions.next();

    let blocks = match instructions.next() {
        Some(Ok(Instruction::PushBytes(bytes))) => decode_script_num(bytes.as_bytes())?,
        Some(Ok(Instruction::Op(op)))
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&op.to_u8()) =>
        {
            i64::from(op.to_u8() - OP_PUSHNUM_1.to_u8() + 1)
        }
        _ => return None,
    };
    let blocks = u16::try_from(blocks).ok()?;

    (timelock_script(&pk, blocks) == *script).then_some((pk, blocks))
}

/// Decodes a minimally encoded script number of up to four bytes.
fn decode_script_num(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > 4 {
        return None;
    }
    let mut value = bytes
        .iter()
        .enumerate()
        .fold(0i64, |acc, (i, b)| acc | (i64::from(*b) << (8 * i)));

    let sign_bit = 0x80i64 << (8 * (bytes.len() - 1));
    if value & sign_bit != 0 {
        value = -(value & !sign_bit);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        secp256k1::{Keypair, SecretKey},
        taproot::LeafVersion,
    };

    use super::*;

    fn key(seed: u8) -> XOnlyPublicKey {
        let sk = SecretKey::from_slice(&[seed; 32]).unwrap();
        Keypair::from_secret_key(SECP256K1, &sk).x_only_public_key().0
    }

    fn sample_scripts() -> StakingScripts {
        crate::builder::StakingScriptData::new(
            key(1),
            vec![key(2)],
            vec![key(3), key(4)],
            1,
            150,
            101,
            [1, 2, 3, 4],
        )
        .unwrap()
        .build_scripts()
        .unwrap()
    }

    #[test]
    fn test_staking_tree_has_three_leaves() {
        let scripts = sample_scripts();
        let info = scripts.staking_spend_info().unwrap();

        for leaf in [
            &scripts.slashing_script,
            &scripts.unbonding_script,
            &scripts.timelock_script,
        ] {
            let cb = info
                .control_block(&(leaf.clone(), LeafVersion::TapScript))
                .expect("leaf is committed");
            assert!(cb.verify_taproot_commitment(SECP256K1, info.output_key().to_inner(), leaf));
        }
        assert!(info
            .control_block(&(scripts.unbonding_timelock_script.clone(), LeafVersion::TapScript))
            .is_none());
        assert_eq!(info.internal_key(), *UNSPENDABLE_INTERNAL_KEY);
    }

    #[test]
    fn test_unbonding_tree_differs_from_staking_tree() {
        let scripts = sample_scripts();
        let staking = scripts.staking_output_script().unwrap();
        let unbonding = scripts.unbonding_output_script().unwrap();

        assert!(staking.is_p2tr());
        assert!(unbonding.is_p2tr());
        assert_ne!(staking, unbonding);
    }

    #[test]
    fn test_parse_timelock_script() {
        let pk = key(7);
        for blocks in [1u16, 16, 17, 127, 128, 150, 32_767, 32_768, u16::MAX] {
            let script = timelock_script(&pk, blocks);
            assert_eq!(parse_timelock_script(&script), Some((pk, blocks)));
        }
    }

    #[test]
    fn test_parse_rejects_other_scripts() {
        let scripts = sample_scripts();
        assert!(parse_timelock_script(&scripts.slashing_script).is_none());
        assert!(parse_timelock_script(&scripts.unbonding_script).is_none());
        assert!(parse_timelock_script(&ScriptBuf::new()).is_none());
    }

    #[test]
    fn test_decode_script_num_sign() {
        assert_eq!(decode_script_num(&[0x96, 0x00]), Some(150));
        assert_eq!(decode_script_num(&[0x81]), Some(-1));
        assert_eq!(decode_script_num(&[]), None);
    }
}
