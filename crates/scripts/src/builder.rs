use std::{collections::BTreeSet, iter};

use bitcoin::{
    opcodes::all::{
        OP_CHECKSIG, OP_CHECKSIGADD, OP_CHECKSIGVERIFY, OP_CSV, OP_NUMEQUAL, OP_NUMEQUALVERIFY,
        OP_RETURN,
    },
    script::{Builder, PushBytesBuf},
    ScriptBuf, XOnlyPublicKey,
};
use stakeline_params::{ProtocolParamsVersion, TAG_LEN};
use stakeline_primitives::parse_xonly_pk;

use crate::errors::ScriptError;

/// Version byte of the staking OP_RETURN payload.
pub const DATA_EMBED_VERSION: u8 = 0;

/// The scripts a staking position is locked under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingScripts {
    /// Staker-only path, usable once the staking timelock expired.
    pub timelock_script: ScriptBuf,

    /// Staker + finality provider + covenant quorum.
    pub slashing_script: ScriptBuf,

    /// Staker + covenant quorum, moves funds into the unbonding output.
    pub unbonding_script: ScriptBuf,

    /// Staker-only path of the unbonding output, usable once the unbonding time passed.
    pub unbonding_timelock_script: ScriptBuf,

    /// OP_RETURN output identifying the staking transaction.
    pub data_embed_script: ScriptBuf,
}

/// Validated inputs of the staking scripts.
#[derive(Debug, Clone)]
pub struct StakingScriptData {
    staker_key: XOnlyPublicKey,
    finality_provider_keys: Vec<XOnlyPublicKey>,
    covenant_keys: Vec<XOnlyPublicKey>,
    covenant_threshold: u32,
    staking_timelock: u16,
    unbonding_timelock: u16,
    tag: [u8; TAG_LEN],
}

impl StakingScriptData {
    pub fn new(
        staker_key: XOnlyPublicKey,
        finality_provider_keys: Vec<XOnlyPublicKey>,
        covenant_keys: Vec<XOnlyPublicKey>,
        covenant_threshold: u32,
        staking_timelock: u16,
        unbonding_timelock: u16,
        tag: [u8; TAG_LEN],
    ) -> Result<Self, ScriptError> {
        if staking_timelock == 0 || unbonding_timelock == 0 {
            return Err(ScriptError::ZeroTimelock);
        }
        if finality_provider_keys.is_empty() {
            return Err(ScriptError::ThresholdOutOfRange {
                threshold: 1,
                keys: 0,
            });
        }
        if covenant_threshold == 0 || covenant_threshold as usize > covenant_keys.len() {
            return Err(ScriptError::ThresholdOutOfRange {
                threshold: covenant_threshold,
                keys: covenant_keys.len(),
            });
        }

        // The staker may not double as a finality provider or covenant member, and no
        // committee may list a key twice.
        let mut seen = BTreeSet::new();
        for key in iter::once(&staker_key)
            .chain(&finality_provider_keys)
            .chain(&covenant_keys)
        {
            if !seen.insert(key.serialize()) {
                return Err(ScriptError::DuplicateKey(*key));
            }
        }

        Ok(Self {
            staker_key,
            finality_provider_keys,
            covenant_keys,
            covenant_threshold,
            staking_timelock,
            unbonding_timelock,
            tag,
        })
    }

    pub fn build_scripts(&self) -> Result<StakingScripts, ScriptError> {
        Ok(StakingScripts {
            timelock_script: timelock_script(&self.staker_key, self.staking_timelock),
            slashing_script: self.slashing_script()?,
            unbonding_script: self.unbonding_script()?,
            unbonding_timelock_script: timelock_script(&self.staker_key, self.unbonding_timelock),
            data_embed_script: self.data_embed_script(),
        })
    }

    fn unbonding_script(&self) -> Result<ScriptBuf, ScriptError> {
        let builder = push_single_key(Builder::new(), &self.staker_key, true);
        let builder = push_multi_key(builder, &self.covenant_keys, self.covenant_threshold, false)?;
        Ok(builder.into_script())
    }

    fn slashing_script(&self) -> Result<ScriptBuf, ScriptError> {
        let builder = push_single_key(Builder::new(), &self.staker_key, true);
        let builder = push_multi_key(builder, &self.finality_provider_keys, 1, true)?;
        let builder = push_multi_key(builder, &self.covenant_keys, self.covenant_threshold, false)?;
        Ok(builder.into_script())
    }

    fn data_embed_script(&self) -> ScriptBuf {
        let mut payload = Vec::with_capacity(TAG_LEN + 1 + 32 + 32 + 2);
        payload.extend_from_slice(&self.tag);
        payload.push(DATA_EMBED_VERSION);
        payload.extend_from_slice(&self.staker_key.serialize());
        payload.extend_from_slice(&self.finality_provider_keys[0].serialize());
        payload.extend_from_slice(&self.staking_timelock.to_be_bytes());

        let payload =
            PushBytesBuf::try_from(payload).expect("data embed payload is below push limit");
        Builder::new()
            .push_opcode(OP_RETURN)
            .push_slice(payload)
            .into_script()
    }
}

/// Rebuilds the scripts of a delegation from the parameters in force when it was opened.
///
/// Pure function of its inputs: identical inputs give byte-identical scripts, which is what
/// lets a spend be built without ever storing the original scripts.
pub fn build_staking_scripts(
    finality_provider_pk_hex: &str,
    timelock_blocks: u16,
    params: &ProtocolParamsVersion,
    staker_pk_no_coord_hex: &str,
) -> Result<StakingScripts, ScriptError> {
    let staker_key =
        parse_xonly_pk(staker_pk_no_coord_hex).map_err(ScriptError::InvalidStakerKey)?;
    let fp_key = parse_xonly_pk(finality_provider_pk_hex)
        .map_err(ScriptError::InvalidFinalityProviderKey)?;

    StakingScriptData::new(
        staker_key,
        vec![fp_key],
        params.covenant_keys()?,
        params.covenant_quorum,
        timelock_blocks,
        params.unbonding_time,
        params.tag_bytes()?,
    )?
    .build_scripts()
}

/// `<pk> OP_CHECKSIGVERIFY <blocks> OP_CSV`
pub fn timelock_script(pk: &XOnlyPublicKey, blocks: u16) -> ScriptBuf {
    push_single_key(Builder::new(), pk, true)
        .push_int(i64::from(blocks))
        .push_opcode(OP_CSV)
        .into_script()
}

fn push_single_key(builder: Builder, pk: &XOnlyPublicKey, with_verify: bool) -> Builder {
    let op = if with_verify {
        OP_CHECKSIGVERIFY
    } else {
        OP_CHECKSIG
    };
    builder.push_slice(pk.serialize()).push_opcode(op)
}

/// Appends a `threshold`-of-`keys` check.
///
/// Keys are sorted by their serialized bytes so the script does not depend on the order the
/// committee was published in.
fn push_multi_key(
    builder: Builder,
    keys: &[XOnlyPublicKey],
    threshold: u32,
    with_verify: bool,
) -> Result<Builder, ScriptError> {
    if keys.is_empty() || threshold == 0 || threshold as usize > keys.len() {
        return Err(ScriptError::ThresholdOutOfRange {
            threshold,
            keys: keys.len(),
        });
    }
    if keys.len() == 1 {
        return Ok(push_single_key(builder, &keys[0], with_verify));
    }

    let mut sorted = keys.to_vec();
    sorted.sort_by_key(|k| k.serialize());

    let mut builder = builder
        .push_slice(sorted[0].serialize())
        .push_opcode(OP_CHECKSIG);
    for key in &sorted[1..] {
        builder = builder
            .push_slice(key.serialize())
            .push_opcode(OP_CHECKSIGADD);
    }

    let op = if with_verify {
        OP_NUMEQUALVERIFY
    } else {
        OP_NUMEQUAL
    };
    Ok(builder.push_int(i64::from(threshold)).push_opcode(op))
}
