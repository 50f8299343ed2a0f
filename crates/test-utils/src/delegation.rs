use bitcoin::{
    absolute::LockTime, hashes::Hash, transaction::Version, Amount, OutPoint, ScriptBuf,
    Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use chrono::{TimeZone, Utc};
use stakeline_params::ProtocolParamsVersion;
use stakeline_primitives::{
    encode_tx_hex, Delegation, DelegationState, StakingTx, UnbondingTx,
};
use stakeline_scripts::{build_staking_scripts, StakingScripts};

use crate::keys::{xonly, xonly_hex, FINALITY_PROVIDER_SEED, STAKER_SEED};

/// Output index of the staking output in fixture staking transactions. A change output sits
/// in front of it so that index handling is exercised.
pub const STAKING_OUTPUT_INDEX: u32 = 1;

pub const STAKING_VALUE: Amount = Amount::from_sat(100_000);

pub const STAKING_TIMELOCK: u16 = 150;

/// A delegation together with the transaction and scripts it was built from.
#[derive(Debug, Clone)]
pub struct DelegationFixture {
    pub delegation: Delegation,
    pub scripts: StakingScripts,
    pub staking_tx: Transaction,
    pub unbonding_tx: Option<Transaction>,
}

/// Builds an active delegation whose staking output commits to the scripts rebuilt from
/// `params`. Distinct `nonce` values give distinct staking transaction hashes.
pub fn staking_fixture(
    nonce: u32,
    start_height: u64,
    params: &ProtocolParamsVersion,
) -> DelegationFixture {
    let scripts = build_staking_scripts(
        &xonly_hex(FINALITY_PROVIDER_SEED),
        STAKING_TIMELOCK,
        params,
        &xonly_hex(STAKER_SEED),
    )
    .expect("fixture scripts");

    let staking_tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: Txid::all_zeros(),
                vout: nonce,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![
            TxOut {
                value: Amount::from_sat(50_000),
                script_pubkey: ScriptBuf::new_p2tr(
                    secp256k1::SECP256K1,
                    xonly(STAKER_SEED),
                    None,
                ),
            },
            TxOut {
                value: STAKING_VALUE,
                script_pubkey: scripts.staking_output_script().expect("fixture tree"),
            },
            TxOut {
                value: Amount::ZERO,
                script_pubkey: scripts.data_embed_script.clone(),
            },
        ],
    };

    let delegation = Delegation {
        staking_tx_hash_hex: staking_tx.compute_txid(),
        staker_pk_hex: xonly_hex(STAKER_SEED),
        finality_provider_pk_hex: xonly_hex(FINALITY_PROVIDER_SEED),
        state: DelegationState::Active,
        staking_value_sat: STAKING_VALUE,
        staking_tx: StakingTx {
            tx_hex: encode_tx_hex(&staking_tx),
            output_index: STAKING_OUTPUT_INDEX,
            start_timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            start_height,
            timelock: STAKING_TIMELOCK,
        },
        unbonding_tx: None,
        is_overflow: false,
    };

    DelegationFixture {
        delegation,
        scripts,
        staking_tx,
        unbonding_tx: None,
    }
}

impl DelegationFixture {
    pub fn with_state(mut self, state: DelegationState) -> Self {
        self.delegation.state = state;
        self
    }

    /// Attaches an unbonding transaction paying `staking value - fee` into the unbonding
    /// output, and marks the delegation unbonded.
    pub fn with_unbonding_tx(mut self, fee: Amount) -> Self {
        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: self.staking_tx.compute_txid(),
                    vout: STAKING_OUTPUT_INDEX,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: STAKING_VALUE - fee,
                script_pubkey: self.scripts.unbonding_output_script().expect("fixture tree"),
            }],
        };

        self.delegation.unbonding_tx = Some(UnbondingTx {
            tx_hex: encode_tx_hex(&tx),
            output_index: 0,
        });
        self.delegation.state = DelegationState::Unbonded;
        self.unbonding_tx = Some(tx);
        self
    }
}
