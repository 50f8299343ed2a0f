use std::{fmt, str::FromStr};

use bitcoin::{
    address::NetworkUnchecked, psbt::Psbt, Address, Amount, Network, ScriptBuf, Transaction,
};
use stakeline_primitives::Delegation;
use stakeline_scripts::{staking_spend_info, unbonding_spend_info, StakingScripts};
use tracing::*;

use crate::{errors::TxBuildError, spend::SpendInput};

/// Leaves of the unbonding tree needed to withdraw an early-unbonded delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarlyUnbondedScripts {
    pub unbonding_timelock_script: ScriptBuf,
    pub slashing_script: ScriptBuf,
}

/// Leaves of the staking tree needed to withdraw after the staking timelock expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelockExpiredScripts {
    pub timelock_script: ScriptBuf,
    pub slashing_script: ScriptBuf,
    pub unbonding_script: ScriptBuf,
}

impl From<&StakingScripts> for EarlyUnbondedScripts {
    fn from(scripts: &StakingScripts) -> Self {
        Self {
            unbonding_timelock_script: scripts.unbonding_timelock_script.clone(),
            slashing_script: scripts.slashing_script.clone(),
        }
    }
}

impl From<&StakingScripts> for TimelockExpiredScripts {
    fn from(scripts: &StakingScripts) -> Self {
        Self {
            timelock_script: scripts.timelock_script.clone(),
            slashing_script: scripts.slashing_script.clone(),
            unbonding_script: scripts.unbonding_script.clone(),
        }
    }
}

/// The output a withdrawal spends, together with exactly the scripts that path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawSource {
    /// The delegation was unbonded early; spend the unbonding output through its timelock.
    EarlyUnbonded {
        unbonding_tx: Transaction,
        output_index: u32,
        scripts: EarlyUnbondedScripts,
    },

    /// The staking timelock expired; spend the staking output directly.
    TimelockExpired {
        staking_tx: Transaction,
        output_index: u32,
        scripts: TimelockExpiredScripts,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawPath {
    EarlyUnbonded,
    TimelockExpired,
}

impl fmt::Display for WithdrawPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EarlyUnbonded => f.write_str("early-unbonded"),
            Self::TimelockExpired => f.write_str("timelock-expired"),
        }
    }
}

impl WithdrawSource {
    /// Picks the withdrawal path from the presence of an unbonding transaction.
    pub fn for_delegation(
        delegation: &Delegation,
        scripts: &StakingScripts,
    ) -> Result<Self, TxBuildError> {
        match &delegation.unbonding_tx {
            Some(unbonding) => Ok(Self::EarlyUnbonded {
                unbonding_tx: unbonding.decode()?,
                output_index: unbonding.output_index,
                scripts: scripts.into(),
            }),
            None => Ok(Self::TimelockExpired {
                staking_tx: delegation.staking_tx.decode()?,
                output_index: delegation.staking_tx.output_index,
                scripts: scripts.into(),
            }),
        }
    }

    pub fn path(&self) -> WithdrawPath {
        match self {
            Self::EarlyUnbonded { .. } => WithdrawPath::EarlyUnbonded,
            Self::TimelockExpired { .. } => WithdrawPath::TimelockExpired,
        }
    }

    fn spend_input(&self) -> Result<SpendInput<'_>, TxBuildError> {
        match self {
            Self::EarlyUnbonded {
                unbonding_tx,
                output_index,
                scripts,
            } => Ok(SpendInput {
                source_tx: unbonding_tx,
                output_index: *output_index,
                spend_info: unbonding_spend_info(
                    &scripts.slashing_script,
                    &scripts.unbonding_timelock_script,
                )?,
                leaf: &scripts.unbonding_timelock_script,
            }),
            Self::TimelockExpired {
                staking_tx,
                output_index,
                scripts,
            } => Ok(SpendInput {
                source_tx: staking_tx,
                output_index: *output_index,
                spend_info: staking_spend_info(
                    &scripts.slashing_script,
                    &scripts.unbonding_script,
                    &scripts.timelock_script,
                )?,
                leaf: &scripts.timelock_script,
            }),
        }
    }
}

/// Builds the unsigned transaction returning a withdrawable output to `destination`.
///
/// The input sequence carries the relative timelock of the spent leaf. The single output pays
/// the source value minus `withdrawal_fee`.
pub fn build_withdrawal_psbt(
    source: &WithdrawSource,
    destination: &str,
    withdrawal_fee: Amount,
    network: Network,
) -> Result<Psbt, TxBuildError> {
    let destination = Address::<NetworkUnchecked>::from_str(destination)
        .map_err(|e| TxBuildError::InvalidAddress(e.to_string()))?
        .require_network(network)
        .map_err(|e| TxBuildError::InvalidAddress(e.to_string()))?;

    let input = source.spend_input()?;
    let sequence = input.csv_sequence()?;
    let psbt = input.build_psbt(sequence, destination.script_pubkey(), withdrawal_fee)?;

    debug!(
        path = %source.path(),
        source_txid = %input.source_tx.compute_txid(),
        withdrawal_txid = %psbt.unsigned_tx.compute_txid(),
        %destination,
        fee = %withdrawal_fee,
        "built withdrawal transaction"
    );
    Ok(psbt)
}

#[cfg(test)]
mod tests {
    use bitcoin::{taproot::LeafVersion, OutPoint, Sequence};
    use stakeline_primitives::DelegationState;
    use stakeline_test_utils::{
        delegation::{STAKING_OUTPUT_INDEX, STAKING_TIMELOCK, STAKING_VALUE},
        params_version, regtest_address, staking_fixture, DelegationFixture,
    };

    use super::*;
    use crate::errors::MismatchReason;

    const UNBONDING_FEE: Amount = Amount::from_sat(1_000);
    const WITHDRAWAL_FEE: Amount = Amount::from_sat(500);

    fn fixture(unbonded: bool) -> DelegationFixture {
        let fx = staking_fixture(3, 150, &params_version(0, 100));
        if unbonded {
            fx.with_unbonding_tx(UNBONDING_FEE)
        } else {
            fx.with_state(DelegationState::Unbonded)
        }
    }

    fn only_leaf(psbt: &Psbt) -> ScriptBuf {
        let leaves: Vec<_> = psbt.inputs[0].tap_scripts.values().collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].1, LeafVersion::TapScript);
        leaves[0].0.clone()
    }

    #[test]
    fn test_path_selection() {
        // (has unbonding tx, expected path)
        let cases = [
            (true, WithdrawPath::EarlyUnbonded),
            (false, WithdrawPath::TimelockExpired),
        ];

        for (unbonded, expected) in cases {
            let fx = fixture(unbonded);
            let source = WithdrawSource::for_delegation(&fx.delegation, &fx.scripts).unwrap();
            assert_eq!(source.path(), expected, "unbonded = {unbonded}");

            let psbt = build_withdrawal_psbt(
                &source,
                &regtest_address(9),
                WITHDRAWAL_FEE,
                Network::Regtest,
            )
            .unwrap();

            let (leaf, sequence, outpoint, value) = match expected {
                WithdrawPath::EarlyUnbonded => (
                    fx.scripts.unbonding_timelock_script.clone(),
                    101,
                    OutPoint::new(fx.unbonding_tx.as_ref().unwrap().compute_txid(), 0),
                    STAKING_VALUE - UNBONDING_FEE - WITHDRAWAL_FEE,
                ),
                WithdrawPath::TimelockExpired => (
                    fx.scripts.timelock_script.clone(),
                    STAKING_TIMELOCK,
                    OutPoint::new(fx.staking_tx.compute_txid(), STAKING_OUTPUT_INDEX),
                    STAKING_VALUE - WITHDRAWAL_FEE,
                ),
            };

            let tx = &psbt.unsigned_tx;
            assert_eq!(only_leaf(&psbt), leaf);
            assert_eq!(tx.input[0].sequence, Sequence::from_height(sequence));
            assert_eq!(tx.input[0].previous_output, outpoint);
            assert_eq!(tx.output[0].value, value);
        }
    }

    #[test]
    fn test_sources_carry_only_their_scripts() {
        let fx = fixture(true);
        match WithdrawSource::for_delegation(&fx.delegation, &fx.scripts).unwrap() {
            WithdrawSource::EarlyUnbonded { scripts, .. } => {
                assert_eq!(scripts, EarlyUnbondedScripts::from(&fx.scripts));
            }
            other => panic!("unexpected source {other:?}"),
        }

        let fx = fixture(false);
        match WithdrawSource::for_delegation(&fx.delegation, &fx.scripts).unwrap() {
            WithdrawSource::TimelockExpired { scripts, .. } => {
                assert_eq!(scripts, TimelockExpiredScripts::from(&fx.scripts));
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_destination_on_other_network() {
        let fx = fixture(false);
        let source = WithdrawSource::for_delegation(&fx.delegation, &fx.scripts).unwrap();

        let err = build_withdrawal_psbt(
            &source,
            &regtest_address(9),
            WITHDRAWAL_FEE,
            Network::Bitcoin,
        )
        .unwrap_err();
        assert!(matches!(err, TxBuildError::InvalidAddress(_)));

        let err = build_withdrawal_psbt(&source, "not-an-address", WITHDRAWAL_FEE, Network::Regtest)
            .unwrap_err();
        assert!(matches!(err, TxBuildError::InvalidAddress(_)));
    }

    #[test]
    fn test_malformed_unbonding_tx() {
        let mut fx = fixture(true);
        fx.delegation.unbonding_tx.as_mut().unwrap().tx_hex = "zz".to_owned();

        let err = WithdrawSource::for_delegation(&fx.delegation, &fx.scripts).unwrap_err();
        assert!(matches!(err, TxBuildError::MalformedTx(_)));
    }

    #[test]
    fn test_unbonding_output_must_match_rebuilt_tree() {
        let fx = fixture(true);
        let mut scripts = fx.scripts.clone();
        scripts.unbonding_timelock_script =
            stakeline_scripts::timelock_script(&stakeline_test_utils::xonly(1), 102);

        let source = WithdrawSource::for_delegation(&fx.delegation, &scripts).unwrap();
        let err = build_withdrawal_psbt(
            &source,
            &regtest_address(9),
            WITHDRAWAL_FEE,
            Network::Regtest,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TxBuildError::ScriptMismatch {
                vout: 0,
                reason: MismatchReason::OutputScript(_),
                ..
            }
        ));
    }
}
