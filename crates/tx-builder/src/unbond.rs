use bitcoin::{psbt::Psbt, Address, Amount, Network, Sequence, Transaction};
use secp256k1::SECP256K1;
use stakeline_scripts::StakingScripts;
use tracing::*;

use crate::{errors::TxBuildError, spend::SpendInput};

/// Builds the unsigned transaction moving a staking output into the unbonding output.
///
/// The staking output is spent through the unbonding leaf of the staking tree. The single
/// output pays the staking value minus `unbonding_fee` to the unbonding tree
/// `[slashing, unbonding_timelock]`.
pub fn build_unbonding_psbt(
    scripts: &StakingScripts,
    staking_tx: &Transaction,
    output_index: u32,
    unbonding_fee: Amount,
    network: Network,
) -> Result<Psbt, TxBuildError> {
    let input = SpendInput {
        source_tx: staking_tx,
        output_index,
        spend_info: scripts.staking_spend_info()?,
        leaf: &scripts.unbonding_script,
    };

    let unbonding_info = scripts.unbonding_spend_info()?;
    let unbonding_address = Address::p2tr(
        SECP256K1,
        unbonding_info.internal_key(),
        unbonding_info.merkle_root(),
        network,
    );

    let psbt = input.build_psbt(
        Sequence::MAX,
        unbonding_address.script_pubkey(),
        unbonding_fee,
    )?;

    debug!(
        staking_txid = %staking_tx.compute_txid(),
        unbonding_txid = %psbt.unsigned_tx.compute_txid(),
        %unbonding_address,
        fee = %unbonding_fee,
        "built unbonding transaction"
    );
    Ok(psbt)
}
