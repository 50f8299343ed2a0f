use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use bitcoin::Txid;
use stakeline_lifecycle::TransitionKind;
use stakeline_params::{resolve, ProtocolParamsVersion};
use stakeline_scripts::build_staking_scripts;
use stakeline_tx_builder::{build_unbonding_psbt, build_withdrawal_psbt, WithdrawSource};
use tracing::*;

use crate::context::{read_delegations, read_json, CliContext};

/// Build the unsigned PSBT of an unbonding or withdrawal for offline signing
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "build-psbt")]
pub(crate) struct BuildPsbtArgs {
    /// x-only staker public key, hex
    #[argh(option)]
    pub(crate) staker: String,

    /// path to the remote delegation list, JSON
    #[argh(option)]
    pub(crate) delegations: PathBuf,

    /// path to the protocol parameter versions, JSON
    #[argh(option)]
    pub(crate) params: PathBuf,

    /// staking transaction hash of the delegation
    #[argh(option)]
    pub(crate) hash: Txid,

    /// transition to build: "unbond" or "withdraw"
    #[argh(option, from_str_fn(parse_kind))]
    pub(crate) kind: TransitionKind,

    /// destination address, required for withdrawals
    #[argh(option)]
    pub(crate) address: Option<String>,
}

fn parse_kind(value: &str) -> Result<TransitionKind, String> {
    match value {
        "unbond" => Ok(TransitionKind::Unbond),
        "withdraw" => Ok(TransitionKind::Withdraw),
        other => Err(format!("unknown transition '{other}', expected unbond or withdraw")),
    }
}

/// Returns the PSBT as hex.
pub(crate) fn build_psbt(ctx: &CliContext, args: BuildPsbtArgs) -> anyhow::Result<String> {
    let remote = read_delegations(&args.delegations)?;
    let versions: Vec<ProtocolParamsVersion> = read_json(&args.params)?;

    let delegation = remote
        .iter()
        .find(|d| d.staking_tx_hash() == args.hash)
        .with_context(|| format!("delegation {} not found", args.hash))?;

    let params = resolve(delegation.staking_tx.start_height, &versions)?;
    let scripts = build_staking_scripts(
        &delegation.finality_provider_pk_hex,
        delegation.staking_tx.timelock,
        &params,
        &args.staker,
    )?;

    let network = ctx.config.network;
    let psbt = match args.kind {
        TransitionKind::Unbond => {
            let staking_tx = delegation.staking_tx.decode()?;
            build_unbonding_psbt(
                &scripts,
                &staking_tx,
                delegation.staking_tx.output_index,
                params.unbonding_fee_sat,
                network,
            )?
        }
        TransitionKind::Withdraw => {
            let address = args
                .address
                .as_deref()
                .context("--address is required for withdrawals")?;
            let source = WithdrawSource::for_delegation(delegation, &scripts)?;
            build_withdrawal_psbt(&source, address, ctx.config.fees.withdrawal_fee(), network)?
        }
    };

    info!(
        kind = %args.kind,
        staking_tx_hash = %args.hash,
        txid = %psbt.unsigned_tx.compute_txid(),
        version = params.version,
        "built unsigned psbt"
    );
    Ok(psbt.serialize_hex())
}
