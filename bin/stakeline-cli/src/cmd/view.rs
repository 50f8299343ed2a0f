use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use serde::Serialize;
use stakeline_lifecycle::{
    available_transition, merged_view, reconcile, DelegationView, FileIntermediateStore,
    IntermediateStore, TransitionKind,
};
use stakeline_primitives::{intermediate_store_key, parse_xonly_pk};
use tracing::*;

use crate::context::{read_delegations, CliContext};

/// Reconcile the intermediate store against a remote delegation dump and print the merged view
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "view")]
pub(crate) struct ViewArgs {
    /// x-only staker public key, hex
    #[argh(option)]
    pub(crate) staker: String,

    /// path to the remote delegation list, JSON
    #[argh(option)]
    pub(crate) delegations: PathBuf,

    /// current chain tip height; when given, each entry lists the transition it allows
    #[argh(option)]
    pub(crate) tip_height: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewRow {
    #[serde(flatten)]
    entry: DelegationView,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_transition: Option<TransitionKind>,
}

pub(crate) fn view(ctx: &CliContext, args: ViewArgs) -> anyhow::Result<String> {
    parse_xonly_pk(&args.staker).context("invalid staker key")?;
    let remote = read_delegations(&args.delegations)?;

    let store = FileIntermediateStore::open(&ctx.config.store.directory)?;
    let key = intermediate_store_key(&args.staker);
    let local = store.load(&key)?;
    let kept = reconcile(&remote, &local);
    if kept.len() != local.len() {
        info!(evicted = local.len() - kept.len(), "retired confirmed intermediate records");
        store.store(&key, &kept)?;
    }

    let rows: Vec<_> = merged_view(&remote, &kept)
        .into_iter()
        .map(|entry| ViewRow {
            available_transition: args
                .tip_height
                .and_then(|tip| available_transition(&entry.delegation, entry.pending, tip)),
            entry,
        })
        .collect();

    Ok(serde_json::to_string_pretty(&rows)?)
}
