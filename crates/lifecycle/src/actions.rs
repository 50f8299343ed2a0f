//! Transition handlers wiring the lifecycle components for one staker.

use std::{collections::HashSet, fmt, sync::Arc};

use bitcoin::{Amount, Network, Txid};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use stakeline_params::{resolve, ProtocolParamsVersion};
use stakeline_primitives::{
    intermediate_store_key, Delegation, IntermediateDelegation, IntermediateState,
};
use stakeline_scripts::{build_staking_scripts, StakingScripts};
use stakeline_tx_builder::{
    build_unbonding_psbt, build_withdrawal_psbt, TxBuildError, WithdrawSource,
};
use tracing::*;

use crate::{
    api::{StakingApi, TxBroadcaster, UnbondingRequest},
    eligibility::EligibilityGate,
    errors::{TransitionError, TransitionFailure, TransitionKind},
    reconcile::{merged_view, reconcile, record_pending, DelegationView},
    signing::{PsbtSigner, SigningCoordinator},
    store::IntermediateStore,
};

/// Default fee paid by withdrawal transactions.
pub const DEFAULT_WITHDRAWAL_FEE: Amount = Amount::from_sat(1_000);

/// Fees not fixed by the protocol parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub withdrawal_fee: Amount,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            withdrawal_fee: DEFAULT_WITHDRAWAL_FEE,
        }
    }
}

/// The staker on whose behalf transitions are made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakerContext {
    /// X-only staker key, hex.
    pub staker_pk_hex: String,

    /// Where withdrawals pay out to.
    pub withdrawal_address: String,

    pub network: Network,
}

pub struct DelegationActions<TApi, TSigner, TBroadcaster, TStore> {
    staker: StakerContext,
    fees: FeeSchedule,
    api: Arc<TApi>,
    gate: EligibilityGate<TApi>,
    signer: SigningCoordinator<TSigner>,
    broadcaster: Arc<TBroadcaster>,
    store: Arc<TStore>,
    store_key: String,

    /// Latest remote delegation list. Each transition works on the snapshot it started with.
    remote: RwLock<Option<Arc<Vec<Delegation>>>>,

    /// Serializes load-compute-store cycles on the intermediate store.
    store_lock: Mutex<()>,

    in_flight: Mutex<HashSet<Txid>>,
}

impl<TApi, TSigner, TBroadcaster, TStore> fmt::Debug
    for DelegationActions<TApi, TSigner, TBroadcaster, TStore>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegationActions")
            .field("staker", &self.staker)
            .field("fees", &self.fees)
            .field("store_key", &self.store_key)
            .finish_non_exhaustive()
    }
}

impl<TApi, TSigner, TBroadcaster, TStore> DelegationActions<TApi, TSigner, TBroadcaster, TStore>
where
    TApi: StakingApi,
    TSigner: PsbtSigner,
    TBroadcaster: TxBroadcaster,
    TStore: IntermediateStore,
{
    pub fn new(
        staker: StakerContext,
        fees: FeeSchedule,
        api: Arc<TApi>,
        signer: Arc<TSigner>,
        broadcaster: Arc<TBroadcaster>,
        store: Arc<TStore>,
    ) -> Self {
        let store_key = intermediate_store_key(&staker.staker_pk_hex);
        Self {
            staker,
            fees,
            gate: EligibilityGate::new(api.clone()),
            api,
            signer: SigningCoordinator::new(signer),
            broadcaster,
            store,
            store_key,
            remote: RwLock::new(None),
            store_lock: Mutex::new(()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn staker(&self) -> &StakerContext {
        &self.staker
    }

    /// Records the latest remote list and retires the local records it confirms.
    pub fn observe_remote(&self, delegations: Vec<Delegation>) -> Result<(), TransitionError> {
        let snapshot = Arc::new(delegations);
        *self.remote.write() = Some(snapshot.clone());

        let _lock = self.store_lock.lock();
        let local = self.store.load(&self.store_key)?;
        let kept = reconcile(&snapshot, &local);
        if kept.len() != local.len() {
            debug!(evicted = local.len() - kept.len(), "retired confirmed intermediate records");
            self.store.store(&self.store_key, &kept)?;
        }
        Ok(())
    }

    /// Merged view of remote and pending delegations. Without a remote list only the pending
    /// ones are shown.
    pub fn view(&self) -> Result<Vec<DelegationView>, TransitionError> {
        let local = self.store.load(&self.store_key)?;
        let remote = self.remote.read().clone().unwrap_or_default();
        Ok(merged_view(&remote, &local))
    }

    /// Guarded entry point: at most one transition per delegation runs at a time.
    pub async fn run(
        &self,
        kind: TransitionKind,
        staking_tx_hash: Txid,
    ) -> Result<Txid, TransitionFailure> {
        let result = match InFlightGuard::acquire(&self.in_flight, staking_tx_hash) {
            None => Err(TransitionError::TransitionInProgress(staking_tx_hash)),
            Some(_guard) => match kind {
                TransitionKind::Unbond => self.unbond(staking_tx_hash).await,
                TransitionKind::Withdraw => self.withdraw(staking_tx_hash).await,
            },
        };

        result.map_err(|error| {
            warn!(?kind, %staking_tx_hash, %error, "transition failed");
            TransitionFailure {
                kind,
                staking_tx_hash,
                error,
                at: Utc::now(),
            }
        })
    }

    /// Unbonds an active delegation. Returns the unbonding txid.
    pub async fn unbond(&self, staking_tx_hash: Txid) -> Result<Txid, TransitionError> {
        let delegation = self.lookup(staking_tx_hash)?;
        self.gate.check_unbond_eligible(staking_tx_hash).await?;

        let (params, scripts) = self.rebuild_scripts(&delegation).await?;
        let staking_tx = delegation
            .staking_tx
            .decode()
            .map_err(TxBuildError::from)?;
        let psbt = build_unbonding_psbt(
            &scripts,
            &staking_tx,
            delegation.staking_tx.output_index,
            params.unbonding_fee_sat,
            self.staker.network,
        )?;

        let signed = self.signer.sign(&psbt).await?;
        let txid = signed.txid();
        let request = UnbondingRequest {
            staker_signed_signature_hex: signed.staker_signature_hex()?,
            staking_tx_hash_hex: staking_tx_hash,
            unbonding_tx_hash_hex: txid,
            unbonding_tx_hex: signed.tx_hex(),
        };
        self.api
            .post_unbonding(request)
            .await
            .map_err(|e| TransitionError::SubmissionFailed {
                txid,
                reason: e.to_string(),
            })?;
        info!(%staking_tx_hash, unbonding_txid = %txid, "submitted unbonding");

        self.record(&delegation, IntermediateState::Unbonding, txid)?;
        Ok(txid)
    }

    /// Withdraws an unbonded or timelock-expired delegation. Returns the withdrawal txid.
    pub async fn withdraw(&self, staking_tx_hash: Txid) -> Result<Txid, TransitionError> {
        let delegation = self.lookup(staking_tx_hash)?;

        let (_, scripts) = self.rebuild_scripts(&delegation).await?;
        let source = WithdrawSource::for_delegation(&delegation, &scripts)?;
        let psbt = build_withdrawal_psbt(
            &source,
            &self.staker.withdrawal_address,
            self.fees.withdrawal_fee,
            self.staker.network,
        )?;

        let signed = self.signer.sign(&psbt).await?;
        let txid = signed.txid();
        let pushed = self
            .broadcaster
            .push_tx(signed.tx_hex())
            .await
            .map_err(|e| TransitionError::SubmissionFailed {
                txid,
                reason: e.to_string(),
            })?;
        if pushed != txid {
            warn!(expected = %txid, reported = %pushed, "broadcaster reported another txid");
        }
        info!(
            %staking_tx_hash,
            withdrawal_txid = %txid,
            path = %source.path(),
            "broadcast withdrawal"
        );

        self.record(&delegation, IntermediateState::Withdrawal, txid)?;
        Ok(txid)
    }

    fn lookup(&self, staking_tx_hash: Txid) -> Result<Delegation, TransitionError> {
        let snapshot = self.remote.read().clone().ok_or_else(|| {
            TransitionError::DataUnavailable("remote delegations not loaded".to_owned())
        })?;
        snapshot
            .iter()
            .find(|d| d.staking_tx_hash() == staking_tx_hash)
            .cloned()
            .ok_or(TransitionError::DelegationNotFound(staking_tx_hash))
    }

    /// Rebuilds the scripts from the parameter version in force at the staking height.
    async fn rebuild_scripts(
        &self,
        delegation: &Delegation,
    ) -> Result<(ProtocolParamsVersion, StakingScripts), TransitionError> {
        let versions = self
            .api
            .global_params()
            .await
            .map_err(|e| TransitionError::DataUnavailable(format!("global params: {e}")))?;

        let params = resolve(delegation.staking_tx.start_height, &versions)?;
        debug!(
            staking_tx_hash = %delegation.staking_tx_hash(),
            start_height = delegation.staking_tx.start_height,
            version = params.version,
            "resolved params"
        );

        let scripts = build_staking_scripts(
            &delegation.finality_provider_pk_hex,
            delegation.staking_tx.timelock,
            &params,
            &self.staker.staker_pk_hex,
        )?;
        Ok((params, scripts))
    }

    /// Records the pending marker for the already submitted `txid`.
    fn record(
        &self,
        delegation: &Delegation,
        state: IntermediateState,
        txid: Txid,
    ) -> Result<(), TransitionError> {
        let record = IntermediateDelegation::pending(
            delegation,
            &self.staker.staker_pk_hex,
            state,
            Utc::now(),
        );

        let _lock = self.store_lock.lock();
        self.store
            .load(&self.store_key)
            .and_then(|local| self.store.store(&self.store_key, &record_pending(&local, record)))
            .map_err(|source| {
                error!(%txid, %source, "submitted transaction could not be recorded");
                TransitionError::RecordFailed { txid, source }
            })
    }
}

/// Marks a delegation as having a transition in flight until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Txid>>,
    hash: Txid,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<Txid>>, hash: Txid) -> Option<Self> {
        set.lock().insert(hash).then(|| Self { set, hash })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.hash);
    }
}
