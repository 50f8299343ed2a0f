//! Unifies the remote delegation list with locally pending transitions.
//!
//! The remote list is authoritative. Local records only mark transitions submitted from here
//! that the remote side has not reflected yet, and are retired as soon as it does.

use std::{collections::HashSet, iter};

use bitcoin::Txid;
use serde::Serialize;
use stakeline_primitives::{Delegation, DelegationState, IntermediateDelegation, IntermediateState};

use crate::errors::TransitionKind;

/// Whether a remote state shows that a pending local transition has been picked up.
///
/// This is the only rule by which local records are retired.
pub fn confirms_pending(state: DelegationState) -> bool {
    matches!(
        state,
        DelegationState::UnbondingRequested | DelegationState::Withdrawn
    )
}

/// Local entries first, then remote ones, each in their original order.
pub fn merge(remote: &[Delegation], local: &[IntermediateDelegation]) -> Vec<Delegation> {
    local
        .iter()
        .map(IntermediateDelegation::to_delegation)
        .chain(remote.iter().cloned())
        .collect()
}

/// Drops the local records that the remote list has caught up with.
pub fn reconcile(
    remote: &[Delegation],
    local: &[IntermediateDelegation],
) -> Vec<IntermediateDelegation> {
    let confirmed: HashSet<Txid> = remote
        .iter()
        .filter(|d| confirms_pending(d.state))
        .map(Delegation::staking_tx_hash)
        .collect();

    local
        .iter()
        .filter(|record| !confirmed.contains(&record.staking_tx_hash()))
        .cloned()
        .collect()
}

/// Prepends `record`, replacing any older record for the same delegation.
pub fn record_pending(
    local: &[IntermediateDelegation],
    record: IntermediateDelegation,
) -> Vec<IntermediateDelegation> {
    let hash = record.staking_tx_hash();
    iter::once(record)
        .chain(
            local
                .iter()
                .filter(|r| r.staking_tx_hash() != hash)
                .cloned(),
        )
        .collect()
}

pub fn pending_state(local: &[IntermediateDelegation], hash: Txid) -> Option<IntermediateState> {
    local
        .iter()
        .find(|r| r.staking_tx_hash() == hash)
        .map(|r| r.state)
}

/// The transition offered for `delegation`, if any.
pub fn available_transition(
    delegation: &Delegation,
    pending: Option<IntermediateState>,
    tip_height: u64,
) -> Option<TransitionKind> {
    if pending.is_some() {
        return None;
    }
    match delegation.state {
        DelegationState::Active if tip_height >= delegation.timelock_expiry_height() => {
            Some(TransitionKind::Withdraw)
        }
        DelegationState::Active => Some(TransitionKind::Unbond),
        DelegationState::Unbonded => Some(TransitionKind::Withdraw),
        _ => None,
    }
}

/// One row of the merged view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationView {
    #[serde(flatten)]
    pub delegation: Delegation,
    pub pending: Option<IntermediateState>,
}

/// Merges both lists, keeps the first entry per staking transaction and decorates each
/// with its pending marker.
pub fn merged_view(remote: &[Delegation], local: &[IntermediateDelegation]) -> Vec<DelegationView> {
    let mut seen = HashSet::new();
    merge(remote, local)
        .into_iter()
        .filter(|d| seen.insert(d.staking_tx_hash()))
        .map(|delegation| DelegationView {
            pending: pending_state(local, delegation.staking_tx_hash()),
            delegation,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use stakeline_test_utils::{params_version, staking_fixture};

    use super::*;

    const ALL_STATES: [DelegationState; 5] = [
        DelegationState::Active,
        DelegationState::UnbondingRequested,
        DelegationState::Unbonding,
        DelegationState::Unbonded,
        DelegationState::Withdrawn,
    ];

    fn delegation(nonce: u32, state: DelegationState) -> Delegation {
        let mut d = staking_fixture(nonce, 150, &params_version(0, 100)).delegation;
        d.state = state;
        d
    }

    fn pending(d: &Delegation, state: IntermediateState) -> IntermediateDelegation {
        IntermediateDelegation::pending(
            d,
            &d.staker_pk_hex,
            state,
            Utc.timestamp_opt(1_700_000_500, 0).unwrap(),
        )
    }

    fn txid(n: u8) -> Txid {
        Txid::from_byte_array([n; 32])
    }

    #[test]
    fn test_merge_order() {
        let remote = vec![
            delegation(1, DelegationState::Active),
            delegation(2, DelegationState::Unbonded),
        ];
        let local = vec![
            pending(&remote[1], IntermediateState::Withdrawal),
            pending(&remote[0], IntermediateState::Unbonding),
        ];

        let merged = merge(&remote, &local);
        let hashes: Vec<_> = merged.iter().map(|d| d.staking_tx_hash()).collect();
        assert_eq!(
            hashes,
            vec![
                remote[1].staking_tx_hash(),
                remote[0].staking_tx_hash(),
                remote[0].staking_tx_hash(),
                remote[1].staking_tx_hash(),
            ]
        );
        assert_eq!(merged[0].state, DelegationState::IntermediateWithdrawal);
        assert_eq!(merged[1].state, DelegationState::IntermediateUnbonding);
    }

    #[test]
    fn test_merge_with_empty_remote() {
        let d = delegation(1, DelegationState::Active);
        let local = vec![pending(&d, IntermediateState::Unbonding)];
        let merged = merge(&[], &local);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].state, DelegationState::IntermediateUnbonding);
    }

    #[test]
    fn test_reconcile_eviction_table() {
        // (remote state, record survives)
        let cases = [
            (DelegationState::Active, true),
            (DelegationState::UnbondingRequested, false),
            (DelegationState::Unbonding, true),
            (DelegationState::Unbonded, true),
            (DelegationState::Withdrawn, false),
        ];

        for (state, survives) in cases {
            let d = delegation(1, state);
            let local = vec![pending(&d, IntermediateState::Unbonding)];
            let kept = reconcile(&[d], &local);
            assert_eq!(kept.len() == 1, survives, "remote state {state}");
        }
    }

    #[test]
    fn test_reconcile_ignores_unrelated_remote() {
        let mine = delegation(1, DelegationState::Active);
        let other = delegation(2, DelegationState::Withdrawn);
        let local = vec![pending(&mine, IntermediateState::Withdrawal)];

        assert_eq!(reconcile(&[other], &local), local);
    }

    #[test]
    fn test_record_pending_replaces_same_hash() {
        let a = delegation(1, DelegationState::Active);
        let b = delegation(2, DelegationState::Unbonded);
        let local = vec![
            pending(&b, IntermediateState::Withdrawal),
            pending(&a, IntermediateState::Unbonding),
        ];

        let updated = record_pending(&local, pending(&a, IntermediateState::Withdrawal));
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].staking_tx_hash(), a.staking_tx_hash());
        assert_eq!(updated[0].state, IntermediateState::Withdrawal);
        assert_eq!(updated[1], local[0]);
    }

    #[test]
    fn test_pending_state() {
        let a = delegation(1, DelegationState::Active);
        let local = vec![pending(&a, IntermediateState::Unbonding)];
        assert_eq!(
            pending_state(&local, a.staking_tx_hash()),
            Some(IntermediateState::Unbonding)
        );
        assert_eq!(pending_state(&local, txid(9)), None);
    }

    #[test]
    fn test_available_transition() {
        // start height 150, timelock 150: expires at 300
        let cases = [
            (DelegationState::Active, None, 299, Some(TransitionKind::Unbond)),
            (DelegationState::Active, None, 300, Some(TransitionKind::Withdraw)),
            (
                DelegationState::Active,
                Some(IntermediateState::Unbonding),
                200,
                None,
            ),
            (DelegationState::UnbondingRequested, None, 200, None),
            (DelegationState::Unbonding, None, 200, None),
            (DelegationState::Unbonded, None, 200, Some(TransitionKind::Withdraw)),
            (
                DelegationState::Unbonded,
                Some(IntermediateState::Withdrawal),
                200,
                None,
            ),
            (DelegationState::Withdrawn, None, 200, None),
        ];

        for (state, pending, tip, expected) in cases {
            let d = delegation(1, state);
            assert_eq!(
                available_transition(&d, pending, tip),
                expected,
                "{state} pending={pending:?} tip={tip}"
            );
        }
    }

    #[test]
    fn test_merged_view_dedups() {
        let a = delegation(1, DelegationState::Active);
        let b = delegation(2, DelegationState::Active);
        let local = vec![pending(&a, IntermediateState::Unbonding)];

        let view = merged_view(&[a.clone(), b.clone()], &local);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].delegation.staking_tx_hash(), a.staking_tx_hash());
        assert_eq!(view[0].pending, Some(IntermediateState::Unbonding));
        assert_eq!(view[1].delegation, b);
        assert_eq!(view[1].pending, None);
    }

    fn arb_state() -> impl Strategy<Value = DelegationState> {
        proptest::sample::select(ALL_STATES.to_vec())
    }

    fn arb_intermediate() -> impl Strategy<Value = IntermediateState> {
        prop_oneof![
            Just(IntermediateState::Unbonding),
            Just(IntermediateState::Withdrawal)
        ]
    }

    proptest! {
        #[test]
        fn reconcile_is_idempotent_and_evicts_exactly_confirmed(
            remote_seed in proptest::collection::vec((0u32..6, arb_state()), 0..6),
            local_seed in proptest::collection::vec((0u32..6, arb_intermediate()), 0..6),
        ) {
            let remote: Vec<_> = remote_seed
                .iter()
                .map(|(nonce, state)| delegation(*nonce, *state))
                .collect();
            let local: Vec<_> = local_seed
                .iter()
                .map(|(nonce, state)| {
                    pending(&delegation(*nonce, DelegationState::Active), *state)
                })
                .collect();

            let once = reconcile(&remote, &local);
            let twice = reconcile(&remote, &once);
            prop_assert_eq!(&once, &twice);

            for record in &local {
                let confirmed = remote.iter().any(|d| {
                    d.staking_tx_hash() == record.staking_tx_hash() && confirms_pending(d.state)
                });
                prop_assert_eq!(once.contains(record), !confirmed);
            }
        }

        #[test]
        fn merge_keeps_local_then_remote(
            remote_nonces in proptest::collection::vec(0u32..6, 0..6),
            local_nonces in proptest::collection::vec(0u32..6, 0..6),
        ) {
            let remote: Vec<_> = remote_nonces
                .iter()
                .map(|n| delegation(*n, DelegationState::Active))
                .collect();
            let local: Vec<_> = local_nonces
                .iter()
                .map(|n| {
                    pending(
                        &delegation(*n, DelegationState::Active),
                        IntermediateState::Unbonding,
                    )
                })
                .collect();

            let merged = merge(&remote, &local);
            prop_assert_eq!(merged.len(), local.len() + remote.len());
            for (m, l) in merged.iter().zip(&local) {
                prop_assert_eq!(m.staking_tx_hash(), l.staking_tx_hash());
            }
            prop_assert_eq!(&merged[local.len()..], &remote[..]);
        }
    }
}
