//! Delegation lifecycle: reconciling remote and pending state, and driving the unbond and
//! withdraw transitions from eligibility check to submission.

mod actions;
mod api;
mod eligibility;
mod errors;
mod reconcile;
mod signing;
mod store;

pub use actions::{DelegationActions, FeeSchedule, StakerContext, DEFAULT_WITHDRAWAL_FEE};
#[cfg(feature = "test-utils")]
pub use api::{MockStakingApi, MockTxBroadcaster};
pub use api::{ClientError, StakingApi, TxBroadcaster, UnbondingRequest};
pub use eligibility::EligibilityGate;
pub use errors::{SigningError, StoreError, TransitionError, TransitionFailure, TransitionKind};
pub use reconcile::{
    available_transition, confirms_pending, merge, merged_view, pending_state, reconcile,
    record_pending, DelegationView,
};
#[cfg(feature = "test-utils")]
pub use signing::MockPsbtSigner;
pub use signing::{PsbtSigner, SignedTx, SigningCoordinator};
#[cfg(feature = "test-utils")]
pub use store::MockIntermediateStore;
pub use store::{FileIntermediateStore, IntermediateStore, MemoryIntermediateStore};
