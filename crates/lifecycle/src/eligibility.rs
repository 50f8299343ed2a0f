use std::sync::Arc;

use bitcoin::Txid;
use tracing::*;

use crate::{api::StakingApi, errors::TransitionError};

/// Asks the remote oracle whether a delegation may be unbonded. Withdrawal is not gated.
#[derive(Debug)]
pub struct EligibilityGate<TApi> {
    api: Arc<TApi>,
}

impl<TApi: StakingApi> EligibilityGate<TApi> {
    pub fn new(api: Arc<TApi>) -> Self {
        Self { api }
    }

    pub async fn check_unbond_eligible(
        &self,
        staking_tx_hash: Txid,
    ) -> Result<(), TransitionError> {
        match self.api.unbonding_eligibility(staking_tx_hash).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(%staking_tx_hash, "unbonding not eligible");
                Err(TransitionError::NotEligible(staking_tx_hash))
            }
            Err(e) => Err(TransitionError::DataUnavailable(format!(
                "unbonding eligibility: {e}"
            ))),
        }
    }
}
