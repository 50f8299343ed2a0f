use bitcoin::Amount;
use stakeline_params::ProtocolParamsVersion;

use crate::keys::{xonly_hex, COVENANT_SEEDS, ROTATED_COVENANT_SEEDS};

/// A 2-of-3 parameter version using the first covenant committee.
pub fn params_version(version: u32, activation_height: u64) -> ProtocolParamsVersion {
    ProtocolParamsVersion {
        version,
        activation_height,
        staking_cap_sat: Amount::from_sat(100_000_000),
        tag: "62627434".to_owned(),
        covenant_pks: COVENANT_SEEDS.iter().map(|s| xonly_hex(*s)).collect(),
        covenant_quorum: 2,
        unbonding_time: 101,
        unbonding_fee_sat: Amount::from_sat(1_000),
        max_staking_amount_sat: Amount::from_sat(10_000_000),
        min_staking_amount_sat: Amount::from_sat(10_000),
        max_staking_time_blocks: 64_000,
        min_staking_time_blocks: 100,
        confirmation_depth: 10,
    }
}

/// Two versions: v0 active from height 100, v1 from height 1000 with a rotated covenant
/// committee, a longer unbonding time and a higher unbonding fee.
pub fn params_history() -> Vec<ProtocolParamsVersion> {
    let v0 = params_version(0, 100);
    let v1 = ProtocolParamsVersion {
        covenant_pks: ROTATED_COVENANT_SEEDS.iter().map(|s| xonly_hex(*s)).collect(),
        unbonding_time: 144,
        unbonding_fee_sat: Amount::from_sat(2_000),
        ..params_version(1, 1_000)
    };
    vec![v0, v1]
}
