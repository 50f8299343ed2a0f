//! Default values of optional configuration fields.

use std::path::PathBuf;

use bitcoin::Network;

/// Default fee of withdrawal transactions, in satoshis.
pub const DEFAULT_WITHDRAWAL_FEE_SAT: u64 = 1_000;

/// Default directory of the intermediate record store.
pub const DEFAULT_STORE_DIRECTORY: &str = "intermediate";

/// Default prefix of rotated log files.
pub const DEFAULT_LOG_FILE_PREFIX: &str = "stakeline";

pub(crate) fn network() -> Network {
    Network::Signet
}

pub(crate) fn withdrawal_fee_sat() -> u64 {
    DEFAULT_WITHDRAWAL_FEE_SAT
}

pub(crate) fn store_directory() -> PathBuf {
    DEFAULT_STORE_DIRECTORY.into()
}
