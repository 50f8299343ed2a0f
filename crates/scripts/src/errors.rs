use bitcoin::XOnlyPublicKey;
use stakeline_params::ParamsError;
use stakeline_primitives::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("invalid staker key: {0}")]
    InvalidStakerKey(ParseError),

    #[error("invalid finality provider key: {0}")]
    InvalidFinalityProviderKey(ParseError),

    #[error("params: {0}")]
    Params(#[from] ParamsError),

    #[error("timelock must be non-zero")]
    ZeroTimelock,

    #[error("threshold {threshold} out of range for {keys} keys")]
    ThresholdOutOfRange { threshold: u32, keys: usize },

    #[error("key {0} appears more than once")]
    DuplicateKey(XOnlyPublicKey),

    #[error("taproot construction: {0}")]
    Taproot(String),
}
