use std::fmt::Debug;

use bitcoin::{Amount, ScriptBuf, Txid};
use stakeline_primitives::ParseError;
use stakeline_scripts::ScriptError;
use thiserror::Error;

/// A generic "expected vs got" error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("(expected {expected:?}, got {got:?})")]
pub struct Mismatch<T>
where
    T: Debug + Clone,
{
    pub expected: T,
    pub got: T,
}

/// Why a source output does not match the scripts rebuilt for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MismatchReason {
    #[error("transaction has only {outputs} outputs")]
    OutputIndexOutOfRange { outputs: usize },

    #[error("output script differs from the rebuilt commitment {0}")]
    OutputScript(Mismatch<ScriptBuf>),

    #[error("spend leaf is not committed in the rebuilt tree")]
    LeafNotCommitted,

    #[error("spend leaf is not a timelock script")]
    NotTimelockScript,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxBuildError {
    /// The rebuilt scripts do not commit to the output being spent. Usually the wrong
    /// parameter version was used.
    #[error("output {vout} of {txid}: {reason}")]
    ScriptMismatch {
        txid: Txid,
        vout: u32,
        reason: MismatchReason,
    },

    #[error("fee {fee} leaves nothing of {value}")]
    FeeExceedsValue { value: Amount, fee: Amount },

    #[error("invalid destination address: {0}")]
    InvalidAddress(String),

    #[error("malformed source transaction: {0}")]
    MalformedTx(#[from] ParseError),

    #[error("script: {0}")]
    Script(#[from] ScriptError),

    #[error("psbt: {0}")]
    Psbt(String),
}
