use std::{fmt, io};

use bitcoin::Txid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stakeline_params::ParamsError;
use stakeline_primitives::ParseError;
use stakeline_scripts::ScriptError;
use stakeline_tx_builder::{Mismatch, TxBuildError};
use thiserror::Error;

use crate::api::ClientError;

/// A user-initiated lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Unbond,
    Withdraw,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbond => f.write_str("unbond"),
            Self::Withdraw => f.write_str("withdraw"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransitionError {
    /// A collaborator needed before any transaction was built did not answer.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("delegation {0} not found")]
    DelegationNotFound(Txid),

    #[error("delegation {0} is not eligible for unbonding")]
    NotEligible(Txid),

    #[error("params: {0}")]
    Params(#[from] ParamsError),

    #[error("script: {0}")]
    Script(#[from] ScriptError),

    #[error("tx build: {0}")]
    TxBuild(#[from] TxBuildError),

    #[error("signing: {0}")]
    Signing(#[from] SigningError),

    /// Submission failed after signing. `txid` identifies the signed transaction so the
    /// caller can check whether it landed before resubmitting.
    #[error("submission of {txid} failed: {reason}")]
    SubmissionFailed { txid: Txid, reason: String },

    /// `txid` was accepted for submission but its pending record could not be written. The
    /// delegation still looks untouched locally until the remote list catches up.
    #[error("{txid} was submitted but recording it failed: {source}")]
    RecordFailed {
        txid: Txid,
        #[source]
        source: StoreError,
    },

    #[error("a transition on {0} is already in progress")]
    TransitionInProgress(Txid),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("signer: {0}")]
    Signer(ClientError),

    #[error("signed transaction does not decode: {0}")]
    Decode(ParseError),

    #[error("signed transaction commits to another txid {0}")]
    TxidMismatch(Mismatch<Txid>),

    #[error("signed transaction carries no witness on its first input")]
    MissingWitness,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
}

/// What the guarded entry point reports when a transition fails.
#[derive(Debug, Error)]
#[error("{kind} of {staking_tx_hash} failed at {at}: {error}")]
pub struct TransitionFailure {
    pub kind: TransitionKind,
    pub staking_tx_hash: Txid,
    #[source]
    pub error: TransitionError,
    pub at: DateTime<Utc>,
}

impl TransitionFailure {
    /// Whether the same transition can simply be run again. Nothing was submitted.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.error,
            TransitionError::DataUnavailable(_)
                | TransitionError::TransitionInProgress(_)
                | TransitionError::Signing(SigningError::Signer(_))
                | TransitionError::Store(_)
        )
    }

    /// A signed transaction may have reached the network. The caller must refresh the remote
    /// list and check for `submitted_txid` before running the transition again.
    pub fn needs_reconcile(&self) -> bool {
        self.submitted_txid().is_some()
    }

    pub fn submitted_txid(&self) -> Option<Txid> {
        match &self.error {
            TransitionError::SubmissionFailed { txid, .. }
            | TransitionError::RecordFailed { txid, .. } => Some(*txid),
            _ => None,
        }
    }
}
