//! Folds an externally produced signature into a broadcastable transaction.

use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::{psbt::Psbt, Transaction, Txid};
use stakeline_primitives::{decode_tx_hex, encode_tx_hex};
use stakeline_tx_builder::Mismatch;
use tracing::*;

use crate::{api::ClientError, errors::SigningError};

/// External signer holding the staker's key.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait PsbtSigner: Send + Sync {
    /// Signs and finalizes a PSBT given as hex, returning the signed transaction as hex.
    async fn sign_psbt(&self, psbt_hex: String) -> Result<String, ClientError>;
}

/// A finalized transaction returned by the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    tx: Transaction,
}

impl SignedTx {
    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }

    pub fn tx_hex(&self) -> String {
        encode_tx_hex(&self.tx)
    }

    /// The staker's signature: first witness element of the first input, hex.
    pub fn staker_signature_hex(&self) -> Result<String, SigningError> {
        self.tx
            .input
            .first()
            .and_then(|input| input.witness.nth(0))
            .map(hex::encode)
            .ok_or(SigningError::MissingWitness)
    }

    pub fn into_tx(self) -> Transaction {
        self.tx
    }
}

#[derive(Debug)]
pub struct SigningCoordinator<TSigner> {
    signer: Arc<TSigner>,
}

impl<TSigner> Clone for SigningCoordinator<TSigner> {
    fn clone(&self) -> Self {
        Self {
            signer: self.signer.clone(),
        }
    }
}

impl<TSigner: PsbtSigner> SigningCoordinator<TSigner> {
    pub fn new(signer: Arc<TSigner>) -> Self {
        Self { signer }
    }

    /// Hands `psbt` to the signer and checks that what comes back is the same transaction,
    /// signed.
    pub async fn sign(&self, psbt: &Psbt) -> Result<SignedTx, SigningError> {
        let expected = psbt.unsigned_tx.compute_txid();
        debug!(txid = %expected, "requesting signature");

        let signed_hex = self
            .signer
            .sign_psbt(psbt.serialize_hex())
            .await
            .map_err(SigningError::Signer)?;
        let tx = decode_tx_hex(&signed_hex).map_err(SigningError::Decode)?;

        let got = tx.compute_txid();
        if got != expected {
            return Err(SigningError::TxidMismatch(Mismatch { expected, got }));
        }
        if tx.input.first().is_none_or(|input| input.witness.is_empty()) {
            return Err(SigningError::MissingWitness);
        }

        Ok(SignedTx { tx })
    }
}
