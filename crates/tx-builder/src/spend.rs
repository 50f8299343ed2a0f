//! Single-input script-path spends shared by every construction path.

use bitcoin::{
    absolute::LockTime,
    psbt::Psbt,
    taproot::{LeafVersion, TaprootSpendInfo},
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};
use stakeline_scripts::{p2tr_script, parse_timelock_script};

use crate::errors::{Mismatch, MismatchReason, TxBuildError};

/// The output being spent and the tree it must commit to.
pub(crate) struct SpendInput<'a> {
    pub(crate) source_tx: &'a Transaction,
    pub(crate) output_index: u32,
    pub(crate) spend_info: TaprootSpendInfo,
    pub(crate) leaf: &'a ScriptBuf,
}

impl SpendInput<'_> {
    fn mismatch(&self, reason: MismatchReason) -> TxBuildError {
        TxBuildError::ScriptMismatch {
            txid: self.source_tx.compute_txid(),
            vout: self.output_index,
            reason,
        }
    }

    /// Returns the prevout after checking it commits to the rebuilt tree.
    fn checked_prevout(&self) -> Result<&TxOut, TxBuildError> {
        let prevout = self
            .source_tx
            .output
            .get(self.output_index as usize)
            .ok_or_else(|| {
                self.mismatch(MismatchReason::OutputIndexOutOfRange {
                    outputs: self.source_tx.output.len(),
                })
            })?;

        let expected = p2tr_script(&self.spend_info);
        if prevout.script_pubkey != expected {
            return Err(self.mismatch(MismatchReason::OutputScript(Mismatch {
                expected,
                got: prevout.script_pubkey.clone(),
            })));
        }
        Ok(prevout)
    }

    /// Relative timelock of the spend leaf, as an input sequence.
    pub(crate) fn csv_sequence(&self) -> Result<Sequence, TxBuildError> {
        let (_, blocks) = parse_timelock_script(self.leaf)
            .ok_or_else(|| self.mismatch(MismatchReason::NotTimelockScript))?;
        Ok(Sequence::from_height(blocks))
    }

    /// Builds a version 2 PSBT spending the output through `leaf` into one output paying
    /// `script_pubkey` the prevout value minus `fee`.
    pub(crate) fn build_psbt(
        &self,
        sequence: Sequence,
        script_pubkey: ScriptBuf,
        fee: Amount,
    ) -> Result<Psbt, TxBuildError> {
        let prevout = self.checked_prevout()?;

        let value = prevout
            .value
            .checked_sub(fee)
            .filter(|v| *v > Amount::ZERO)
            .ok_or(TxBuildError::FeeExceedsValue {
                value: prevout.value,
                fee,
            })?;

        let leaf = (self.leaf.clone(), LeafVersion::TapScript);
        let control_block = self
            .spend_info
            .control_block(&leaf)
            .ok_or_else(|| self.mismatch(MismatchReason::LeafNotCommitted))?;

        let tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: self.source_tx.compute_txid(),
                    vout: self.output_index,
                },
                script_sig: ScriptBuf::new(),
                sequence,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value,
                script_pubkey,
            }],
        };

        let mut psbt =
            Psbt::from_unsigned_tx(tx).map_err(|e| TxBuildError::Psbt(e.to_string()))?;
        let input = &mut psbt.inputs[0];
        input.witness_utxo = Some(prevout.clone());
        input.tap_internal_key = Some(self.spend_info.internal_key());
        input.tap_merkle_root = self.spend_info.merkle_root();
        input.tap_scripts.insert(control_block, leaf);

        Ok(psbt)
    }
}
