use anyhow::{anyhow, Context};
use bitcoin::{
    hashes::Hash,
    psbt::Psbt,
    secp256k1::{schnorr::Signature, Keypair, Message},
    sighash::{Prevouts, SighashCache},
    taproot::TapLeafHash,
    TapSighashType, Transaction, TxOut, Witness, XOnlyPublicKey,
};
use secp256k1::SECP256K1;

/// Signs input 0 of a single-input PSBT through the one script leaf it carries.
///
/// Returns the finalized transaction with witness `[signature, leaf script, control block]`.
pub fn sign_script_path(psbt: &Psbt, keypair: &Keypair) -> anyhow::Result<Transaction> {
    let input = psbt.inputs.first().context("psbt has no inputs")?;
    let prevout = input
        .witness_utxo
        .clone()
        .context("psbt input lacks witness utxo")?;
    let (control_block, (leaf, leaf_version)) = input
        .tap_scripts
        .iter()
        .next()
        .ok_or_else(|| anyhow!("psbt input carries no tap script"))?;

    let leaf_hash = TapLeafHash::from_script(leaf, *leaf_version);
    let msg = script_path_message(&psbt.unsigned_tx, prevout, leaf_hash)?;
    let signature = SECP256K1.sign_schnorr_no_aux_rand(&msg, keypair);

    let mut tx = psbt.unsigned_tx.clone();
    tx.input[0].witness = Witness::from_slice(&[
        signature.serialize().to_vec(),
        leaf.to_bytes(),
        control_block.serialize(),
    ]);
    Ok(tx)
}

/// Checks that `signature` is a valid script-path signature by `pk` over input 0 of `tx`.
pub fn verify_script_path_signature(
    tx: &Transaction,
    prevout: TxOut,
    leaf_hash: TapLeafHash,
    signature: &[u8],
    pk: &XOnlyPublicKey,
) -> anyhow::Result<()> {
    let msg = script_path_message(tx, prevout, leaf_hash)?;
    let signature = Signature::from_slice(signature)?;
    SECP256K1.verify_schnorr(&signature, &msg, pk)?;
    Ok(())
}

fn script_path_message(
    tx: &Transaction,
    prevout: TxOut,
    leaf_hash: TapLeafHash,
) -> anyhow::Result<Message> {
    let prevouts = vec![prevout];
    let mut cache = SighashCache::new(tx);
    let sighash = cache.taproot_script_spend_signature_hash(
        0,
        &Prevouts::All(&prevouts),
        leaf_hash,
        TapSighashType::Default,
    )?;
    Ok(Message::from_digest(sighash.to_byte_array()))
}
