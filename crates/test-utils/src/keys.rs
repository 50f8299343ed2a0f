use bitcoin::{
    secp256k1::{Keypair, SecretKey},
    Address, Network, XOnlyPublicKey,
};
use secp256k1::SECP256K1;

pub const STAKER_SEED: u8 = 1;
pub const FINALITY_PROVIDER_SEED: u8 = 2;

/// Seeds of the covenant committee of the first parameter version.
pub const COVENANT_SEEDS: [u8; 3] = [10, 11, 12];

/// Seeds of the rotated covenant committee of the second parameter version.
pub const ROTATED_COVENANT_SEEDS: [u8; 3] = [20, 21, 22];

/// Keypair whose secret key is `seed` repeated 32 times.
pub fn keypair(seed: u8) -> Keypair {
    let sk = SecretKey::from_slice(&[seed; 32]).expect("non-zero seed below curve order");
    Keypair::from_secret_key(SECP256K1, &sk)
}

pub fn xonly(seed: u8) -> XOnlyPublicKey {
    keypair(seed).x_only_public_key().0
}

pub fn xonly_hex(seed: u8) -> String {
    xonly(seed).to_string()
}

/// Key-path P2TR regtest address controlled by `seed`.
pub fn regtest_address(seed: u8) -> String {
    Address::p2tr(SECP256K1, xonly(seed), None, Network::Regtest).to_string()
}
