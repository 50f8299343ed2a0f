//! Deterministic keys, parameter histories, delegations and signers for tests.

pub mod delegation;
pub mod keys;
pub mod params;
pub mod signing;

pub use delegation::{staking_fixture, DelegationFixture};
pub use keys::{keypair, regtest_address, xonly, xonly_hex};
pub use params::{params_history, params_version};
pub use signing::{sign_script_path, verify_script_path_signature};
