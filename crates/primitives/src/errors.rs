//! Errors during parsing of hex-encoded primitives.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Keys are accepted as 32-byte x-only or 33-byte compressed encodings.
    #[error("invalid public key length: expected 32 or 33 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid transaction encoding: {0}")]
    InvalidTransaction(String),
}

impl From<hex::FromHexError> for ParseError {
    fn from(e: hex::FromHexError) -> Self {
        ParseError::InvalidHex(e.to_string())
    }
}
