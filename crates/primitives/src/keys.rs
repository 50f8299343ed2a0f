use bitcoin::{secp256k1::PublicKey, XOnlyPublicKey};

use crate::errors::ParseError;

/// Parses a public key given either as 32-byte x-only hex or as 33-byte compressed hex.
///
/// Covenant keys are published in compressed form while staker and finality provider keys
/// travel without the parity byte. Tapscript only ever commits to the x-only form.
pub fn parse_xonly_pk(pk_hex: &str) -> Result<XOnlyPublicKey, ParseError> {
    let bytes = hex::decode(pk_hex)?;
    match bytes.len() {
        32 => XOnlyPublicKey::from_slice(&bytes)
            .map_err(|e| ParseError::InvalidPublicKey(e.to_string())),
        33 => PublicKey::from_slice(&bytes)
            .map(|pk| pk.x_only_public_key().0)
            .map_err(|e| ParseError::InvalidPublicKey(e.to_string())),
        len => Err(ParseError::InvalidKeyLength(len)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPRESSED: &str = "0250929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0";

    #[test]
    fn test_compressed_and_xonly_agree() {
        let from_compressed = parse_xonly_pk(COMPRESSED).unwrap();
        let from_xonly = parse_xonly_pk(&COMPRESSED[2..]).unwrap();
        assert_eq!(from_compressed, from_xonly);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = parse_xonly_pk("abcd").unwrap_err();
        assert_eq!(err, ParseError::InvalidKeyLength(2));
    }

    #[test]
    fn test_rejects_bad_hex() {
        let err = parse_xonly_pk("zz").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHex(_)));
    }
}
