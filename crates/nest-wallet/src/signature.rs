//! Ethereum personal-message signatures (`personal_sign` / EIP-191).
//!
//! A wallet signs `keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)`
//! and returns 65 bytes `r || s || v`. Recovering the public key from that
//! signature and hashing it gives the signer's address, so no key needs to be
//! registered up front.

use alloy::primitives::keccak256;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use thiserror::Error;
use tracing::debug;

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Length of an `r || s || v` signature.
const SIGNATURE_LEN: usize = 65;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature is not valid hex")]
    Encoding,

    #[error("signature must be 65 bytes, got {0}")]
    Length(usize),

    #[error("invalid recovery byte {0}")]
    RecoveryByte(u8),

    #[error("public key recovery failed")]
    Recovery,
}

/// EIP-191 digest of `message` as produced by `personal_sign`.
pub fn personal_message_hash(message: &str) -> [u8; 32] {
    let mut data = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 20 + message.len());
    data.extend_from_slice(PERSONAL_MESSAGE_PREFIX.as_bytes());
    data.extend_from_slice(message.len().to_string().as_bytes());
    data.extend_from_slice(message.as_bytes());
    keccak256(&data).0
}

/// Lowercase `0x`-prefixed address of a secp256k1 public key: the last 20
/// bytes of the keccak256 hash of the uncompressed point (without its 0x04 tag).
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recovers the address that signed `message`.
pub fn recover_address(message: &str, signature: &str) -> Result<String, SignatureError> {
    let signature = signature.trim();
    let encoded = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(encoded).map_err(|_| SignatureError::Encoding)?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(SignatureError::Length(bytes.len()));
    }

    // Wallets emit v as 27/28, some libraries as 0/1
    let v = bytes[64];
    let parity = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(SignatureError::RecoveryByte(other)),
    };
    let mut recovery_id = RecoveryId::from_byte(parity).ok_or(SignatureError::RecoveryByte(v))?;

    let mut sig = Signature::from_slice(&bytes[..64]).map_err(|_| SignatureError::Recovery)?;

    // k256 only accepts low-s; flipping s flips the y parity
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = personal_message_hash(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|_| SignatureError::Recovery)?;

    Ok(address_of(&key))
}

/// True when `signature` over `message` recovers to `address`, compared
/// case-insensitively. Malformed input fails closed.
pub fn verify(address: &str, signature: &str, message: &str) -> bool {
    match recover_address(message, signature) {
        Ok(recovered) => recovered.eq_ignore_ascii_case(address.trim()),
        Err(e) => {
            debug!("Signature rejected: {}", e);
            false
        }
    }
}

/// Signs `message` the way `personal_sign` does and returns the `0x`-prefixed
/// hex signature with v in {27, 28}.
pub fn sign_personal_message(key: &SigningKey, message: &str) -> Result<String, SignatureError> {
    let digest = personal_message_hash(message);
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|_| SignatureError::Recovery)?;

    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    Ok(format!("0x{}", hex::encode(bytes)))
}
