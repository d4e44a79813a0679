use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::WalletAuthError;
use crate::nonce::{NonceStore, normalize_address};
use crate::signature;

/// A lowercased wallet address whose owner just proved control of its key.
/// Only [`WalletAuthenticator::verify`] produces one, so anything taking it
/// cannot run before a successful signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAddress(String);

impl VerifiedAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerifiedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owns the challenge table and runs the nonce → signature half of a
/// wallet login. The signed message is the bare nonce.
#[derive(Default)]
pub struct WalletAuthenticator {
    nonces: NonceStore,
}

impl WalletAuthenticator {
    pub fn new(nonce_ttl: Duration) -> Self {
        Self {
            nonces: NonceStore::new(nonce_ttl),
        }
    }

    pub fn nonces(&self) -> &NonceStore {
        &self.nonces
    }

    pub fn issue_nonce(&self, address: &str) -> Result<String, WalletAuthError> {
        self.nonces.issue(address)
    }

    /// Checks `signature` against the outstanding nonce for `address`. The
    /// nonce is consumed whatever the outcome, so a failed attempt has to
    /// start over with a fresh one.
    pub fn verify(&self, address: &str, signature: &str) -> Result<VerifiedAddress, WalletAuthError> {
        let address = normalize_address(address).ok_or(WalletAuthError::MissingParameter("address"))?;
        if signature.trim().is_empty() {
            return Err(WalletAuthError::MissingParameter("signature"));
        }

        let entry = self
            .nonces
            .take(&address)
            .ok_or(WalletAuthError::NoPendingNonce)?;

        if !signature::verify(&address, signature, &entry.nonce) {
            warn!(address = %address, "Wallet signature did not match");
            return Err(WalletAuthError::SignatureInvalid);
        }

        info!(address = %address, "Wallet signature verified");
        Ok(VerifiedAddress(address))
    }

    pub fn sweep_expired(&self) -> usize {
        self.nonces.sweep_expired()
    }
}
