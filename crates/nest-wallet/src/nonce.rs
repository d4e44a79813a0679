use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;

use crate::error::WalletAuthError;

/// Tag prepended to every challenge so users recognise what they are signing.
pub const NONCE_PREFIX: &str = "NTUNEST-";

/// Random bytes per challenge (hex-encoded to 16 characters).
const NONCE_BYTES: usize = 8;

pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceEntry {
    pub address: String,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
}

/// Outstanding login challenges, at most one per (lowercased) address.
///
/// Issuing again for an address replaces the previous challenge, so of two
/// interleaved logins for the same wallet only the later one can succeed.
pub struct NonceStore {
    entries: Mutex<HashMap<String, NonceEntry>>,
    ttl: Duration,
}

/// Lowercased, trimmed address, or `None` when nothing is left.
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    format!("{NONCE_PREFIX}{}", hex::encode(bytes))
}

impl NonceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Entries are plain data; a panic elsewhere cannot leave them half-written.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, NonceEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &NonceEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.issued_at).to_std() {
            Ok(age) => age >= self.ttl,
            // issued_at in the future: clock went backwards, treat as fresh
            Err(_) => false,
        }
    }

    pub fn issue(&self, address: &str) -> Result<String, WalletAuthError> {
        self.issue_at(address, Utc::now())
    }

    pub fn issue_at(&self, address: &str, now: DateTime<Utc>) -> Result<String, WalletAuthError> {
        let address = normalize_address(address).ok_or(WalletAuthError::MissingParameter("address"))?;
        let nonce = generate_nonce();

        self.entries().insert(
            address.clone(),
            NonceEntry {
                address,
                nonce: nonce.clone(),
                issued_at: now,
            },
        );

        Ok(nonce)
    }

    /// Removes and returns the live challenge for `address`. An expired entry
    /// is removed too but reported as absent.
    pub fn take(&self, address: &str) -> Option<NonceEntry> {
        self.take_at(address, Utc::now())
    }

    pub fn take_at(&self, address: &str, now: DateTime<Utc>) -> Option<NonceEntry> {
        let address = normalize_address(address)?;
        let entry = self.entries().remove(&address)?;
        if self.is_expired(&entry, now) {
            None
        } else {
            Some(entry)
        }
    }

    /// Drops every expired challenge. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NonceStore {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_has_prefix_and_hex_body() {
        let store = NonceStore::default();
        let nonce = store.issue("0xABC").unwrap();

        let body = nonce.strip_prefix(NONCE_PREFIX).unwrap();
        assert_eq!(body.len(), NONCE_BYTES * 2);
        assert!(body.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn empty_address_is_rejected() {
        let store = NonceStore::default();
        assert_eq!(store.issue("   "), Err(WalletAuthError::MissingParameter("address")));
        assert!(store.is_empty());
    }

    #[test]
    fn entries_are_keyed_by_lowercased_address() {
        let store = NonceStore::default();
        let nonce = store.issue("0xABCdef").unwrap();

        let entry = store.take("0xabcDEF").unwrap();
        assert_eq!(entry.address, "0xabcdef");
        assert_eq!(entry.nonce, nonce);
    }

    #[test]
    fn reissue_replaces_previous_nonce() {
        let store = NonceStore::default();
        let first = store.issue("0xabc").unwrap();
        let second = store.issue("0xabc").unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 1);

        assert_eq!(store.take("0xabc").unwrap().nonce, second);
    }

    #[test]
    fn take_consumes_the_nonce() {
        let store = NonceStore::default();
        store.issue("0xabc").unwrap();

        assert!(store.take("0xabc").is_some());
        assert!(store.take("0xabc").is_none());
    }

    #[test]
    fn expired_nonce_is_not_returned() {
        let store = NonceStore::new(Duration::from_secs(300));
        let issued = Utc::now();
        store.issue_at("0xabc", issued).unwrap();

        let later = issued + chrono::Duration::seconds(301);
        assert!(store.take_at("0xabc", later).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let store = NonceStore::new(Duration::from_secs(300));
        let now = Utc::now();
        store.issue_at("0xold", now - chrono::Duration::seconds(600)).unwrap();
        store.issue_at("0xnew", now).unwrap();

        assert_eq!(store.sweep_expired_at(now), 1);
        assert!(store.take_at("0xold", now).is_none());
        assert!(store.take_at("0xnew", now).is_some());
    }
}
