use tracing::{debug, error, info};
use uuid::Uuid;

use nest_db::models::UserRow;
use nest_db::{Database, StoreError, StoreResult};
use nest_wallet::{VerifiedAddress, WalletAuthError};

/// Hex characters of the address used for the default username.
const USERNAME_LEN: usize = 8;
/// Longer slice used when the short username is already taken.
const FALLBACK_USERNAME_LEN: usize = 16;

/// `0xAbCd1234...` -> `abcd1234`.
pub fn derive_username(address: &str) -> String {
    address_body(address).chars().take(USERNAME_LEN).collect()
}

pub fn fallback_username(address: &str) -> String {
    let body = address_body(address);
    if body.chars().count() > USERNAME_LEN {
        body.chars().take(FALLBACK_USERNAME_LEN).collect()
    } else {
        format!("wallet_{body}")
    }
}

fn address_body(address: &str) -> String {
    let lower = address.to_ascii_lowercase();
    lower.strip_prefix("0x").unwrap_or(&lower).to_string()
}

/// Returns the user bound to `address`, registering one on first login.
///
/// Two first logins for the same wallet can race; the loser's insert hits the
/// unique index and it re-reads the winner's row, so both end up with the same
/// account. A conflict that is not explained by the wallet column means the
/// derived username belongs to somebody else, and the insert is retried once
/// under the longer fallback name.
pub fn resolve_or_create_user(db: &Database, address: &VerifiedAddress) -> Result<UserRow, WalletAuthError> {
    let address = address.as_str();

    if let Some(user) = lookup(db, address)? {
        debug!(user_id = %user.id, "Wallet already registered");
        return Ok(user);
    }

    register_wallet(db, address)
}

/// Inserts a user for a wallet that had none at lookup time. Losing the
/// insert race to another login yields the winner's row.
pub(crate) fn register_wallet(db: &Database, address: &str) -> Result<UserRow, WalletAuthError> {
    let username = derive_username(address);
    match register(db, address, &username) {
        Ok(user) => return Ok(user),
        Err(StoreError::Conflict(detail)) => {
            debug!("Wallet registration conflict for {}: {}", address, detail);
        }
        Err(e) => return Err(classify(e)),
    }

    if let Some(user) = lookup(db, address)? {
        info!(user_id = %user.id, "Concurrent wallet registration resolved");
        return Ok(user);
    }

    let fallback = fallback_username(address);
    info!("Username '{}' taken, registering wallet as '{}'", username, fallback);
    match register(db, address, &fallback) {
        Ok(user) => Ok(user),
        Err(StoreError::Conflict(detail)) => lookup(db, address)?.ok_or_else(|| {
            error!("Could not register wallet {}: {}", address, detail);
            WalletAuthError::RegistrationFailed
        }),
        Err(e) => Err(classify(e)),
    }
}

fn lookup(db: &Database, address: &str) -> Result<Option<UserRow>, WalletAuthError> {
    db.get_user_by_wallet(address).map_err(classify)
}

fn register(db: &Database, address: &str, username: &str) -> StoreResult<UserRow> {
    let id = Uuid::new_v4().to_string();
    db.create_wallet_user(&id, username, address)?;
    info!(user_id = %id, username = %username, "Registered wallet user");
    db.get_user_by_id(&id)?.ok_or(StoreError::NotFound)
}

fn classify(err: StoreError) -> WalletAuthError {
    match err {
        StoreError::Schema(detail) => {
            error!("Users table is missing wallet columns: {}", detail);
            WalletAuthError::SchemaRepairFailed
        }
        other => {
            error!("Wallet user lookup failed: {}", other);
            WalletAuthError::RegistrationFailed
        }
    }
}
