//! Wallet login: nonce challenges, personal-message signature recovery and
//! the authenticator that ties them together.

pub mod authenticator;
pub mod error;
pub mod nonce;
pub mod signature;

pub use authenticator::{VerifiedAddress, WalletAuthenticator};
pub use error::WalletAuthError;
pub use nonce::{NonceEntry, NonceStore};
