use thiserror::Error;

/// Failures of a wallet login attempt. Every variant ends the attempt; the
/// client restarts by requesting a new nonce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletAuthError {
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("no pending nonce for this address, request one first")]
    NoPendingNonce,

    #[error("invalid signature")]
    SignatureInvalid,

    #[error("registration failed")]
    RegistrationFailed,

    #[error("schema repair failed")]
    SchemaRepairFailed,
}
