use thiserror::Error;

/// Errors produced by `sbl-core`.
#[derive(Error, Debug)]
pub enum SblError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("passphrase did not decrypt the share (wrong passphrase or corrupt file)")]
    BadPassphrase,

    #[error("invalid secret: {0}")]
    InvalidSecret(String),

    #[error("verification failed: {0}")]
    VerificationFailure(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("invalid field operation: {0}")]
    InvalidOperation(String),

    #[error("invalid record at offset {0}: {1}")]
    InvalidRecord(usize, String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}
