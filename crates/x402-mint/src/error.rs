use thiserror::Error;

/// Errors returned by the mint sequence and its collaborators.
///
/// The variants follow where a failure came from, not how it is reported:
/// the HTTP layer collapses all of them into one opaque minting failure.
#[derive(Debug, Error)]
pub enum MintError {
    /// Missing credentials, or a contract that fails the trust checks.
    #[error("config error: {0}")]
    Config(String),

    /// RPC read/write failure, revert, or timeout.
    #[error("chain error: {0}")]
    Chain(String),

    /// Malformed amount or unsupported chain identifier.
    #[error("invalid input: {0}")]
    Input(String),
}

/// Errors from the x402 payment wire layer.
#[derive(Debug, Error)]
pub enum X402Error {
    #[error("invalid payment: {0}")]
    InvalidPayment(String),

    #[error("http error: {0}")]
    HttpError(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
