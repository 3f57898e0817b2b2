use rust_decimal::Decimal;
use std::fmt;

/// Unified error taxonomy for every engine entry point.
#[derive(Debug)]
pub enum EngineError {
    /// Price fell outside the tick-size bounds. Raised before any network
    /// call is made.
    InvalidPrice {
        price: Decimal,
        min: Decimal,
        max: Decimal,
    },
    /// The relevant book side was empty.
    NoLiquidity { token_id: String },
    /// The book was exhausted before the requested amount was matched (FOK).
    NoMatch { token_id: String },
    /// No contract configuration exists for the active chain.
    UnsupportedChain { chain_id: u64 },
    /// No API credentials stored for this account. Run create/derive first.
    MissingCredentials { address: String },
    /// The typed-data signer refused or failed.
    Signing(String),
    /// The exchange answered with a non-success status.
    Api { status: u16, body: String },
    /// Transport-level failure (connect, timeout, body decode).
    Transport(String),
    /// Credential store could not be read or written.
    Store(String),
    /// The transaction submitter rejected the request.
    Submission(String),
    /// The allowance transaction was never confirmed within the deadline.
    ConfirmationTimeout { tx_id: String },
    /// Malformed input or payload.
    Validation(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidPrice { price, min, max } => {
                write!(f, "invalid price ({}), min: {} - max: {}", price, min, max)
            }
            EngineError::NoLiquidity { token_id } => {
                write!(f, "no liquidity for token {}", token_id)
            }
            EngineError::NoMatch { token_id } => {
                write!(f, "no match for token {}", token_id)
            }
            EngineError::UnsupportedChain { chain_id } => {
                write!(f, "chain {} is not supported by Polymarket", chain_id)
            }
            EngineError::MissingCredentials { address } => {
                write!(f, "no API credentials stored for {}", address)
            }
            EngineError::Signing(msg) => write!(f, "signing failed: {}", msg),
            EngineError::Api { status, body } => {
                write!(f, "exchange rejected request: {} - {}", status, body)
            }
            EngineError::Transport(msg) => write!(f, "transport error: {}", msg),
            EngineError::Store(msg) => write!(f, "credential store error: {}", msg),
            EngineError::Submission(msg) => write!(f, "transaction submission failed: {}", msg),
            EngineError::ConfirmationTimeout { tx_id } => {
                write!(f, "timed out waiting for confirmation of tx {}", tx_id)
            }
            EngineError::Validation(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Transport(format!("json: {}", e))
    }
}
