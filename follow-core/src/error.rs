//! # Core Error Types
//!
//! Centralized error definitions for the follow-core crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for follow-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error(transparent)]
    Client(ClientError),
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<LedgerError> for CoreError {
    fn from(e: LedgerError) -> Self {
        CoreError::Ledger(e)
    }
}

impl From<ClientError> for CoreError {
    fn from(e: ClientError) -> Self {
        CoreError::Client(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse {path}: {msg}")]
    Parse { path: String, msg: String },
}

/// Durable ledger store errors
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("I/O error on {path}: {msg}")]
    Io { path: String, msg: String },

    #[error("Snapshot serialization failed: {msg}")]
    Serialize { msg: String },
}

/// Outcomes reported by the remote social-graph client.
///
/// The orchestrator switches on the variant: `NotFound` skips the candidate,
/// `RateLimited` escalates to a cooldown, everything else is a plain failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Rate limited by remote service: {message}")]
    RateLimited { message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl ClientError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ClientError::NotFound { what: what.into() }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        ClientError::RateLimited {
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited { .. })
    }

    /// Network-level failures that are safe to retry for read-only calls.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
