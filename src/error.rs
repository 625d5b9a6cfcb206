//! Error types for pollsafe
//!
//! Provides a unified error type for all store operations.

use thiserror::Error;

/// Result type alias using SafeError
pub type Result<T> = std::result::Result<T, SafeError>;

/// Unified error type for pollsafe operations
#[derive(Debug, Error)]
pub enum SafeError {
    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("data safe is not active")]
    NotActive,

    #[error("data safe is already active")]
    AlreadyActive,

    // -------------------------------------------------------------------------
    // Client Errors
    // -------------------------------------------------------------------------
    #[error("invalid poll identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("unknown answer {answer_id:?} in poll {poll_id:?}")]
    UnknownAnswer { poll_id: String, answer_id: String },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt record file: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("unknown data safe backend: {0}")]
    UnknownBackend(String),

    #[error("data safe backend already registered: {0}")]
    AlreadyRegistered(String),
}

impl From<bincode::Error> for SafeError {
    fn from(e: bincode::Error) -> Self {
        SafeError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for SafeError {
    fn from(e: serde_json::Error) -> Self {
        SafeError::Config(e.to_string())
    }
}
