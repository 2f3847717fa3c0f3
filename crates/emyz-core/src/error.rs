//! Error types for the Emyzelium overlay

use thiserror::Error;

/// Core Emyzelium errors
#[derive(Error, Debug)]
pub enum EmyzError {
    // Key errors
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // Wire errors
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    // Crypto errors
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Replay detected: counter {0}")]
    ReplayDetected(u64),

    // Transport errors
    #[error("Invalid connpoint: {0}")]
    InvalidConnpoint(String),

    #[error("Address already in use: {0}")]
    AddressInUse(String),

    #[error("Authorization handler already bound")]
    AuthHandlerInUse,

    #[error("Transport error: {0}")]
    TransportError(String),

    // Whitelist files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Emyzelium operations
pub type EmyzResult<T> = Result<T, EmyzError>;
