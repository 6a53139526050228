use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid base58 string: {0}")]
    InvalidBase58(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("address checksum mismatch")]
    ChecksumMismatch,

    #[error("unknown address version byte: {0:#04x}")]
    UnknownVersion(u8),

    #[error("address belongs to {actual}, expected {expected}")]
    WrongNetwork { expected: String, actual: String },

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
