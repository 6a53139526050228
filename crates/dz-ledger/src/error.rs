/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The backing store or network could not be reached.
    #[error("ledger connection error: {0}")]
    Connection(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("deadline exceeded while waiting on the ledger")]
    DeadlineExceeded,

    #[error("payload encoding error: {0}")]
    Encoding(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<dz_types::TypeError> for LedgerError {
    fn from(e: dz_types::TypeError) -> Self {
        Self::InvalidAddress(e.to_string())
    }
}

impl From<dz_protocol::CodecError> for LedgerError {
    fn from(e: dz_protocol::CodecError) -> Self {
        Self::Encoding(e.to_string())
    }
}
