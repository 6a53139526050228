use dz_ledger::LedgerError;

/// Errors that abort a profile reconstruction.
///
/// A reconstruction either completes or fails outright; no partial profile
/// is ever returned alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ProfileError {
    /// `true` if the ledger call timed out against the engine's deadline.
    pub fn is_deadline(&self) -> bool {
        matches!(self, Self::Ledger(LedgerError::DeadlineExceeded))
    }
}

pub type ProfileResult<T> = Result<T, ProfileError>;
