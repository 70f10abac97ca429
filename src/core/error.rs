use thiserror::Error;

use crate::backend::StoreError;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Occurs when the caller supplies something that is not
    /// a finite number strictly greater than zero.
    /// Nothing is written when this is returned.
    #[error("Invalid amount")]
    InvalidAmount,
    /// Occurs when the ledger store cannot be read or written,
    /// including when conflicting writes exhausted the retries.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError)
}

pub type LedgerResult<T> = Result<T, LedgerError>;
