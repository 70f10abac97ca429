use std::io;

use thiserror::Error;

use crate::core::Ledger;

/// Opaque marker of the stored state a snapshot was taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Revision(pub(crate) u64);

/// A ledger as loaded, together with the revision it was loaded at.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub ledger: Ledger,
    pub revision: Revision
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ledger storage i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored ledger is not valid: {0}")]
    Corrupt(#[from] serde_json::Error),
    /// The stored ledger changed between load and replace.
    #[error("ledger was modified concurrently")]
    Conflict,
    #[error("concurrent update lost after {attempts} attempts")]
    ConcurrentUpdateLost { attempts: usize },
    #[error("ledger store is closed")]
    Closed
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable home of the one ledger record.
///
/// `load` never fails because nothing has been stored yet: an absent
/// record is the empty ledger. `replace` overwrites the whole record,
/// but only if it is still at `expected`; otherwise it returns
/// [`StoreError::Conflict`] and leaves the stored record untouched.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Snapshot>;
    fn replace(&self, ledger: &Ledger, expected: Revision) -> Result<Revision>;

    /// Releases whatever the store holds. Later calls fail with `Closed`.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
