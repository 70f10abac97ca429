use std::sync::Mutex;

use crate::backend::interface::{LedgerStore, Result, Revision, Snapshot, StoreError};
use crate::core::Ledger;

struct Slot {
    ledger: Ledger,
    revision: u64,
    closed: bool
}

/// Keeps the ledger in process memory. Nothing survives a restart.
pub struct MemoryStore {
    slot: Mutex<Slot>
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::with_ledger(Ledger::default())
    }

    pub fn with_ledger(ledger: Ledger) -> MemoryStore {
        MemoryStore { slot: Mutex::new(Slot { ledger, revision: 0, closed: false }) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        // the slot is only ever assigned whole, so a poisoned one is still consistent
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        let slot = self.lock();
        if slot.closed {
            return Err(StoreError::Closed);
        }
        Ok(Snapshot { ledger: slot.ledger.clone(), revision: Revision(slot.revision) })
    }

    fn replace(&self, ledger: &Ledger, expected: Revision) -> Result<Revision> {
        let mut slot = self.lock();
        if slot.closed {
            return Err(StoreError::Closed);
        }
        if Revision(slot.revision) != expected {
            return Err(StoreError::Conflict);
        }
        slot.ledger = ledger.clone();
        slot.revision += 1;
        Ok(Revision(slot.revision))
    }

    fn close(&self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}
