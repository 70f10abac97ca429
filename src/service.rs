use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::backend::{LedgerStore, Snapshot, StoreError};
use crate::core::contribution::validate_amount;
use crate::core::{Amount, Contribution, Ledger, LedgerResult};

/// Front door to the ledger. Holds no ledger state of its own: every call
/// goes to the store, which stays the single source of truth.
///
/// Mutations hold the exclusive side of the lock for the whole
/// load-modify-replace sequence, so two saves can never both start from
/// the same ledger and drop each other's contribution. Reads share the lock
/// and always see a ledger that was completely written.
pub struct LedgerService<S: LedgerStore> {
    store: RwLock<S>
}

impl<S: LedgerStore> LedgerService<S> {
    /// Replacing a ledger that changed underneath us is retried this many times
    /// in total before giving up.
    pub const MAX_ATTEMPTS: usize = 3;

    pub fn new(store: S) -> LedgerService<S> {
        LedgerService { store: RwLock::new(store) }
    }

    pub fn total(&self) -> LedgerResult<Amount> {
        Ok(self.ledger()?.total_saved())
    }

    pub fn history(&self) -> LedgerResult<Vec<Contribution>> {
        Ok(self.ledger()?.into_history())
    }

    /// Total and history as read together from one load.
    pub fn ledger(&self) -> LedgerResult<Ledger> {
        let store = self.read_store();
        Ok(load(&*store)?.ledger)
    }

    /// Records a contribution and returns the new total.
    pub fn save(&self, amount: Amount) -> LedgerResult<Amount> {
        let amount = validate_amount(amount)?;
        let total = self.mutate(|ledger| {
            ledger.record(amount, Utc::now());
            ledger.total_saved()
        })?;
        info!("saved {}, total is now {}", amount, total);
        Ok(total)
    }

    /// Drops every contribution. There is no way back.
    pub fn clear(&self) -> LedgerResult<()> {
        self.mutate(Ledger::clear)?;
        info!("ledger cleared");
        Ok(())
    }

    /// Closes the underlying store; later calls fail as store errors.
    pub fn shutdown(&self) -> LedgerResult<()> {
        self.write_store().close()?;
        Ok(())
    }

    fn mutate<T>(&self, mut change: impl FnMut(&mut Ledger) -> T) -> LedgerResult<T> {
        let store = self.write_store();

        for attempt in 1..=Self::MAX_ATTEMPTS {
            let Snapshot { mut ledger, revision } = load(&*store)?;
            let result = change(&mut ledger);

            match store.replace(&ledger, revision) {
                Ok(_) => return Ok(result),
                Err(StoreError::Conflict) => {
                    warn!("ledger changed during update (attempt {} of {})", attempt, Self::MAX_ATTEMPTS);
                }
                Err(err) => return Err(err.into())
            }
        }

        error!("giving up on ledger update after {} conflicting attempts", Self::MAX_ATTEMPTS);
        Err(StoreError::ConcurrentUpdateLost { attempts: Self::MAX_ATTEMPTS }.into())
    }

    fn read_store(&self) -> RwLockReadGuard<'_, S> {
        // the guarded store keeps no state of ours that a panic could tear
        self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, S> {
        self.store.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Loads a snapshot, trusting the history over a total that disagrees with it.
fn load<S: LedgerStore>(store: &S) -> Result<Snapshot, StoreError> {
    let mut snapshot = store.load()?;
    if let Some(stale) = snapshot.ledger.reconcile() {
        warn!("stored total {} did not match history, using {}", stale, snapshot.ledger.total_saved());
    }
    debug!("loaded ledger with {} contributions", snapshot.ledger.history().len());
    Ok(snapshot)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{JsonStore, MemoryStore, Revision};
    use crate::core::LedgerError;

    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use rstest::{fixture, rstest};

    #[fixture]
    fn service() -> LedgerService<MemoryStore> {
        LedgerService::new(MemoryStore::new())
    }

    fn assert_consistent<S: LedgerStore>(service: &LedgerService<S>) {
        let history_sum: Amount = service.history().unwrap().iter()
            .fold(0.0, |total, c| total + c.amount);
        assert_eq!(service.total().unwrap(), history_sum);
    }

    #[rstest]
    fn save_save_clear(service: LedgerService<MemoryStore>) {
        assert_eq!(service.save(100.0).unwrap(), 100.0);
        let amounts: Vec<_> = service.history().unwrap().iter().map(|c| c.amount).collect();
        assert_eq!(amounts, vec![100.0]);

        assert_eq!(service.save(50.0).unwrap(), 150.0);
        let amounts: Vec<_> = service.history().unwrap().iter().map(|c| c.amount).collect();
        assert_eq!(amounts, vec![100.0, 50.0]);

        service.clear().unwrap();
        assert_eq!(service.total().unwrap(), 0.0);
        assert!(service.history().unwrap().is_empty());
    }

    #[rstest]
    fn clear_on_empty_ledger(service: LedgerService<MemoryStore>) {
        service.clear().unwrap();
        service.clear().unwrap();
        assert_eq!(service.total().unwrap(), 0.0);
        assert!(service.history().unwrap().is_empty());
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    #[case(Amount::NAN)]
    #[case(Amount::INFINITY)]
    fn invalid_amounts_change_nothing(service: LedgerService<MemoryStore>, #[case] amount: Amount) {
        service.save(20.0).unwrap();

        let res = service.save(amount);

        assert!(matches!(res, Err(LedgerError::InvalidAmount)));
        assert_eq!(service.total().unwrap(), 20.0);
        assert_eq!(service.history().unwrap().len(), 1);
    }

    #[rstest]
    fn smallest_amount_is_kept(service: LedgerService<MemoryStore>) {
        assert_eq!(service.save(0.0000001).unwrap(), 0.0000001);
        assert_eq!(service.total().unwrap(), 0.0000001);
    }

    #[rstest]
    fn history_is_in_commit_order(service: LedgerService<MemoryStore>) {
        for amount in [3.0, 1.0, 2.0] {
            service.save(amount).unwrap();
        }
        let history = service.history().unwrap();
        let amounts: Vec<_> = history.iter().map(|c| c.amount).collect();
        assert_eq!(amounts, vec![3.0, 1.0, 2.0]);
        assert!(history.windows(2).all(|pair| pair[0].time <= pair[1].time));
    }

    #[test]
    fn two_simultaneous_saves() {
        let service = Arc::new(LedgerService::new(MemoryStore::new()));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2).map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.save(10.0).unwrap()
            })
        }).collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(service.total().unwrap(), 20.0);
        assert_eq!(service.history().unwrap().len(), 2);
    }

    #[test]
    fn many_writers_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("ledger.json")).unwrap();
        let service = LedgerService::new(store);

        thread::scope(|scope| {
            for worker in 0..8 {
                let service = &service;
                scope.spawn(move || {
                    for i in 0..10 {
                        service.save((worker * 10 + i + 1) as Amount).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..20 {
                    assert_consistent(&service);
                }
            });
        });

        assert_eq!(service.history().unwrap().len(), 80);
        assert_eq!(service.total().unwrap(), (1..=80).sum::<u32>() as Amount);
        assert_consistent(&service);
    }

    #[test]
    fn inconsistent_total_is_reconciled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, r#"{
            "totalSaved": 999,
            "history": [{"amount": 10, "time": "2024-05-01T10:00:00.000Z"}]
        }"#).unwrap();

        let service = LedgerService::new(JsonStore::open(&path).unwrap());
        assert_eq!(service.total().unwrap(), 10.0);
        assert_eq!(service.save(5.0).unwrap(), 15.0);
    }

    /// Reports a conflict for the first `conflicts` replaces.
    struct ContendedStore {
        inner: MemoryStore,
        conflicts: usize,
        replaces: AtomicUsize
    }

    impl ContendedStore {
        fn new(conflicts: usize) -> ContendedStore {
            ContendedStore { inner: MemoryStore::new(), conflicts, replaces: AtomicUsize::new(0) }
        }
    }

    impl LedgerStore for ContendedStore {
        fn load(&self) -> crate::backend::Result<Snapshot> {
            self.inner.load()
        }

        fn replace(&self, ledger: &Ledger, expected: Revision) -> crate::backend::Result<Revision> {
            if self.replaces.fetch_add(1, Ordering::SeqCst) < self.conflicts {
                return Err(StoreError::Conflict);
            }
            self.inner.replace(ledger, expected)
        }
    }

    #[test]
    fn conflict_is_retried() {
        let service = LedgerService::new(ContendedStore::new(2));
        assert_eq!(service.save(7.0).unwrap(), 7.0);
        assert_eq!(service.history().unwrap().len(), 1);
    }

    #[test]
    fn persistent_conflict_is_reported() {
        let service = LedgerService::new(ContendedStore::new(usize::MAX));
        let res = service.save(7.0);

        assert!(matches!(
            res,
            Err(LedgerError::StoreUnavailable(StoreError::ConcurrentUpdateLost { attempts: 3 }))
        ));
        assert_eq!(service.total().unwrap(), 0.0);
    }

    /// Every call fails as if the disk went away.
    struct BrokenStore {
        calls: AtomicUsize
    }

    impl LedgerStore for BrokenStore {
        fn load(&self) -> crate::backend::Result<Snapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::NotConnected, "gone").into())
        }

        fn replace(&self, _: &Ledger, _: Revision) -> crate::backend::Result<Revision> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::NotConnected, "gone").into())
        }
    }

    #[test]
    fn store_failure_is_not_retried() {
        let service = LedgerService::new(BrokenStore { calls: AtomicUsize::new(0) });

        assert!(matches!(service.total(), Err(LedgerError::StoreUnavailable(StoreError::Io(..)))));
        assert!(matches!(service.save(1.0), Err(LedgerError::StoreUnavailable(..))));
        assert!(matches!(service.clear(), Err(LedgerError::StoreUnavailable(..))));

        let calls = service.read_store().calls.load(Ordering::SeqCst);
        assert_eq!(calls, 3);
    }

    #[rstest]
    fn shutdown_closes_store(service: LedgerService<MemoryStore>) {
        service.shutdown().unwrap();
        assert!(matches!(service.total(), Err(LedgerError::StoreUnavailable(StoreError::Closed))));
    }
}
