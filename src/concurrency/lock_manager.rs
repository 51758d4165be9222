//! Lock Manager - two-phase page-level locking.
//!
//! The [`LockManager`] tracks, for every page, which transactions hold it
//! and in which mode, plus the reverse view (which pages each transaction
//! holds) so that a transaction's locks can be dropped in one pass at
//! commit or abort.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::common::{PageId, TransactionId};

/// Requested access to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Read access; any number of transactions may share it.
    Shared,
    /// Read-write access; excludes every other transaction.
    Exclusive,
}

/// Lock state of one page. Unlocked pages have no state at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Shared(HashSet<TransactionId>),
    Exclusive(TransactionId),
}

/// Outcome of one attempt to take a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    /// The transaction already held a lock at least as strong.
    AlreadyHeld,
    Granted,
    /// Sole shared holder switched to exclusive in place.
    Upgraded,
    Blocked,
}

/// Pages held by one transaction, by mode.
#[derive(Debug, Default)]
struct HeldPages {
    shared: HashSet<PageId>,
    exclusive: HashSet<PageId>,
}

impl HeldPages {
    fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_empty()
    }
}

/// Transactions blocked on one page.
#[derive(Debug)]
struct WaitQueue {
    cvar: Arc<Condvar>,
    waiting: usize,
}

#[derive(Debug, Default)]
struct LockTable {
    pages: HashMap<PageId, LockState>,
    held: HashMap<TransactionId, HeldPages>,
    waiters: HashMap<PageId, WaitQueue>,
}

impl LockTable {
    /// Attempt the state transition for `(tx, page_id, mode)`.
    ///
    /// Either applies it to both the per-page and the per-transaction view,
    /// or changes nothing.
    fn try_grant(&mut self, tx: TransactionId, page_id: PageId, mode: LockMode) -> Grant {
        let grant = match self.pages.entry(page_id) {
            Entry::Vacant(entry) => {
                entry.insert(match mode {
                    LockMode::Shared => LockState::Shared(HashSet::from([tx])),
                    LockMode::Exclusive => LockState::Exclusive(tx),
                });
                Grant::Granted
            }
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                match state {
                    LockState::Exclusive(owner) if *owner == tx => return Grant::AlreadyHeld,
                    LockState::Exclusive(_) => return Grant::Blocked,
                    LockState::Shared(holders) => match mode {
                        LockMode::Shared => {
                            if !holders.insert(tx) {
                                return Grant::AlreadyHeld;
                            }
                            Grant::Granted
                        }
                        LockMode::Exclusive => {
                            if holders.len() != 1 || !holders.contains(&tx) {
                                return Grant::Blocked;
                            }
                            *state = LockState::Exclusive(tx);
                            Grant::Upgraded
                        }
                    },
                }
            }
        };

        let held = self.held.entry(tx).or_default();
        match (grant, mode) {
            (Grant::Granted, LockMode::Shared) => {
                held.shared.insert(page_id);
            }
            (Grant::Granted, LockMode::Exclusive) => {
                held.exclusive.insert(page_id);
            }
            (Grant::Upgraded, _) => {
                held.shared.remove(&page_id);
                held.exclusive.insert(page_id);
            }
            _ => {}
        }
        grant
    }

    /// Remove `tx` from the page's holders. Returns whether it held the page.
    fn remove_holder(&mut self, tx: TransactionId, page_id: PageId) -> bool {
        let removed = match self.pages.get_mut(&page_id) {
            Some(LockState::Exclusive(owner)) if *owner == tx => {
                self.pages.remove(&page_id);
                true
            }
            Some(LockState::Shared(holders)) => {
                let removed = holders.remove(&tx);
                if holders.is_empty() {
                    self.pages.remove(&page_id);
                }
                removed
            }
            _ => false,
        };

        if let Some(held) = self.held.get_mut(&tx) {
            held.shared.remove(&page_id);
            held.exclusive.remove(&page_id);
            if held.is_empty() {
                self.held.remove(&tx);
            }
        }
        removed
    }

    /// Wake every transaction waiting on `page_id`.
    fn wake(&self, page_id: PageId) {
        if let Some(queue) = self.waiters.get(&page_id) {
            queue.cvar.notify_all();
        }
    }

    fn enqueue(&mut self, page_id: PageId) -> Arc<Condvar> {
        let queue = self.waiters.entry(page_id).or_insert_with(|| WaitQueue {
            cvar: Arc::new(Condvar::new()),
            waiting: 0,
        });
        queue.waiting += 1;
        Arc::clone(&queue.cvar)
    }

    fn dequeue(&mut self, page_id: PageId) {
        if let Entry::Occupied(mut entry) = self.waiters.entry(page_id) {
            entry.get_mut().waiting -= 1;
            if entry.get().waiting == 0 {
                entry.remove();
            }
        }
    }
}

/// Grants and releases shared/exclusive page locks on behalf of
/// transactions.
///
/// # Locking Rules
/// ```text
///  held \ requested │ Shared          │ Exclusive
/// ──────────────────┼─────────────────┼──────────────────────────────
///  none             │ grant           │ grant
///  Shared (others)  │ grant (join)    │ block
///  Shared (only tx) │ no-op           │ upgrade in place
///  Exclusive (tx)   │ no-op           │ no-op
///  Exclusive (other)│ block           │ block
/// ```
///
/// # Thread Safety
/// All state lives behind one `Mutex`, so every transition (including the
/// shared-to-exclusive upgrade) is a single critical section. Blocked
/// callers sleep on a per-page `Condvar` and are woken whenever a holder of
/// that page releases it.
///
/// There is no deadlock detection and no wait timeout: transactions that
/// wait on each other in a cycle block forever.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
}

impl LockManager {
    /// Create a lock manager with no locks held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a lock on `page_id` for `tx`, blocking until it is granted.
    ///
    /// Returns immediately if `tx` already holds a sufficient lock.
    pub fn acquire(&self, tx: TransactionId, page_id: PageId, mode: LockMode) {
        let mut table = self.table.lock();
        loop {
            match table.try_grant(tx, page_id, mode) {
                Grant::Blocked => {}
                Grant::Upgraded => {
                    debug!(%tx, %page_id, "upgraded shared lock to exclusive");
                    return;
                }
                Grant::Granted => {
                    trace!(%tx, %page_id, ?mode, "lock granted");
                    return;
                }
                Grant::AlreadyHeld => return,
            }

            debug!(%tx, %page_id, ?mode, "waiting for lock");
            let cvar = table.enqueue(page_id);
            cvar.wait(&mut table);
            table.dequeue(page_id);
        }
    }

    /// Acquire a lock only if it can be granted without waiting.
    ///
    /// Returns `true` if `tx` holds a sufficient lock afterwards.
    pub fn try_acquire(&self, tx: TransactionId, page_id: PageId, mode: LockMode) -> bool {
        self.table.lock().try_grant(tx, page_id, mode) != Grant::Blocked
    }

    /// Release `tx`'s lock on `page_id`, if any.
    pub fn release(&self, tx: TransactionId, page_id: PageId) {
        let mut table = self.table.lock();
        if table.remove_holder(tx, page_id) {
            trace!(%tx, %page_id, "lock released");
            table.wake(page_id);
        }
    }

    /// Release every lock held by `tx`.
    pub fn release_all(&self, tx: TransactionId) {
        let mut table = self.table.lock();
        let Some(held) = table.held.remove(&tx) else {
            return;
        };

        let pages: Vec<PageId> = held.shared.into_iter().chain(held.exclusive).collect();
        for &page_id in &pages {
            table.remove_holder(tx, page_id);
            table.wake(page_id);
        }
        debug!(%tx, pages = pages.len(), "released all locks");
    }

    /// Whether `tx` holds any lock on `page_id`.
    pub fn holds(&self, tx: TransactionId, page_id: PageId) -> bool {
        self.lock_mode(tx, page_id).is_some()
    }

    /// The mode in which `tx` holds `page_id`, if it does.
    pub fn lock_mode(&self, tx: TransactionId, page_id: PageId) -> Option<LockMode> {
        match self.table.lock().pages.get(&page_id)? {
            LockState::Exclusive(owner) if *owner == tx => Some(LockMode::Exclusive),
            LockState::Shared(holders) if holders.contains(&tx) => Some(LockMode::Shared),
            _ => None,
        }
    }

    /// Snapshot of the lock state of `page_id`; `None` if unlocked.
    pub fn state(&self, page_id: PageId) -> Option<LockState> {
        self.table.lock().pages.get(&page_id).cloned()
    }

    /// Every page `tx` holds, in either mode.
    pub fn pages_held(&self, tx: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        table
            .held
            .get(&tx)
            .map(|held| held.shared.iter().chain(&held.exclusive).copied().collect())
            .unwrap_or_default()
    }

    /// Pages `tx` holds exclusively.
    pub fn exclusive_pages(&self, tx: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        table
            .held
            .get(&tx)
            .map(|held| held.exclusive.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of pages with at least one holder.
    pub fn locked_page_count(&self) -> usize {
        self.table.lock().pages.len()
    }

    /// Number of transactions currently blocked on `page_id`.
    pub fn waiting_count(&self, page_id: PageId) -> usize {
        self.table
            .lock()
            .waiters
            .get(&page_id)
            .map_or(0, |queue| queue.waiting)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn pid(page_no: u32) -> PageId {
        PageId::new(TableId(1), page_no)
    }

    /// Spin until `n` transactions are parked on `page_id`.
    fn wait_for_waiters(lm: &LockManager, page_id: PageId, n: usize) {
        while lm.waiting_count(page_id) < n {
            thread::yield_now();
        }
    }

    #[test]
    fn test_shared_locks_are_compatible() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        lm.acquire(t1, pid(0), LockMode::Shared);
        lm.acquire(t2, pid(0), LockMode::Shared);

        assert!(lm.holds(t1, pid(0)));
        assert!(lm.holds(t2, pid(0)));
        assert_eq!(
            lm.state(pid(0)),
            Some(LockState::Shared(HashSet::from([t1, t2])))
        );
    }

    #[test]
    fn test_exclusive_conflicts() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        lm.acquire(t1, pid(0), LockMode::Exclusive);
        assert!(!lm.try_acquire(t2, pid(0), LockMode::Shared));
        assert!(!lm.try_acquire(t2, pid(0), LockMode::Exclusive));
        assert!(!lm.holds(t2, pid(0)));
    }

    #[test]
    fn test_exclusive_holder_requesting_shared_keeps_exclusive() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();

        lm.acquire(t1, pid(0), LockMode::Exclusive);
        lm.acquire(t1, pid(0), LockMode::Shared);

        assert_eq!(lm.lock_mode(t1, pid(0)), Some(LockMode::Exclusive));
        assert_eq!(lm.state(pid(0)), Some(LockState::Exclusive(t1)));
        assert_eq!(lm.exclusive_pages(t1), vec![pid(0)]);
    }

    #[test]
    fn test_sole_shared_holder_upgrades() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        lm.acquire(t1, pid(0), LockMode::Shared);
        lm.acquire(t1, pid(0), LockMode::Exclusive);

        assert_eq!(lm.state(pid(0)), Some(LockState::Exclusive(t1)));
        assert_eq!(lm.exclusive_pages(t1), vec![pid(0)]);
        assert_eq!(lm.pages_held(t1), vec![pid(0)]);
        assert!(!lm.try_acquire(t2, pid(0), LockMode::Shared));
    }

    #[test]
    fn test_upgrade_with_parked_writer_leaves_no_gap() {
        let lm = Arc::new(LockManager::new());
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        lm.acquire(t1, pid(0), LockMode::Shared);

        let (tx, rx) = mpsc::channel();
        let lm2 = Arc::clone(&lm);
        let handle = thread::spawn(move || {
            lm2.acquire(t2, pid(0), LockMode::Exclusive);
            tx.send(()).unwrap();
        });
        wait_for_waiters(&lm, pid(0), 1);

        lm.acquire(t1, pid(0), LockMode::Exclusive);
        for _ in 0..5 {
            assert!(rx.recv_timeout(Duration::from_millis(10)).is_err());
            assert_eq!(lm.state(pid(0)), Some(LockState::Exclusive(t1)));
            assert!(!lm.holds(t2, pid(0)));
        }

        lm.release_all(t1);
        rx.recv().unwrap();
        handle.join().unwrap();
        assert_eq!(lm.state(pid(0)), Some(LockState::Exclusive(t2)));
    }

    #[test]
    fn test_upgrade_blocked_by_other_shared_holder() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        lm.acquire(t1, pid(0), LockMode::Shared);
        lm.acquire(t2, pid(0), LockMode::Shared);

        assert!(!lm.try_acquire(t1, pid(0), LockMode::Exclusive));
        assert_eq!(lm.lock_mode(t1, pid(0)), Some(LockMode::Shared));

        lm.release(t2, pid(0));
        assert!(lm.try_acquire(t1, pid(0), LockMode::Exclusive));
    }

    #[test]
    fn test_release_removes_empty_entries() {
        let lm = LockManager::new();
        let t1 = TransactionId::new();

        lm.acquire(t1, pid(0), LockMode::Shared);
        lm.release(t1, pid(0));

        assert_eq!(lm.state(pid(0)), None);
        assert_eq!(lm.locked_page_count(), 0);
        assert!(lm.pages_held(t1).is_empty());
    }

    #[test]
    fn test_release_of_unheld_lock_is_noop() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        lm.acquire(t1, pid(0), LockMode::Exclusive);
        lm.release(t2, pid(0));
        assert_eq!(lm.state(pid(0)), Some(LockState::Exclusive(t1)));
    }

    #[test]
    fn test_release_all() {
        let lm = LockManager::new();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        for i in 0..5 {
            lm.acquire(t1, pid(i), LockMode::Shared);
        }
        lm.acquire(t1, pid(7), LockMode::Exclusive);
        lm.acquire(t2, pid(0), LockMode::Shared);

        lm.release_all(t1);

        for i in 0..8 {
            assert!(!lm.holds(t1, pid(i)));
        }
        assert!(lm.holds(t2, pid(0)));
        assert_eq!(lm.locked_page_count(), 1);
    }

    #[test]
    fn test_shared_waits_for_exclusive_release() {
        let lm = Arc::new(LockManager::new());
        let (a, b) = (TransactionId::new(), TransactionId::new());
        lm.acquire(a, pid(0), LockMode::Exclusive);

        let (tx, rx) = mpsc::channel();
        let lm2 = Arc::clone(&lm);
        let handle = thread::spawn(move || {
            lm2.acquire(b, pid(0), LockMode::Shared);
            tx.send(()).unwrap();
        });

        wait_for_waiters(&lm, pid(0), 1);
        assert!(rx.recv_timeout(Duration::from_millis(20)).is_err());
        assert!(!lm.holds(b, pid(0)));

        lm.release_all(a);
        rx.recv().unwrap();
        handle.join().unwrap();

        assert!(lm.holds(b, pid(0)));
        assert_eq!(lm.waiting_count(pid(0)), 0);
    }

    #[test]
    fn test_exclusive_waits_for_all_readers() {
        let lm = Arc::new(LockManager::new());
        let (r1, r2, w) = (
            TransactionId::new(),
            TransactionId::new(),
            TransactionId::new(),
        );
        lm.acquire(r1, pid(0), LockMode::Shared);
        lm.acquire(r2, pid(0), LockMode::Shared);

        let lm2 = Arc::clone(&lm);
        let handle = thread::spawn(move || lm2.acquire(w, pid(0), LockMode::Exclusive));

        wait_for_waiters(&lm, pid(0), 1);
        lm.release(r1, pid(0));
        assert!(!lm.holds(w, pid(0)));

        lm.release(r2, pid(0));
        handle.join().unwrap();
        assert_eq!(lm.state(pid(0)), Some(LockState::Exclusive(w)));
    }
}
