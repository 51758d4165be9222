//! Buffer Pool - the transactional page cache.
//!
//! The [`BufferPool`] provides:
//! - Page caching between heap files and memory, bounded by a page count
//! - Two-phase page locking through its [`LockManager`]
//! - No-steal eviction (dirty pages stay cached until their transaction ends)
//! - Force-at-commit write-back and discard-and-reload on abort

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::BufferPoolStats;
use crate::catalog::Catalog;
use crate::common::{BufferPoolConfig, Error, PageId, RecordId, Result, TableId, TransactionId};
use crate::concurrency::{LockManager, LockMode};
use crate::storage::page::HeapPage;
use crate::tuple::Tuple;

/// A cached page, shared between the pool and its callers.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// Cache contents. Guarded as a whole so a miss can check, evict and insert
/// in one critical section.
struct PoolState {
    /// Maps page IDs to cached pages.
    pages: HashMap<PageId, PageRef>,

    /// Admission order, for picking eviction victims.
    replacer: FifoReplacer,
}

/// Caches up to `capacity` heap pages and arbitrates access to them.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                         BufferPool                          │
/// │  ┌──────────────────────────────────┐  ┌────────────────┐   │
/// │  │ state: Mutex<PoolState>          │  │  lock_manager  │   │
/// │  │   pages: PageId → PageRef        │  │  LockManager   │   │
/// │  │   replacer: FifoReplacer         │  └────────────────┘   │
/// │  └──────────────────────────────────┘  ┌────────────────┐   │
/// │  ┌──────────────┐                      │    catalog     │   │
/// │  │    stats     │                      │  Arc<Catalog>  │   │
/// │  └──────────────┘                      └────────────────┘   │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: `Mutex` held for every cache lookup, admission and eviction
/// - `lock_manager`: blocks callers of [`get_page`](Self::get_page) until
///   their lock is granted; never called with `state` held
/// - `stats`: No lock, all atomic counters
///
/// The pool takes page guards while holding `state`, so callers must drop
/// their page guards before calling back into the pool.
///
/// # Usage
/// ```ignore
/// let pool = BufferPool::new(BufferPoolConfig::default(), catalog);
/// let tx = TransactionId::new();
///
/// let record_id = pool.insert_tuple(tx, table_id, tuple)?;
/// let page = pool.get_page(tx, record_id.page_id, LockMode::Shared)?;
/// println!("{}", page.read().tuple(record_id.slot).unwrap());
///
/// pool.transaction_complete(tx, true)?;
/// ```
pub struct BufferPool {
    /// Maximum number of cached pages (immutable after construction).
    capacity: usize,

    state: Mutex<PoolState>,

    lock_manager: LockManager,

    /// Resolves table ids to heap files.
    catalog: Arc<Catalog>,

    /// Performance statistics.
    stats: BufferPoolStats,
}

impl BufferPool {
    /// Create an empty buffer pool.
    ///
    /// # Panics
    /// Panics if `config.pages` is 0.
    pub fn new(config: BufferPoolConfig, catalog: Arc<Catalog>) -> Self {
        assert!(config.pages > 0, "pool capacity must be > 0");

        Self {
            capacity: config.pages,
            state: Mutex::new(PoolState {
                pages: HashMap::with_capacity(config.pages),
                replacer: FifoReplacer::new(),
            }),
            lock_manager: LockManager::new(),
            catalog,
            stats: BufferPoolStats::new(),
        }
    }

    // ========================================================================
    // Public API: Page access
    // ========================================================================

    /// Fetch a page on behalf of `tx`, locking it in `mode` first.
    ///
    /// Blocks until the lock is granted. On a miss the page is read from its
    /// heap file, evicting the oldest clean page if the pool is full.
    ///
    /// # Errors
    /// - `Error::TableNotFound` if the page's table is not in the catalog
    /// - `Error::InvalidPage` if the page is not on disk
    /// - `Error::BufferFull` if the pool is full of dirty pages
    pub fn get_page(&self, tx: TransactionId, page_id: PageId, mode: LockMode) -> Result<PageRef> {
        self.lock_manager.acquire(tx, page_id, mode);

        let mut state = self.state.lock();
        self.fetch(&mut state, tx, page_id)
    }

    /// Lock `page_id` exclusively for `tx` and run `change` on it.
    ///
    /// `change` runs under the page's write guard with the pool state held,
    /// so the page cannot be evicted before it is marked dirty. Returning
    /// `Ok(Some(_))` marks the page dirtied by `tx`; `Ok(None)` means the
    /// page was left untouched. `change` must not call back into the pool.
    pub(crate) fn modify_page<T>(
        &self,
        tx: TransactionId,
        page_id: PageId,
        change: impl FnOnce(&mut HeapPage) -> Result<Option<T>>,
    ) -> Result<(Option<T>, PageRef)> {
        self.lock_manager.acquire(tx, page_id, LockMode::Exclusive);

        let mut state = self.state.lock();
        let page = self.fetch(&mut state, tx, page_id)?;
        let outcome = {
            let mut guard = page.write();
            let outcome = change(&mut guard)?;
            if outcome.is_some() {
                guard.mark_dirty(Some(tx));
                trace!(%tx, %page_id, "page dirtied");
            }
            outcome
        };
        Ok((outcome, page))
    }

    // ========================================================================
    // Public API: Tuple mutation
    // ========================================================================

    /// Insert `tuple` into table `table_id` on behalf of `tx`.
    ///
    /// Every page the insert touched is marked dirty by `tx` and kept cached.
    ///
    /// # Errors
    /// - `Error::TableNotFound` for an unknown table
    /// - `Error::SchemaMismatch` if the tuple doesn't fit the table
    /// - anything [`get_page`](Self::get_page) returns
    pub fn insert_tuple(&self, tx: TransactionId, table_id: TableId, tuple: Tuple) -> Result<RecordId> {
        let file = self.catalog.heap_file(table_id)?;
        let (record_id, _pages) = file.insert_tuple(self, tx, tuple)?;
        Ok(record_id)
    }

    /// Delete `tuple` from the table its record id points into.
    ///
    /// # Errors
    /// - `Error::TupleNotFound` if the tuple has no record id or its slot is
    ///   already empty
    /// - `Error::TableNotFound` if the record id names an unknown table
    pub fn delete_tuple(&self, tx: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple
            .record_id()
            .ok_or(Error::TupleNotFound { record_id: None })?;
        let file = self.catalog.heap_file(record_id.page_id.table_id)?;
        file.delete_tuple(self, tx, tuple)?;
        Ok(())
    }

    // ========================================================================
    // Public API: Flush and discard
    // ========================================================================

    /// Write a cached page back to disk if it is dirty, then mark it clean.
    ///
    /// Does nothing for pages that are not cached.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let page = match self.state.lock().pages.get(&page_id) {
            Some(page) => Arc::clone(page),
            None => return Ok(()),
        };
        self.write_back(&page)
    }

    /// Flush every cached page dirtied by `tx`.
    pub fn flush_pages(&self, tx: TransactionId) -> Result<()> {
        for page in self.dirtied_by(tx) {
            self.write_back(&page)?;
        }
        Ok(())
    }

    /// Flush every dirty cached page.
    ///
    /// Writes out uncommitted changes, so only use it at shutdown or in
    /// tests.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<PageRef> = self.state.lock().pages.values().cloned().collect();
        for page in pages {
            self.write_back(&page)?;
        }
        Ok(())
    }

    /// Drop a page from the cache without writing it back.
    pub fn discard_page(&self, page_id: PageId) {
        let mut state = self.state.lock();
        if state.pages.remove(&page_id).is_some() {
            state.replacer.remove(page_id);
            trace!(%page_id, "page discarded");
        }
    }

    // ========================================================================
    // Public API: Transactions and locks
    // ========================================================================

    /// End `tx`, committing or aborting it, and release all its locks.
    ///
    /// Commit forces every page `tx` dirtied to disk. Abort throws those
    /// pages away and reloads their on-disk versions.
    ///
    /// # Errors
    /// If a commit flush fails the error is returned and `tx` keeps its
    /// locks, so the caller can retry or abort.
    pub fn transaction_complete(&self, tx: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.flush_pages(tx)?;
            BufferPoolStats::bump(&self.stats.commits);
            debug!(%tx, "transaction committed");
        } else {
            self.restore_pages(tx);
            BufferPoolStats::bump(&self.stats.aborts);
            debug!(%tx, "transaction aborted");
        }
        self.lock_manager.release_all(tx);
        Ok(())
    }

    /// Release `tx`'s lock on one page before the transaction ends.
    ///
    /// Breaks two-phase locking; only safe for pages `tx` merely looked at.
    pub fn release_page(&self, tx: TransactionId, page_id: PageId) {
        self.lock_manager.release(tx, page_id);
    }

    /// Whether `tx` holds a lock on `page_id`.
    pub fn holds_lock(&self, tx: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds(tx, page_id)
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages currently cached.
    pub fn cached_page_count(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.state.lock().pages.contains_key(&page_id)
    }

    /// The transaction that dirtied a cached page; `None` if the page is
    /// clean or not cached.
    pub fn is_dirty(&self, page_id: PageId) -> Option<TransactionId> {
        let state = self.state.lock();
        state.pages.get(&page_id).and_then(|page| page.read().dirtier())
    }

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    // ========================================================================
    // Internal: Cache admission and eviction
    // ========================================================================

    /// Cached page for `page_id`, reading it from its heap file on a miss.
    fn fetch(&self, state: &mut PoolState, tx: TransactionId, page_id: PageId) -> Result<PageRef> {
        if let Some(page) = state.pages.get(&page_id) {
            let page = Arc::clone(page);
            state.replacer.record_access(page_id);
            BufferPoolStats::bump(&self.stats.cache_hits);
            trace!(%tx, %page_id, "cache hit");
            return Ok(page);
        }

        BufferPoolStats::bump(&self.stats.cache_misses);
        let file = self.catalog.heap_file(page_id.table_id)?;
        let page = Arc::new(RwLock::new(file.read_page(page_id)?));
        BufferPoolStats::bump(&self.stats.pages_read);
        debug!(%tx, %page_id, "cache miss, page loaded");

        self.admit(state, page_id, Arc::clone(&page))?;
        Ok(page)
    }

    /// Insert `page` under `page_id`, evicting first if the pool is full.
    ///
    /// Replaces any page already cached under the same id.
    fn admit(&self, state: &mut PoolState, page_id: PageId, page: PageRef) -> Result<()> {
        if !state.pages.contains_key(&page_id) && state.pages.len() >= self.capacity {
            self.evict(state)?;
        }
        state.pages.insert(page_id, page);
        state.replacer.record_access(page_id);
        Ok(())
    }

    /// Drop the oldest clean page.
    fn evict(&self, state: &mut PoolState) -> Result<()> {
        let PoolState { pages, replacer } = state;
        let victim = replacer
            .evict(|page_id| pages.get(page_id).map_or(true, |page| !page.read().is_dirty()))
            .ok_or(Error::BufferFull {
                capacity: self.capacity,
            })?;

        pages.remove(&victim);
        BufferPoolStats::bump(&self.stats.evictions);
        debug!(page_id = %victim, "evicted page");
        Ok(())
    }

    /// Cached pages whose dirtier is `tx`.
    fn dirtied_by(&self, tx: TransactionId) -> Vec<PageRef> {
        let state = self.state.lock();
        state
            .pages
            .values()
            .filter(|page| page.read().dirtier() == Some(tx))
            .cloned()
            .collect()
    }

    /// Write `page` to its heap file if dirty and mark it clean.
    fn write_back(&self, page: &PageRef) -> Result<()> {
        let mut guard = page.write();
        if !guard.is_dirty() {
            return Ok(());
        }

        let page_id = guard.id();
        let file = self.catalog.heap_file(page_id.table_id)?;
        file.write_page(&guard)?;
        guard.mark_dirty(None);

        BufferPoolStats::bump(&self.stats.pages_written);
        debug!(%page_id, "flushed page");
        Ok(())
    }

    /// Replace every page dirtied by `tx` with its on-disk version.
    ///
    /// A page that can't be reloaded is left uncached; the next access reads
    /// it again.
    fn restore_pages(&self, tx: TransactionId) {
        let mut state = self.state.lock();
        let dirty: Vec<PageId> = state
            .pages
            .iter()
            .filter(|(_, page)| page.read().dirtier() == Some(tx))
            .map(|(&page_id, _)| page_id)
            .collect();

        for page_id in dirty {
            state.pages.remove(&page_id);
            state.replacer.remove(page_id);
            BufferPoolStats::bump(&self.stats.pages_discarded);

            let reloaded = self
                .catalog
                .heap_file(page_id.table_id)
                .and_then(|file| file.read_page(page_id));
            match reloaded {
                Ok(page) => {
                    BufferPoolStats::bump(&self.stats.pages_read);
                    state.pages.insert(page_id, Arc::new(RwLock::new(page)));
                    state.replacer.record_access(page_id);
                }
                Err(e) => warn!(%tx, %page_id, error = %e, "could not reload aborted page"),
            }
        }
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.capacity)
            .field("cached", &self.cached_page_count())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
