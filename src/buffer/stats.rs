//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a [`BufferPool`](crate::BufferPool).
///
/// Every counter is an independent `AtomicU64` updated with
/// `Ordering::Relaxed`; a [`StatsSnapshot`] may therefore mix values from
/// slightly different instants.
///
/// # Example
/// ```
/// use heapdb::BufferPoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = BufferPoolStats::new();
/// stats.cache_hits.fetch_add(3, Ordering::Relaxed);
/// stats.cache_misses.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().hit_rate(), 0.75);
/// ```
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// `get_page` calls served from the cache.
    pub cache_hits: AtomicU64,

    /// `get_page` calls that had to read the heap file.
    pub cache_misses: AtomicU64,

    /// Clean pages dropped to make room.
    pub evictions: AtomicU64,

    /// Pages decoded from heap files, including abort reloads.
    pub pages_read: AtomicU64,

    /// Dirty pages written back by a flush or commit.
    pub pages_written: AtomicU64,

    /// Dirty pages thrown away by an abort.
    pub pages_discarded: AtomicU64,

    pub commits: AtomicU64,

    pub aborts: AtomicU64,
}

impl BufferPoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            evictions: load(&self.evictions),
            pages_read: load(&self.pages_read),
            pages_written: load(&self.pages_written),
            pages_discarded: load(&self.pages_discarded),
            commits: load(&self.commits),
            aborts: load(&self.aborts),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.cache_hits,
            &self.cache_misses,
            &self.evictions,
            &self.pages_read,
            &self.pages_written,
            &self.pages_discarded,
            &self.commits,
            &self.aborts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Plain copy of [`BufferPoolStats`] for printing and comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_discarded: u64,
    pub commits: u64,
    pub aborts: u64,
}

impl StatsSnapshot {
    /// Fraction of `get_page` calls served from the cache (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} hit_rate={:.2}% evictions={} read={} written={} discarded={} commits={} aborts={}",
            self.cache_hits,
            self.cache_misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.pages_read,
            self.pages_written,
            self.pages_discarded,
            self.commits,
            self.aborts,
        )
    }
}
