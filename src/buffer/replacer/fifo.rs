//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use crate::common::PageId;

/// A FIFO eviction policy over cached pages.
///
/// Pages are considered for eviction in the order they entered the cache.
/// The caller decides which pages are evictable at eviction time, so pages
/// that are skipped (dirty ones) keep their place in the queue.
pub struct FifoReplacer {
    /// Page IDs in admission order (front = oldest).
    queue: VecDeque<PageId>,

    /// Set for O(1) membership check.
    in_queue: HashSet<PageId>,
}

impl FifoReplacer {
    /// Create a new FIFO replacer.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_queue: HashSet::new(),
        }
    }

    /// Record that a page was admitted or accessed.
    ///
    /// For FIFO, only adds to the queue if not already present.
    pub fn record_access(&mut self, page_id: PageId) {
        if self.in_queue.insert(page_id) {
            self.queue.push_back(page_id);
        }
    }

    /// Select and forget the oldest page for which `evictable` holds.
    ///
    /// Returns `None` if no tracked page is evictable.
    pub fn evict<F>(&mut self, mut evictable: F) -> Option<PageId>
    where
        F: FnMut(&PageId) -> bool,
    {
        let pos = self.queue.iter().position(|page_id| evictable(page_id))?;
        let page_id = self.queue.remove(pos)?;
        self.in_queue.remove(&page_id);
        Some(page_id)
    }

    /// Stop tracking a page (it left the cache without being evicted).
    pub fn remove(&mut self, page_id: PageId) {
        if self.in_queue.remove(&page_id) {
            self.queue.retain(|&p| p != page_id);
        }
    }

    /// Number of tracked pages.
    pub fn size(&self) -> usize {
        self.queue.len()
    }
}

impl Default for FifoReplacer {
    fn default() -> Self {
        Self::new()
    }
}
