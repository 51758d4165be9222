//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between access methods
//! and heap files. It caches a bounded number of decoded pages and makes
//! every access go through the lock manager first.
//!
//! # Components
//! - [`BufferPool`] - The transactional page cache
//! - [`PageRef`] - A shared handle to one cached page
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool;
pub mod replacer;
mod stats;

pub use buffer_pool::{BufferPool, PageRef};
pub use stats::{BufferPoolStats, StatsSnapshot};
