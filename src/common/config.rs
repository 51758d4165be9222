//! Configuration constants for heapdb.

/// Size of a page in bytes (4KB).
///
/// Every heap file is a sequence of pages of exactly this size, and every
/// cached page encodes back to exactly this many bytes.
///
/// # Memory Layout
/// With 4KB pages and 32-bit page numbers:
/// - Max pages per table: 2^32
/// - Max table size: 2^32 × 4KB = 16TB
pub const PAGE_SIZE: usize = 4096;

/// Fixed payload length of a string field, in bytes.
///
/// A string field occupies a 4-byte length prefix plus this many bytes.
/// Longer strings are truncated when the field is created.
pub const STRING_LEN: usize = 128;

/// Number of pages a buffer pool caches when no capacity is given.
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Construction-time options for a [`BufferPool`](crate::buffer::BufferPool).
///
/// # Example
/// ```
/// use heapdb::BufferPoolConfig;
///
/// let config = BufferPoolConfig::default().with_pages(8);
/// assert_eq!(config.pages, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of pages held in the cache. Eviction triggers once a
    /// miss would exceed this bound.
    pub pages: usize,
}

impl BufferPoolConfig {
    /// Create a config caching at most `pages` pages.
    pub fn new(pages: usize) -> Self {
        Self { pages }
    }

    /// Replace the page capacity.
    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pages: DEFAULT_POOL_PAGES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_pool_config_default() {
        assert_eq!(BufferPoolConfig::default().pages, DEFAULT_POOL_PAGES);
        assert_eq!(BufferPoolConfig::new(3).with_pages(7).pages, 7);
    }
}
