//! PageData - the raw 4KB byte image of a page.
//!
//! A [`PageData`] is what travels between a [`HeapFile`](crate::storage::HeapFile)
//! and the page codec. The buffer pool never caches raw images; it caches
//! decoded [`HeapPage`](super::HeapPage)s.

use crate::common::config::PAGE_SIZE;

/// A page image (4KB, 4KB-aligned).
///
/// # Memory Layout
/// - Size: 4096 bytes (4KB)
/// - Alignment: 4096 bytes (for efficient Direct I/O with O_DIRECT)
///
/// # Clone Implementation
/// `PageData` does NOT implement `Clone` in production code (copying 4KB is
/// expensive and should be explicit). A `#[cfg(test)]` Clone is provided for
/// tests.
///
/// # Example
/// ```
/// use heapdb::storage::page::PageData;
///
/// let mut data = PageData::new();
/// data.as_mut_slice()[0] = 0xFF;
/// assert_eq!(data.as_slice()[0], 0xFF);
/// ```
#[repr(align(4096))]
pub struct PageData {
    data: [u8; PAGE_SIZE],
}

impl PageData {
    /// Create a new zeroed page image.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Copy a byte slice into a page image.
    ///
    /// Returns `None` unless `bytes` is exactly `PAGE_SIZE` long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != PAGE_SIZE {
            return None;
        }
        let mut page = Self::new();
        page.data.copy_from_slice(bytes);
        Some(page)
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Default for PageData {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for PageData {
    fn clone(&self) -> Self {
        let mut copy = PageData::new();
        copy.data.copy_from_slice(&self.data);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<PageData>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<PageData>(), 4096);
    }

    #[test]
    fn test_from_slice_requires_exact_length() {
        assert!(PageData::from_slice(&[0u8; PAGE_SIZE]).is_some());
        assert!(PageData::from_slice(&[0u8; PAGE_SIZE - 1]).is_none());
        assert!(PageData::from_slice(&[0u8; PAGE_SIZE + 1]).is_none());
    }

    #[test]
    fn test_page_clone_in_tests() {
        let mut page = PageData::new();
        page.as_mut_slice()[0] = 0xAB;

        let cloned = page.clone();
        assert_eq!(cloned.as_slice()[0], 0xAB);
    }
}
