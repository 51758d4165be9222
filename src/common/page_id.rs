//! Table and page identifier types.

use std::fmt;
use std::path::Path;

/// Identifies a table (and therefore its heap file).
///
/// Table ids are derived from the absolute path of the backing file, so a
/// file always maps to the same id across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    /// Derive the table id for a backing file.
    ///
    /// The path is made absolute (relative to the current directory) but not
    /// canonicalized, so the file does not need to exist yet.
    pub fn for_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        TableId(crc32fast::hash(absolute.to_string_lossy().as_bytes()))
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({})", self.0)
    }
}

/// Identifies one page of one table.
///
/// Used as the buffer pool cache key and the lock manager key. Equality and
/// hashing are by value.
///
/// # Example
/// ```
/// use heapdb::{PageId, TableId};
///
/// let page_id = PageId::new(TableId(1), 42);
/// assert_eq!(page_id.page_no, 42);
/// assert_eq!(page_id.offset(), 42 * 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        PageId { table_id, page_no }
    }

    /// Byte offset of this page within its heap file.
    #[inline]
    pub fn offset(&self) -> u64 {
        (self.page_no as u64) * (crate::common::config::PAGE_SIZE as u64)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.table_id.0, self.page_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_new() {
        let pid = PageId::new(TableId(3), 42);
        assert_eq!(pid.table_id, TableId(3));
        assert_eq!(pid.page_no, 42);
    }

    #[test]
    fn test_page_id_value_equality() {
        assert_eq!(PageId::new(TableId(1), 2), PageId::new(TableId(1), 2));
        assert_ne!(PageId::new(TableId(1), 2), PageId::new(TableId(2), 2));
    }

    #[test]
    fn test_page_id_ordering() {
        assert!(PageId::new(TableId(1), 1) < PageId::new(TableId(1), 2));
        assert!(PageId::new(TableId(2), 0) > PageId::new(TableId(1), 9));
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(TableId(5), 42)), "Page(5:42)");
        assert_eq!(format!("{}", TableId(5)), "Table(5)");
    }

    #[test]
    fn test_table_id_is_stable_per_path() {
        let a = TableId::for_path("/tmp/heapdb/a.dat");
        assert_eq!(a, TableId::for_path("/tmp/heapdb/a.dat"));
        assert_ne!(a, TableId::for_path("/tmp/heapdb/b.dat"));
    }
}
