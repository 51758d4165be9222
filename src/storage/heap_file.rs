//! Heap File - one table's pages on disk.
//!
//! The [`HeapFile`] handles all direct file operations for a table:
//! - Reading and writing whole pages
//! - Appending empty pages when the table needs room
//! - Tuple insert/delete and scans, routed through the buffer pool so the
//!   lock manager arbitrates every page access

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::{BufferPool, PageRef};
use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, RecordId, Result, TableId, TransactionId};
use crate::storage::page::{HeapPage, PageData};
use crate::storage::HeapScan;
use crate::tuple::{Tuple, TupleDesc};

/// The on-disk pages of one table.
///
/// # File Layout
/// Pages are laid out sequentially with no file header:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// The page count is always derived from the file length, so a heap file
/// carries no metadata of its own.
///
/// # Thread Safety
/// The file handle sits behind a `Mutex`; each page read or write is one
/// critical section, and appends re-check the page count under it so two
/// transactions never append the same page.
///
/// # Durability
/// Every write is followed by `fsync()`.
pub struct HeapFile {
    path: PathBuf,
    file: Mutex<File>,
    desc: Arc<TupleDesc>,
    table_id: TableId,
}

impl HeapFile {
    /// Create a new, empty heap file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(Self::with_file(path.as_ref(), file, desc))
    }

    /// Open an existing heap file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self::with_file(path.as_ref(), file, desc))
    }

    /// Open an existing heap file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P, desc: TupleDesc) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, desc)
        } else {
            Self::create(path, desc)
        }
    }

    fn with_file(path: &Path, file: File, desc: TupleDesc) -> Self {
        Self {
            path: path.to_path_buf(),
            table_id: TableId::for_path(path),
            file: Mutex::new(file),
            desc: Arc::new(desc),
        }
    }

    /// The id of the table stored in this file.
    #[inline]
    pub fn id(&self) -> TableId {
        self.table_id
    }

    #[inline]
    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of whole pages in the file.
    pub fn num_pages(&self) -> Result<u32> {
        let file = self.file.lock();
        Ok(Self::page_count(&file)?)
    }

    /// Read and decode one page.
    ///
    /// # Errors
    /// Returns `Error::InvalidPage` if the page belongs to another table or
    /// the file is shorter than `(page_no + 1) × PAGE_SIZE`.
    pub fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        self.check_table(page_id)?;

        let mut data = PageData::new();
        {
            let mut file = self.file.lock();
            if page_id.page_no >= Self::page_count(&file)? {
                return Err(Error::InvalidPage { page_id });
            }
            file.seek(SeekFrom::Start(page_id.offset()))?;
            file.read_exact(data.as_mut_slice()).map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => Error::InvalidPage { page_id },
                _ => Error::Io(e),
            })?;
        }

        HeapPage::decode(page_id, Arc::clone(&self.desc), &data)
    }

    /// Write a page's full image at its offset.
    ///
    /// Overwrites an existing page, or appends when the page number equals
    /// the current page count.
    ///
    /// # Errors
    /// Returns `Error::InvalidPage` if the page belongs to another table or
    /// writing it would leave a gap in the file.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let page_id = page.id();
        self.check_table(page_id)?;

        let data = page.encode();
        let mut file = self.file.lock();
        if page_id.page_no > Self::page_count(&file)? {
            return Err(Error::InvalidPage { page_id });
        }
        Self::write_at(&mut file, page_id, &data)
    }

    /// Append an all-empty page, but only if the file still has
    /// `expected_pages` pages. Returns whether this call appended it.
    pub(crate) fn append_empty_page(&self, expected_pages: u32) -> Result<bool> {
        let mut file = self.file.lock();
        if Self::page_count(&file)? != expected_pages {
            return Ok(false);
        }
        let page_id = PageId::new(self.table_id, expected_pages);
        Self::write_at(&mut file, page_id, &HeapPage::empty_page_data())?;
        debug!(%page_id, "appended empty page");
        Ok(true)
    }

    /// Insert `tuple` into the last page with room, appending a page if the
    /// last one is full.
    ///
    /// The target page is locked exclusively through `pool` and marked
    /// dirtied by `tx` in the same step that changes it. Returns where the
    /// tuple landed and the pages that were modified.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if the tuple doesn't fit this table
    /// - anything `BufferPool::get_page` returns
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tx: TransactionId,
        tuple: Tuple,
    ) -> Result<(RecordId, Vec<PageRef>)> {
        if !tuple.matches(&self.desc) {
            return Err(Error::SchemaMismatch {
                expected: self.desc.to_string(),
            });
        }

        let mut pending = Some(tuple);
        loop {
            let num_pages = self.num_pages()?;
            if num_pages > 0 {
                let page_id = PageId::new(self.table_id, num_pages - 1);
                let (placed, page) = pool.modify_page(tx, page_id, |page| {
                    if page.num_empty_slots() == 0 {
                        return Ok(None);
                    }
                    pending.take().map(|tuple| page.insert_tuple(tuple)).transpose()
                })?;
                if let Some(record_id) = placed {
                    return Ok((record_id, vec![page]));
                }
            }
            // Either we append the next page or someone else just did;
            // both ways the next pass sees a new last page.
            self.append_empty_page(num_pages)?;
        }
    }

    /// Free the slot `tuple` was read from.
    ///
    /// The page is locked exclusively through `pool` and marked dirtied by
    /// `tx`.
    ///
    /// # Errors
    /// `Error::TupleNotFound` if the tuple has no location, belongs to another
    /// table, or its slot is already empty.
    pub fn delete_tuple(&self, pool: &BufferPool, tx: TransactionId, tuple: &Tuple) -> Result<PageRef> {
        let record_id = tuple.record_id();
        let rid = match record_id {
            Some(rid) if rid.page_id.table_id == self.table_id => rid,
            _ => return Err(Error::TupleNotFound { record_id }),
        };

        let (_, page) = pool.modify_page(tx, rid.page_id, |page| page.delete_tuple(tuple).map(Some))?;
        Ok(page)
    }

    /// A scan over every tuple of this table, on behalf of `tx`.
    ///
    /// The scan must be opened before use.
    pub fn scan<'a>(&'a self, pool: &'a BufferPool, tx: TransactionId) -> HeapScan<'a> {
        HeapScan::new(self, pool, tx)
    }

    fn check_table(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id != self.table_id {
            return Err(Error::InvalidPage { page_id });
        }
        Ok(())
    }

    fn page_count(file: &File) -> std::io::Result<u32> {
        Ok((file.metadata()?.len() / PAGE_SIZE as u64) as u32)
    }

    fn write_at(file: &mut File, page_id: PageId, data: &PageData) -> Result<()> {
        file.seek(SeekFrom::Start(page_id.offset()))?;
        file.write_all(data.as_slice())?;
        file.sync_all()?; // fsync for durability
        Ok(())
    }
}

impl std::fmt::Debug for HeapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapFile")
            .field("path", &self.path)
            .field("table_id", &self.table_id)
            .field("desc", &self.desc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{Field, Type};
    use tempfile::tempdir;

    fn int_desc() -> TupleDesc {
        TupleDesc::with_types(vec![Type::Int, Type::Int])
    }

    fn page_with(hf: &HeapFile, page_no: u32, values: &[i32]) -> HeapPage {
        let mut page = HeapPage::new(PageId::new(hf.id(), page_no), Arc::clone(hf.tuple_desc()));
        for &v in values {
            page.insert_tuple(Tuple::new(vec![Field::Int(v), Field::Int(v * 2)]))
                .unwrap();
        }
        page
    }

    #[test]
    fn test_create_new_heap_file() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), int_desc()).unwrap();
        assert_eq!(hf.num_pages().unwrap(), 0);
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");

        HeapFile::create(&path, int_desc()).unwrap();
        assert!(HeapFile::create(&path, int_desc()).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(HeapFile::open(dir.path().join("missing.dat"), int_desc()).is_err());
    }

    #[test]
    fn test_table_id_follows_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");
        let a = HeapFile::create(&path, int_desc()).unwrap();
        let b = HeapFile::open(&path, int_desc()).unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), int_desc()).unwrap();

        let page = page_with(&hf, 0, &[1, 2, 3]);
        hf.write_page(&page).unwrap();
        assert_eq!(hf.num_pages().unwrap(), 1);

        let read = hf.read_page(page.id()).unwrap();
        let values: Vec<Tuple> = read.tuples().cloned().collect();
        let expected: Vec<Tuple> = page.tuples().cloned().collect();
        assert_eq!(values, expected);
        assert!(!read.is_dirty());
    }

    #[test]
    fn test_write_overwrites_in_place() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), int_desc()).unwrap();

        hf.write_page(&page_with(&hf, 0, &[1])).unwrap();
        hf.write_page(&page_with(&hf, 1, &[2])).unwrap();
        hf.write_page(&page_with(&hf, 0, &[7, 8])).unwrap();

        assert_eq!(hf.num_pages().unwrap(), 2);
        let page0 = hf.read_page(PageId::new(hf.id(), 0)).unwrap();
        assert_eq!(page0.tuples().count(), 2);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");

        {
            let hf = HeapFile::create(&path, int_desc()).unwrap();
            hf.write_page(&page_with(&hf, 0, &[42])).unwrap();
        }

        {
            let hf = HeapFile::open(&path, int_desc()).unwrap();
            assert_eq!(hf.num_pages().unwrap(), 1);
            let page = hf.read_page(PageId::new(hf.id(), 0)).unwrap();
            assert_eq!(
                page.tuple(0).unwrap().field(0),
                Some(&Field::Int(42))
            );
        }
    }

    #[test]
    fn test_read_invalid_page() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), int_desc()).unwrap();
        hf.write_page(&page_with(&hf, 0, &[])).unwrap();

        let result = hf.read_page(PageId::new(hf.id(), 1));
        assert!(matches!(result, Err(Error::InvalidPage { .. })));
    }

    #[test]
    fn test_read_truncated_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");
        std::fs::write(&path, vec![0u8; PAGE_SIZE + 100]).unwrap();

        let hf = HeapFile::open(&path, int_desc()).unwrap();
        assert_eq!(hf.num_pages().unwrap(), 1);
        assert!(hf.read_page(PageId::new(hf.id(), 0)).is_ok());
        assert!(matches!(
            hf.read_page(PageId::new(hf.id(), 1)),
            Err(Error::InvalidPage { .. })
        ));
    }

    #[test]
    fn test_foreign_page_rejected() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), int_desc()).unwrap();
        let other = PageId::new(TableId(hf.id().0.wrapping_add(1)), 0);
        assert!(matches!(
            hf.read_page(other),
            Err(Error::InvalidPage { .. })
        ));
    }

    #[test]
    fn test_write_with_gap_rejected() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), int_desc()).unwrap();
        assert!(hf.write_page(&page_with(&hf, 2, &[1])).is_err());
        assert_eq!(hf.num_pages().unwrap(), 0);
    }

    #[test]
    fn test_append_empty_page_checks_count() {
        let dir = tempdir().unwrap();
        let hf = HeapFile::create(dir.path().join("t.dat"), int_desc()).unwrap();

        assert!(hf.append_empty_page(0).unwrap());
        assert!(!hf.append_empty_page(0).unwrap());
        assert!(hf.append_empty_page(1).unwrap());
        assert_eq!(hf.num_pages().unwrap(), 2);
    }
}
