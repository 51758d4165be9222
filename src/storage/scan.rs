//! Sequential scan over a heap file.

use crate::buffer::BufferPool;
use crate::common::{Error, PageId, Result, TransactionId};
use crate::concurrency::LockMode;
use crate::storage::HeapFile;
use crate::tuple::Tuple;

/// Position of an open scan.
struct Cursor {
    next_page: u32,
    buffered: std::vec::IntoIter<Tuple>,
}

/// Lazily yields every occupied slot of a heap file, page by page in page
/// order and slot by slot within a page.
///
/// Each page is fetched through the buffer pool with a shared lock, so the
/// scanning transaction keeps a shared lock on every page it has visited.
///
/// # Usage
/// ```ignore
/// let mut scan = heap_file.scan(&pool, tx);
/// scan.open();
/// while let Some(tuple) = scan.next_tuple()? {
///     // ...
/// }
/// scan.close();
/// ```
pub struct HeapScan<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tx: TransactionId,
    cursor: Option<Cursor>,
}

impl<'a> HeapScan<'a> {
    pub(crate) fn new(file: &'a HeapFile, pool: &'a BufferPool, tx: TransactionId) -> Self {
        Self {
            file,
            pool,
            tx,
            cursor: None,
        }
    }

    /// Position the scan before the first tuple of page 0.
    pub fn open(&mut self) {
        self.cursor = Some(Cursor {
            next_page: 0,
            buffered: Vec::new().into_iter(),
        });
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Next tuple, or `None` once every page has been read.
    ///
    /// # Errors
    /// `Error::ScanClosed` if the scan is not open, plus anything
    /// `BufferPool::get_page` returns.
    pub fn next_tuple(&mut self) -> Result<Option<Tuple>> {
        let cursor = self.cursor.as_mut().ok_or(Error::ScanClosed)?;
        loop {
            if let Some(tuple) = cursor.buffered.next() {
                return Ok(Some(tuple));
            }
            if cursor.next_page >= self.file.num_pages()? {
                return Ok(None);
            }

            let page_id = PageId::new(self.file.id(), cursor.next_page);
            let page = self.pool.get_page(self.tx, page_id, LockMode::Shared)?;
            let tuples: Vec<Tuple> = page.read().tuples().cloned().collect();
            cursor.buffered = tuples.into_iter();
            cursor.next_page += 1;
        }
    }

    /// Restart from page 0.
    pub fn rewind(&mut self) {
        self.close();
        self.open();
    }

    /// Drop buffered tuples. The scan must be reopened before further use.
    pub fn close(&mut self) {
        self.cursor = None;
    }
}

impl Iterator for HeapScan<'_> {
    type Item = Result<Tuple>;

    /// A closed scan yields `Err(ScanClosed)`.
    fn next(&mut self) -> Option<Self::Item> {
        self.next_tuple().transpose()
    }
}
