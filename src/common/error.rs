//! Error types for heapdb.

use thiserror::Error;

use crate::common::{PageId, RecordId, TableId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in heapdb.
///
/// Every error is returned synchronously from the call that triggered it.
/// Lock unavailability is not an error: callers block until the lock is
/// granted.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from heap file reads, writes or metadata queries.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The page lies outside the heap file, or belongs to another table.
    #[error("invalid page {page_id}")]
    InvalidPage { page_id: PageId },

    /// Every cached page is dirty, so nothing can be evicted.
    #[error("buffer pool is full: all {capacity} cached pages are dirty")]
    BufferFull { capacity: usize },

    /// Delete of a tuple whose slot is empty or whose location is unknown.
    #[error("tuple not found at {record_id:?}")]
    TupleNotFound { record_id: Option<RecordId> },

    /// Insert into a page with no free slots.
    #[error("no free slot on {page_id}")]
    PageFull { page_id: PageId },

    /// A tuple's field types do not match the table schema.
    #[error("tuple does not match schema {expected}")]
    SchemaMismatch { expected: String },

    /// A page image failed validation while decoding.
    #[error("malformed {page_id}: {reason}")]
    MalformedPage { page_id: PageId, reason: String },

    /// No table is registered under this id.
    #[error("no such table: {0}")]
    TableNotFound(TableId),

    /// No table is registered under this name.
    #[error("no such table: '{0}'")]
    TableNameNotFound(String),

    /// A catalog schema file could not be parsed.
    #[error("invalid catalog entry on line {line}: {reason}")]
    Schema { line: usize, reason: String },

    /// A heap scan was used without being opened.
    #[error("scan is not open")]
    ScanClosed,
}
