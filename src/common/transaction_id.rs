//! Transaction identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one unit of work.
///
/// Ids are opaque: only equality and hashing matter. [`TransactionId::new`]
/// hands out unique ids from a process-wide counter.
///
/// # Example
/// ```
/// use heapdb::TransactionId;
///
/// let t1 = TransactionId::new();
/// let t2 = TransactionId::new();
/// assert_ne!(t1, t2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocate a fresh, unique transaction id.
    pub fn new() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tx({})", self.0)
    }
}
