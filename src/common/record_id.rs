//! Record identifier type.

use std::fmt;

use super::PageId;

/// Storage location of one tuple: a page and a slot within it.
///
/// Every tuple read from a heap page carries its `RecordId`, which is what
/// lets a delete find the slot again without an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    #[inline]
    pub fn new(page_id: PageId, slot: usize) -> Self {
        RecordId { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;

    #[test]
    fn test_record_id_display() {
        let rid = RecordId::new(PageId::new(TableId(2), 1), 17);
        assert_eq!(format!("{}", rid), "Page(2:1)#17");
    }
}
