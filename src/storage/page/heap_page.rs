//! Slotted heap pages.
//!
//! A [`HeapPage`] is the decoded form of one page of a heap file: a slot
//! occupancy bitmap plus `slots_per_page` fixed-width tuple slots.

use std::sync::Arc;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, RecordId, Result, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

use super::PageData;

/// Number of tuple slots on a page for the given schema.
///
/// Each tuple costs its byte width plus one bitmap bit:
/// `floor((PAGE_SIZE * 8) / (tuple_bytes * 8 + 1))`.
pub fn slots_per_page(desc: &TupleDesc) -> usize {
    (PAGE_SIZE * 8) / (desc.byte_size() * 8 + 1)
}

/// Bytes of bitmap header for a page with `num_slots` slots.
pub fn header_size(num_slots: usize) -> usize {
    num_slots.div_ceil(8)
}

/// A decoded heap page.
///
/// # Layout
/// ```text
/// ┌──────────────────┬────────┬────────┬─────┬──────────┬─────────┐
/// │ bitmap           │ slot 0 │ slot 1 │ ... │ slot n-1 │ padding │
/// │ ceil(n/8) bytes  │ w bytes│ w bytes│     │ w bytes  │ zeros   │
/// └──────────────────┴────────┴────────┴─────┴──────────┴─────────┘
/// ```
/// Slot `i` is occupied iff bit `i % 8` (LSB first) of byte `i / 8` is set.
/// Free slots and padding encode as zeros.
///
/// The page also remembers which transaction dirtied it last; the buffer
/// pool uses that to decide what to flush on commit and what to discard on
/// abort.
#[derive(Debug, Clone)]
pub struct HeapPage {
    id: PageId,
    desc: Arc<TupleDesc>,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirtier: Option<TransactionId>,
}

impl HeapPage {
    /// Create an empty, clean page.
    pub fn new(id: PageId, desc: Arc<TupleDesc>) -> Self {
        let num_slots = slots_per_page(&desc);
        Self {
            id,
            header: vec![0u8; header_size(num_slots)],
            slots: vec![None; num_slots],
            desc,
            dirtier: None,
        }
    }

    /// Decode a page image.
    ///
    /// # Errors
    /// `Error::MalformedPage` if bitmap bits beyond the slot count are set or
    /// an occupied slot does not hold a valid tuple of `desc`.
    pub fn decode(id: PageId, desc: Arc<TupleDesc>, data: &PageData) -> Result<Self> {
        let bytes = data.as_slice();
        let num_slots = slots_per_page(&desc);
        let header_len = header_size(num_slots);
        let tuple_len = desc.byte_size();

        let header = bytes[..header_len].to_vec();
        for bit in num_slots..header_len * 8 {
            if header[bit / 8] & (1 << (bit % 8)) != 0 {
                return Err(Error::MalformedPage {
                    page_id: id,
                    reason: format!("bitmap bit {} set beyond {} slots", bit, num_slots),
                });
            }
        }

        let mut slots = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if header[slot / 8] & (1 << (slot % 8)) == 0 {
                slots.push(None);
                continue;
            }
            let start = header_len + slot * tuple_len;
            let mut tuple = Tuple::parse(&desc, &bytes[start..start + tuple_len]).ok_or_else(
                || Error::MalformedPage {
                    page_id: id,
                    reason: format!("slot {} does not hold a valid tuple", slot),
                },
            )?;
            tuple.set_record_id(Some(RecordId::new(id, slot)));
            slots.push(Some(tuple));
        }

        Ok(Self {
            id,
            desc,
            header,
            slots,
            dirtier: None,
        })
    }

    /// Decode a page from an arbitrary byte slice.
    ///
    /// # Errors
    /// `Error::MalformedPage` unless `bytes` is exactly `PAGE_SIZE` long, plus
    /// everything [`HeapPage::decode`] rejects.
    pub fn from_bytes(id: PageId, desc: Arc<TupleDesc>, bytes: &[u8]) -> Result<Self> {
        let data = PageData::from_slice(bytes).ok_or_else(|| Error::MalformedPage {
            page_id: id,
            reason: format!("expected {} bytes, got {}", PAGE_SIZE, bytes.len()),
        })?;
        Self::decode(id, desc, &data)
    }

    /// Encode this page into a full page image.
    pub fn encode(&self) -> PageData {
        let tuple_len = self.desc.byte_size();
        let mut buf = Vec::with_capacity(PAGE_SIZE);
        buf.extend_from_slice(&self.header);
        for slot in &self.slots {
            match slot {
                Some(tuple) => tuple.serialize(&mut buf),
                None => buf.resize(buf.len() + tuple_len, 0),
            }
        }
        buf.resize(PAGE_SIZE, 0);

        let mut data = PageData::new();
        data.as_mut_slice().copy_from_slice(&buf);
        data
    }

    /// Image of a page with every slot free.
    pub fn empty_page_data() -> PageData {
        PageData::new()
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.slots.len() && self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    pub fn tuple(&self, slot: usize) -> Option<&Tuple> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Occupied slots in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().flatten()
    }

    /// Store `tuple` in the first free slot and return its new location.
    ///
    /// String fields longer than `STRING_LEN` bytes are cut on a character
    /// boundary first, so the cached tuple matches what the page encodes.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if the tuple does not fit this page's schema
    /// - `Error::PageFull` if no slot is free
    pub fn insert_tuple(&mut self, tuple: Tuple) -> Result<RecordId> {
        if !tuple.matches(&self.desc) {
            return Err(Error::SchemaMismatch {
                expected: self.desc.to_string(),
            });
        }
        let mut tuple = tuple.into_stored();
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::PageFull { page_id: self.id })?;

        let record_id = RecordId::new(self.id, slot);
        tuple.set_record_id(Some(record_id));
        self.slots[slot] = Some(tuple);
        self.set_slot(slot, true);
        Ok(record_id)
    }

    /// Free the slot `tuple` was read from.
    ///
    /// # Errors
    /// `Error::TupleNotFound` if the tuple has no location, lives on another
    /// page, or its slot is already free.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id();
        let not_found = || Error::TupleNotFound { record_id };

        let rid = record_id.ok_or_else(not_found)?;
        if rid.page_id != self.id || !self.is_slot_used(rid.slot) {
            return Err(not_found());
        }

        self.slots[rid.slot] = None;
        self.set_slot(rid.slot, false);
        Ok(())
    }

    /// Set or clear the dirty owner.
    pub fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtier = dirtier;
    }

    /// The transaction that dirtied this page, or `None` if clean.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtier.is_some()
    }

    fn set_slot(&mut self, slot: usize, used: bool) {
        let mask = 1u8 << (slot % 8);
        if used {
            self.header[slot / 8] |= mask;
        } else {
            self.header[slot / 8] &= !mask;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
