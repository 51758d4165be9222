//! Page types and layout.
//!
//! This module contains:
//! - [`PageData`] - The raw 4KB image exchanged with heap files
//! - [`HeapPage`] - A decoded slotted page (bitmap + fixed-width slots)

mod heap_page;
#[allow(clippy::module_inception)]
mod page;

pub use heap_page::{header_size, slots_per_page, HeapPage};
pub use page::PageData;
