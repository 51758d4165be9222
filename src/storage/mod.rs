//! Storage layer - heap files and page formats.
//!
//! This module handles persistent storage:
//! - [`HeapFile`] - One table's pages on disk
//! - [`HeapScan`] - Page-ordered iteration over a heap file
//! - [`page`] - Page images and the slotted page codec

mod heap_file;
pub mod page;
mod scan;

pub use heap_file::HeapFile;
pub use scan::HeapScan;
