//! heapdb - A page-oriented heap storage kernel.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                             heapdb                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Callers (query operators)                  │   │
//! │  │      get_page / insert_tuple / delete_tuple / scan       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Buffer Pool (buffer/)                      │   │
//! │  │   BufferPool + FifoReplacer (clean pages only) + Stats   │   │
//! │  │          commit = force, abort = discard + reload        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │            ↓                                  ↓                 │
//! │  ┌──────────────────────────┐  ┌───────────────────────────┐   │
//! │  │  Locks (concurrency/)    │  │   Catalog (catalog.rs)    │   │
//! │  │  LockManager: S/X, 2PL   │  │   TableId → HeapFile      │   │
//! │  └──────────────────────────┘  └───────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Storage Layer (storage/)                   │   │
//! │  │        HeapFile + HeapScan + HeapPage + PageData         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (ids, Error, config)
//! - [`tuple`] - Field types, schemas and tuples
//! - [`storage`] - Heap files and the slotted page format
//! - [`concurrency`] - Page-level two-phase locking
//! - [`buffer`] - The transactional page cache
//! - [`catalog`] - Table registry
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//!
//! use heapdb::{BufferPool, BufferPoolConfig, Catalog, Field, TransactionId};
//!
//! let catalog = Arc::new(Catalog::new());
//! catalog.load_schema("data/catalog.txt")?;
//! let table_id = catalog.table_id("users")?;
//!
//! let pool = BufferPool::new(BufferPoolConfig::default(), Arc::clone(&catalog));
//! let tx = TransactionId::new();
//! let tuple = heapdb::Tuple::new(vec![Field::Int(1), Field::string("ada")]);
//! pool.insert_tuple(tx, table_id, tuple)?;
//! pool.transaction_complete(tx, true)?;
//! # Ok::<(), heapdb::Error>(())
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod storage;
pub mod tuple;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{BufferPoolConfig, Error, PageId, RecordId, Result, TableId, TransactionId};

pub use buffer::{BufferPool, BufferPoolStats, PageRef, StatsSnapshot};
pub use catalog::Catalog;
pub use concurrency::{LockManager, LockMode};
pub use storage::page::{HeapPage, PageData};
pub use storage::{HeapFile, HeapScan};
pub use tuple::{Field, Tuple, TupleDesc, Type};
