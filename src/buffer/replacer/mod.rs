//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`FifoReplacer`] - Oldest clean page first

mod fifo;

pub use fifo::FifoReplacer;
