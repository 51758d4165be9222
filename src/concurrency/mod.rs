//! Transaction isolation.
//!
//! - [`LockManager`] - Shared/exclusive page locks with blocking acquisition

mod lock_manager;

pub use lock_manager::{LockManager, LockMode, LockState};
