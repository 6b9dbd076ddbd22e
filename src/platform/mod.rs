//! Platform abstraction layer
//!
//! Handles browser/native differences. The simulation never touches this
//! module; only the entry point and persistence do.

pub mod storage;

pub use storage::{MemoryStore, SaveStore};

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorageStore;
