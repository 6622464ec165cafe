//! Review record storage for Reprise.
//!
//! This module provides the persistence port and two implementations:
//! file-based (JSON documents) and in-memory.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileReviewStore;
pub use memory::MemoryReviewStore;
pub use traits::{ItemVersion, ReviewStore};
