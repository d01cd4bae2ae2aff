//! Manifest caching.
//!
//! This module provides the revalidating cache that serves rendered
//! manifests while upstream reports them unchanged (ETag revalidation),
//! and the stores it keeps its state in.

pub mod entry;
pub mod memory;
pub mod revalidation;
pub mod store;

pub use entry::{CacheEntry, CacheKey, CacheValue, ValidatorToken};
pub use memory::MemoryStore;
pub use revalidation::{Lookup, RevalidatingCache, DEFAULT_ENTRY_COST};
pub use store::{CacheStore, DiskStore};
