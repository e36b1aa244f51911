//! Persistent file-hash cache.
//!
//! Stores `(size, mtime, hash)` per path so that repeated runs never reread
//! unchanged files.
//!
//! # Architecture
//!
//! * [`entry`]: the per-file data model and its trust check.
//! * [`store`]: the sharded in-memory map plus the checksum-enveloped JSON
//!   snapshot it is loaded from and persisted to.
//!
//! # Invalidation
//!
//! An entry is keyed by the NFC-normalized absolute path and trusted only
//! while the live file's size and mtime both match exactly. Any drift forces
//! a rehash and replaces the entry. Entries for paths not observed during a
//! completed run are pruned before the snapshot is written; interrupted runs
//! skip pruning so a partial scan never discards entries for unvisited files.

pub mod entry;
pub mod store;

pub use entry::CacheEntry;
pub use store::{CacheError, CacheResult, HashCache};
