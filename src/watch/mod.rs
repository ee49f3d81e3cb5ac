// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling source and watch globs per asset class.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Content hashing so identical outputs are not rewritten.
//!
//! It does **not** know about debouncing; it only turns filesystem changes
//! into per-binding change events for the notifier.

pub mod hash;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_file_hash, hash_bytes, is_unchanged};
pub use patterns::{
    build_bindings_from_config, collect_matching_files, relative_str, SourceMatcher, WatchBinding,
};
pub use watcher::{spawn_watcher, WatcherHandle};
