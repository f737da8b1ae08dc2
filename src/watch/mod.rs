// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Compiling task glob patterns ([`patterns`]).
//! - The [`WatchBackend`] seam every task watches through, with a
//!   `notify`-based implementation ([`watcher`]) and an in-memory one for
//!   tests ([`mock`]).
//!
//! It does **not** know about the task graph; it only turns filesystem
//! changes into per-pattern [`WatchEvent`]s.

pub mod files;
pub mod mock;
pub mod path_utils;
pub mod patterns;
pub mod source;
pub mod watcher;

pub use files::{flatten_watched, WatchedFiles};
pub use mock::MockWatchBackend;
pub use patterns::{collect_matching_files, PatternMatcher};
pub use source::{WatchBackend, WatchEvent, WatchHandle, WatchSubscription};
pub use watcher::NotifyWatchBackend;
