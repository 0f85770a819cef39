//! Soft response cache.
//!
//! # Responsibilities
//! - Hold decoded responses under caller-assembled keys for a short TTL
//! - Evict lazily on read, and in bulk on `clear`
//!
//! # Design Decisions
//! - Values are opaque JSON; typed access happens at the call site
//! - Invalidation is coarse: the client clears everything after any
//!   successful mutation and on 401
//! - No persistence

pub mod soft;

pub use soft::{SoftCache, SoftCacheEntry};
