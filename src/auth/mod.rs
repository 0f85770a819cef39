//! Authentication subsystem.
//!
//! # Responsibilities
//! - Resolve the bearer token from a fixed, ordered list of storage slots
//! - Tear the session down and redirect to login on 401
//!
//! # Design Decisions
//! - Storage and navigation are injected capabilities
//! - Both operations are synchronous side effects
//! - Redirects are suppressed while already on the login path

pub mod navigator;
pub mod resolver;
pub mod store;

pub use navigator::{LoggingNavigator, MemoryNavigator, Navigator};
pub use resolver::AuthResolver;
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageScope};
