//! Bypass (incident-simulation) mode.
//!
//! While active, deduplication and soft caching are switched off so that the
//! backend sees one request per caller.

use std::sync::atomic::{AtomicBool, Ordering};

/// Provider consulted before every dedup and cache decision.
pub trait BypassMode: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Toggleable in-process flag.
#[derive(Debug, Default)]
pub struct BypassFlag(AtomicBool);

impl BypassFlag {
    pub fn new(active: bool) -> Self {
        Self(AtomicBool::new(active))
    }

    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::Relaxed);
        tracing::info!(active, "Bypass mode changed");
    }
}

impl BypassMode for BypassFlag {
    fn is_active(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
