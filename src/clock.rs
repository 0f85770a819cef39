//! Time source abstraction.
//!
//! # Responsibilities
//! - Provide a monotonic instant for latency and cache expiry
//! - Provide wall-clock milliseconds for telemetry timestamps
//!
//! # Design Decisions
//! - Injected into the cache and retry engine so tests can advance time
//! - `ManualClock` never moves on its own

use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic instant.
    fn now(&self) -> Instant;

    /// Milliseconds since the Unix epoch.
    fn unix_millis(&self) -> u64;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    epoch_millis: u64,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            epoch_millis: SystemClock.unix_millis(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().expect("manual clock mutex poisoned");
        *elapsed += by;
    }

    fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("manual clock mutex poisoned")
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn unix_millis(&self) -> u64 {
        self.epoch_millis + self.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        let start = clock.now();
        let start_ms = clock.unix_millis();

        clock.advance(Duration::from_millis(1500));

        assert_eq!(clock.now().duration_since(start), Duration::from_millis(1500));
        assert_eq!(clock.unix_millis() - start_ms, 1500);
    }
}
